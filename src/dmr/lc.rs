//! Link control: the nine byte call descriptor.

use std::fmt;

use crate::error::ProtocolError;
use crate::types::{CallType, DmrId};

/// FLCO for a group voice call.
pub const FLCO_GROUP: u8 = 0x00;
/// FLCO for a unit-to-unit voice call.
pub const FLCO_USER_USER: u8 = 0x03;

/// Length of an encoded link control word.
pub const LC_LENGTH: usize = 9;

/// Voice call link control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkControl {
    pub call_type: CallType,
    pub src: DmrId,
    pub dst: DmrId,
    /// Protect flag.
    pub pf: bool,
    /// Feature set ID.
    pub fid: u8,
    /// Service options.
    pub options: u8,
}

impl LinkControl {
    pub fn new(call_type: CallType, src: DmrId, dst: DmrId) -> Self {
        Self {
            call_type,
            src,
            dst,
            pf: false,
            fid: 0,
            options: 0,
        }
    }

    pub fn to_bytes(&self) -> [u8; LC_LENGTH] {
        let flco = match self.call_type {
            CallType::Group => FLCO_GROUP,
            CallType::Private => FLCO_USER_USER,
        };

        let mut bytes = [0u8; LC_LENGTH];
        bytes[0] = (u8::from(self.pf) << 7) | flco;
        bytes[1] = self.fid;
        bytes[2] = self.options;
        bytes[3..6].copy_from_slice(&self.dst.to_be_bytes());
        bytes[6..9].copy_from_slice(&self.src.to_be_bytes());
        bytes
    }

    /// Parse a voice call LC; other FLCOs (GPS, talker alias) are rejected.
    pub fn from_bytes(bytes: &[u8; LC_LENGTH]) -> Result<Self, ProtocolError> {
        let call_type = match bytes[0] & 0x3F {
            FLCO_GROUP => CallType::Group,
            FLCO_USER_USER => CallType::Private,
            _ => return Err(ProtocolError::InvalidFullLc),
        };

        Ok(Self {
            call_type,
            src: DmrId::from_be_bytes([bytes[6], bytes[7], bytes[8]]),
            dst: DmrId::from_be_bytes([bytes[3], bytes[4], bytes[5]]),
            pf: bytes[0] & 0x80 != 0,
            fid: bytes[1],
            options: bytes[2],
        })
    }
}

impl fmt::Display for LinkControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.call_type {
            CallType::Group => write!(f, "{} -> TG {}", self.src, self.dst),
            CallType::Private => write!(f, "{} -> {}", self.src, self.dst),
        }
    }
}
