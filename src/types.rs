//! Core types shared by both protocol sides.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A 24-bit DMR radio or talkgroup identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct DmrId(u32);

impl DmrId {
    /// Largest identifier that fits the 24-bit wire field.
    pub const MAX: u32 = 0x00FF_FFFF;

    /// Create an identifier, masking it to 24 bits.
    pub const fn new(id: u32) -> Self {
        Self(id & Self::MAX)
    }

    /// Decode a 24-bit big-endian identifier.
    pub fn from_be_bytes(bytes: [u8; 3]) -> Self {
        Self(u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]))
    }

    /// Encode as a 24-bit big-endian identifier.
    pub fn to_be_bytes(self) -> [u8; 3] {
        let b = self.0.to_be_bytes();
        [b[1], b[2], b[3]]
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for DmrId {
    type Error = String;

    fn try_from(value: u32) -> std::result::Result<Self, Self::Error> {
        if value > Self::MAX {
            return Err(format!("DMR ID {value} does not fit in 24 bits"));
        }
        Ok(Self(value))
    }
}

impl From<DmrId> for u32 {
    fn from(id: DmrId) -> Self {
        id.0
    }
}

impl fmt::Display for DmrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// DMR call type, carried in the FLCO field of link control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallType {
    /// Talkgroup call.
    #[default]
    Group,
    /// Unit-to-unit call.
    Private,
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Group => write!(f, "group"),
            Self::Private => write!(f, "private"),
        }
    }
}

/// DMR TDMA timeslot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Slot {
    One,
    #[default]
    Two,
}

impl Slot {
    pub fn number(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }
}

impl TryFrom<u8> for Slot {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            other => Err(format!("invalid DMR slot {other}")),
        }
    }
}

impl From<Slot> for u8 {
    fn from(slot: Slot) -> Self {
        slot.number()
    }
}

/// Protocol-agnostic classification of a decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameTag {
    /// Call header carrying full addressing.
    Header,
    /// Voice (and embedded signalling).
    Data,
    /// Call terminator.
    EndOfTransmission,
}

impl fmt::Display for FrameTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header => write!(f, "header"),
            Self::Data => write!(f, "data"),
            Self::EndOfTransmission => write!(f, "end"),
        }
    }
}

/// Length of a YSF callsign field.
pub const CALLSIGN_LENGTH: usize = 10;

/// A space-padded, ten byte YSF callsign field.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Callsign([u8; CALLSIGN_LENGTH]);

impl Callsign {
    /// A field of ten spaces.
    pub const BLANK: Self = Self([b' '; CALLSIGN_LENGTH]);

    /// Wrap raw field bytes as received on the wire.
    pub const fn from_bytes(bytes: [u8; CALLSIGN_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Build a field from text, upper-casing, truncating and padding with spaces.
    pub fn new(text: &str) -> Self {
        let mut bytes = [b' '; CALLSIGN_LENGTH];
        for (dst, src) in bytes.iter_mut().zip(text.trim().bytes()) {
            *dst = src.to_ascii_uppercase();
        }
        Self(bytes)
    }

    /// Copy a field out of a longer buffer.
    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut field = [b' '; CALLSIGN_LENGTH];
        let len = bytes.len().min(CALLSIGN_LENGTH);
        field[..len].copy_from_slice(&bytes[..len]);
        Self(field)
    }

    pub fn as_bytes(&self) -> &[u8; CALLSIGN_LENGTH] {
        &self.0
    }

    /// Callsign text without padding or any `-suffix`/`/suffix`.
    pub fn base(&self) -> String {
        let text = self.to_string();
        text.split(['-', '/'])
            .next()
            .unwrap_or_default()
            .trim()
            .to_string()
    }

    pub fn is_blank(&self) -> bool {
        self.0.iter().all(|&b| b == b' ' || b == 0)
    }
}

impl Default for Callsign {
    fn default() -> Self {
        Self::BLANK
    }
}

impl FromStr for Callsign {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl fmt::Display for Callsign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text: String = self
            .0
            .iter()
            .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { ' ' })
            .collect();
        write!(f, "{}", text.trim_end())
    }
}

impl fmt::Debug for Callsign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callsign({:?})", self.to_string())
    }
}
