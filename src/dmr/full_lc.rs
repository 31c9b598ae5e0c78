//! Full link control as carried in voice LC headers and terminators.
//!
//! LC + RS(12,9) parity, parity masked per burst type, BPTC(196,96) coded.

use super::lc::{LinkControl, LC_LENGTH};
use super::{bptc, DataType};
use crate::error::ProtocolError;
use crate::fec::rs;

/// Which burst a full LC travels in; selects the parity mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullLcType {
    Header,
    Terminator,
}

impl FullLcType {
    pub fn data_type(self) -> DataType {
        match self {
            Self::Header => DataType::VoiceLcHeader,
            Self::Terminator => DataType::TerminatorWithLc,
        }
    }

    fn mask(self) -> u8 {
        match self {
            Self::Header => 0x96,
            Self::Terminator => 0x99,
        }
    }
}

impl TryFrom<DataType> for FullLcType {
    type Error = ProtocolError;

    fn try_from(data_type: DataType) -> Result<Self, Self::Error> {
        match data_type {
            DataType::VoiceLcHeader => Ok(Self::Header),
            DataType::TerminatorWithLc => Ok(Self::Terminator),
            other => Err(ProtocolError::UnrecognizedDataType(other as u8)),
        }
    }
}

/// Write `lc` into the payload bits of a header or terminator burst.
pub fn encode(lc: &LinkControl, kind: FullLcType, burst: &mut [u8]) {
    let mask = kind.mask();
    let bytes = lc.to_bytes();

    let mut codeword = [0u8; 12];
    codeword[..LC_LENGTH].copy_from_slice(&bytes);
    for (dst, parity) in codeword[LC_LENGTH..].iter_mut().zip(rs::encode(&bytes)) {
        *dst = parity ^ mask;
    }

    bptc::encode(&codeword, burst);
}

/// Recover and check the LC of a header or terminator burst.
pub fn decode(burst: &[u8], kind: FullLcType) -> Result<LinkControl, ProtocolError> {
    let mask = kind.mask();
    let mut codeword = bptc::decode(burst);
    for byte in &mut codeword[LC_LENGTH..] {
        *byte ^= mask;
    }

    if !rs::check(&codeword) {
        return Err(ProtocolError::InvalidFullLc);
    }

    let mut bytes = [0u8; LC_LENGTH];
    bytes.copy_from_slice(&codeword[..LC_LENGTH]);
    LinkControl::from_bytes(&bytes)
}
