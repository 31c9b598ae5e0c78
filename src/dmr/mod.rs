//! DMR burst codec.
//!
//! A burst is 33 bytes (264 bits). The centre 48 bits carry either a sync
//! pattern or the EMB plus one embedded signalling fragment; data bursts
//! also carry a slot type field either side of the sync.

pub mod bptc;
pub mod burst;
pub mod data;
pub mod emb;
pub mod embedded;
pub mod full_lc;
pub mod lc;
pub mod slot_type;
pub mod sync;

pub use burst::{Burst, DecodedBurst, VoiceSlice};
pub use data::DmrData;
pub use embedded::{EmbeddedCollector, EmbeddedFragment, EmbeddedLc};
pub use lc::LinkControl;

use crate::error::ProtocolError;

/// Length of one burst in bytes.
pub const BURST_LENGTH: usize = 33;

/// Voice bursts per superframe (A to F).
pub const SUPERFRAME_LENGTH: u8 = 6;

/// Data type carried in the slot type, plus the two voice pseudo types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataType {
    PiHeader = 0x00,
    VoiceLcHeader = 0x01,
    TerminatorWithLc = 0x02,
    Csbk = 0x03,
    MbcHeader = 0x04,
    MbcContinuation = 0x05,
    DataHeader = 0x06,
    Rate12Data = 0x07,
    Rate34Data = 0x08,
    Idle = 0x09,
    Rate1Data = 0x0A,
    /// Voice burst A, carrying voice sync.
    VoiceSync = 0xF0,
    /// Voice bursts B to F, carrying EMB.
    Voice = 0xF1,
}

impl DataType {
    pub fn is_voice(self) -> bool {
        matches!(self, Self::VoiceSync | Self::Voice)
    }
}

impl TryFrom<u8> for DataType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0x00 => Self::PiHeader,
            0x01 => Self::VoiceLcHeader,
            0x02 => Self::TerminatorWithLc,
            0x03 => Self::Csbk,
            0x04 => Self::MbcHeader,
            0x05 => Self::MbcContinuation,
            0x06 => Self::DataHeader,
            0x07 => Self::Rate12Data,
            0x08 => Self::Rate34Data,
            0x09 => Self::Idle,
            0x0A => Self::Rate1Data,
            0xF0 => Self::VoiceSync,
            0xF1 => Self::Voice,
            other => return Err(ProtocolError::UnrecognizedDataType(other)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_conversion() {
        assert_eq!(DataType::try_from(0x02), Ok(DataType::TerminatorWithLc));
        assert_eq!(DataType::try_from(0xF0), Ok(DataType::VoiceSync));
        assert_eq!(
            DataType::try_from(0x0C),
            Err(ProtocolError::UnrecognizedDataType(0x0C))
        );
        assert!(DataType::Voice.is_voice());
        assert!(!DataType::Csbk.is_voice());
    }
}
