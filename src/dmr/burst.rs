//! Whole bursts: headers, terminators and voice.

use std::fmt;

use super::emb::Emb;
use super::embedded::{EmbeddedFragment, EmbeddedLc};
use super::full_lc::{self, FullLcType};
use super::lc::LinkControl;
use super::slot_type::SlotType;
use super::sync::{self, SyncPattern};
use super::{DataType, BURST_LENGTH};
use crate::error::ProtocolError;
use crate::fec::{read_bit, write_bit};
use crate::types::FrameTag;

/// Length of one vocoder slice in bytes.
pub const VOICE_SLICE_LENGTH: usize = 9;

const VOICE_SLICE_BITS: usize = 72;

/// One 72-bit vocoder frame (20 ms of speech), copied between protocols as is.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceSlice([u8; VOICE_SLICE_LENGTH]);

impl VoiceSlice {
    /// Encoded silence.
    pub const SILENCE: Self = Self([0xB9, 0xE8, 0x81, 0x52, 0x61, 0x73, 0x00, 0x2A, 0x6B]);

    pub const fn from_bytes(bytes: [u8; VOICE_SLICE_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; VOICE_SLICE_LENGTH] {
        &self.0
    }
}

impl fmt::Debug for VoiceSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VoiceSlice({})", hex::encode(self.0))
    }
}

/// Burst bit offset of bit `bit` of slice `slice`; the centre 48 bits are skipped.
fn slice_bit(slice: usize, bit: usize) -> usize {
    let pos = slice * VOICE_SLICE_BITS + bit;
    if pos < 108 {
        pos
    } else {
        pos + 48
    }
}

/// What an inbound burst carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedBurst {
    Header(LinkControl),
    Terminator(LinkControl),
    Voice {
        slices: [VoiceSlice; 3],
        /// Embedded signalling, absent on sync bursts or when the EMB is unreadable.
        fragment: Option<EmbeddedFragment>,
    },
    /// Recognised but not relayed: CSBK, data, idle.
    Other(DataType),
}

impl DecodedBurst {
    pub fn tag(&self) -> Option<FrameTag> {
        match self {
            Self::Header(_) => Some(FrameTag::Header),
            Self::Terminator(_) => Some(FrameTag::EndOfTransmission),
            Self::Voice { .. } => Some(FrameTag::Data),
            Self::Other(_) => None,
        }
    }
}

/// One 33-byte DMR burst.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Burst([u8; BURST_LENGTH]);

impl Burst {
    pub const fn from_bytes(bytes: [u8; BURST_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let bytes: [u8; BURST_LENGTH] =
            bytes.try_into().map_err(|_| ProtocolError::InvalidLength {
                expected: BURST_LENGTH,
                got: bytes.len(),
            })?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; BURST_LENGTH] {
        &self.0
    }

    fn encode_full_lc(lc: &LinkControl, color_code: u8, kind: FullLcType) -> Self {
        let mut bytes = [0u8; BURST_LENGTH];
        full_lc::encode(lc, kind, &mut bytes);
        SlotType::new(color_code, kind.data_type()).encode(&mut bytes);
        sync::add(&mut bytes, SyncPattern::MsData);
        Self(bytes)
    }

    /// Voice LC header: data sync, slot type and full LC.
    pub fn encode_header(lc: &LinkControl, color_code: u8) -> Self {
        Self::encode_full_lc(lc, color_code, FullLcType::Header)
    }

    /// Terminator with LC.
    pub fn encode_terminator(lc: &LinkControl, color_code: u8) -> Self {
        Self::encode_full_lc(lc, color_code, FullLcType::Terminator)
    }

    /// Voice burst at superframe position `n`.
    ///
    /// Position 0 carries voice sync; positions 1 to 5 carry the EMB and the
    /// embedded LC fragment for that position.
    pub fn encode_voice_burst(
        slices: &[VoiceSlice; 3],
        n: u8,
        embedded: &EmbeddedLc,
        color_code: u8,
    ) -> Self {
        let mut bytes = [0u8; BURST_LENGTH];
        for (s, slice) in slices.iter().enumerate() {
            for bit in 0..VOICE_SLICE_BITS {
                write_bit(&mut bytes, slice_bit(s, bit), read_bit(&slice.0, bit));
            }
        }

        if n == 0 {
            sync::add(&mut bytes, SyncPattern::MsVoice);
        } else {
            let fragment = embedded.fragment(n);
            Emb::new(color_code, fragment.lcss).encode(&mut bytes);
            fragment.write(&mut bytes);
        }
        Self(bytes)
    }

    /// The three vocoder slices of a voice burst.
    pub fn slices(&self) -> [VoiceSlice; 3] {
        let mut slices = [VoiceSlice([0u8; VOICE_SLICE_LENGTH]); 3];
        for (s, slice) in slices.iter_mut().enumerate() {
            for bit in 0..VOICE_SLICE_BITS {
                write_bit(&mut slice.0, bit, read_bit(&self.0, slice_bit(s, bit)));
            }
        }
        slices
    }

    /// Classify the burst from its own sync and slot type fields.
    ///
    /// A burst without recognisable sync is taken to be voice with EMB.
    pub fn data_type(&self) -> Result<DataType, ProtocolError> {
        match sync::detect(&self.0) {
            Some(pattern) if pattern.is_voice() => Ok(DataType::VoiceSync),
            Some(_) => Ok(SlotType::decode(&self.0)?.data_type),
            None => Ok(DataType::Voice),
        }
    }

    /// Decode the burst as `data_type`, as announced by the network.
    pub fn decode(&self, data_type: DataType) -> Result<DecodedBurst, ProtocolError> {
        match data_type {
            DataType::VoiceLcHeader => {
                full_lc::decode(&self.0, FullLcType::Header).map(DecodedBurst::Header)
            }
            DataType::TerminatorWithLc => {
                full_lc::decode(&self.0, FullLcType::Terminator).map(DecodedBurst::Terminator)
            }
            DataType::VoiceSync => Ok(DecodedBurst::Voice {
                slices: self.slices(),
                fragment: None,
            }),
            DataType::Voice => Ok(DecodedBurst::Voice {
                slices: self.slices(),
                fragment: Emb::decode(&self.0)
                    .ok()
                    .map(|emb| EmbeddedFragment::read(&self.0, emb.lcss)),
            }),
            other => Ok(DecodedBurst::Other(other)),
        }
    }
}

impl fmt::Debug for Burst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Burst({})", hex::encode(self.0))
    }
}
