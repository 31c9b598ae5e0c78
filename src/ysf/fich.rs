//! Frame information channel.
//!
//! Four bytes of fields plus CRC, Golay (24,12) coded as four words, then
//! convolutionally coded into 200 bits right after the frame sync.

use super::{channel_decode, channel_encode, FICH_LENGTH, SYNC_LENGTH};
use crate::error::ProtocolError;
use crate::fec::{crc, golay};

/// FI: what the frame carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameIndicator {
    Header = 0,
    Communications = 1,
    Terminator = 2,
    Test = 3,
}

impl FrameIndicator {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Self::Header,
            1 => Self::Communications,
            2 => Self::Terminator,
            _ => Self::Test,
        }
    }
}

/// DT: how the data channel is split between voice and data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataType {
    VdMode1 = 0,
    DataFr = 1,
    VdMode2 = 2,
    VoiceFr = 3,
}

impl DataType {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Self::VdMode1,
            1 => Self::DataFr,
            2 => Self::VdMode2,
            _ => Self::VoiceFr,
        }
    }
}

/// Decoded FICH fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fich {
    pub fi: FrameIndicator,
    /// Callsign information size.
    pub cs: u8,
    /// Call mode.
    pub cm: u8,
    /// Block number.
    pub bn: u8,
    /// Block total.
    pub bt: u8,
    /// Frame number.
    pub frame_number: u8,
    /// Frame total.
    pub frame_total: u8,
    /// Narrow deviation.
    pub dev: bool,
    /// Message route.
    pub mr: u8,
    pub voip: bool,
    pub dt: DataType,
    /// Squelch code enabled.
    pub sql: bool,
    /// Squelch code.
    pub sq: u8,
}

impl Fich {
    /// FICH of gateway-originated V/D mode 2 traffic.
    pub fn gateway(fi: FrameIndicator, frame_number: u8) -> Self {
        Self {
            fi,
            cs: 2,
            cm: 0,
            bn: 0,
            bt: 0,
            frame_number: frame_number & 0x07,
            frame_total: 7,
            dev: false,
            mr: 2,
            voip: false,
            dt: DataType::VdMode2,
            sql: false,
            sq: 0,
        }
    }

    fn to_bytes(self) -> [u8; 4] {
        [
            ((self.fi as u8) << 6)
                | ((self.cs & 0x03) << 4)
                | ((self.cm & 0x03) << 2)
                | (self.bn & 0x03),
            ((self.bt & 0x03) << 6) | ((self.frame_number & 0x07) << 3) | (self.frame_total & 0x07),
            (u8::from(self.dev) << 6)
                | ((self.mr & 0x03) << 3)
                | (u8::from(self.voip) << 2)
                | (self.dt as u8),
            (u8::from(self.sql) << 7) | (self.sq & 0x7F),
        ]
    }

    fn from_bytes(b: &[u8]) -> Self {
        Self {
            fi: FrameIndicator::from_bits(b[0] >> 6),
            cs: (b[0] >> 4) & 0x03,
            cm: (b[0] >> 2) & 0x03,
            bn: b[0] & 0x03,
            bt: b[1] >> 6,
            frame_number: (b[1] >> 3) & 0x07,
            frame_total: b[1] & 0x07,
            dev: b[2] & 0x40 != 0,
            mr: (b[2] >> 3) & 0x03,
            voip: b[2] & 0x04 != 0,
            dt: DataType::from_bits(b[2]),
            sql: b[3] & 0x80 != 0,
            sq: b[3] & 0x7F,
        }
    }

    /// Write the coded FICH into `payload` (the region starting at the frame sync).
    pub fn encode(&self, payload: &mut [u8]) {
        let mut fich = [0u8; 6];
        fich[..4].copy_from_slice(&self.to_bytes());
        crc::add_ccitt16(&mut fich);

        let words = [
            (u16::from(fich[0]) << 4) | (u16::from(fich[1]) >> 4),
            ((u16::from(fich[1]) & 0x0F) << 8) | u16::from(fich[2]),
            (u16::from(fich[3]) << 4) | (u16::from(fich[4]) >> 4),
            ((u16::from(fich[4]) & 0x0F) << 8) | u16::from(fich[5]),
        ];

        let mut coded = [0u8; 13];
        for (chunk, &word) in coded.chunks_exact_mut(3).zip(words.iter()) {
            let cw = golay::encode24128(word).to_be_bytes();
            chunk.copy_from_slice(&cw[1..]);
        }

        let bits = channel_encode(&coded, 100, 5);
        payload[SYNC_LENGTH..SYNC_LENGTH + FICH_LENGTH].copy_from_slice(&bits);
    }

    /// Decode and validate the FICH of `payload`.
    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        let coded = payload
            .get(SYNC_LENGTH..SYNC_LENGTH + FICH_LENGTH)
            .ok_or(ProtocolError::InvalidFich)?;
        let decoded = channel_decode(coded, 100, 5);

        let mut fich = [0u8; 6];
        for (i, chunk) in decoded[..12].chunks_exact(3).enumerate() {
            let cw = u32::from_be_bytes([0, chunk[0], chunk[1], chunk[2]]);
            let word = golay::decode24128(cw).ok_or(ProtocolError::InvalidFich)?;
            if i % 2 == 0 {
                fich[i / 2 * 3] = (word >> 4) as u8;
                fich[i / 2 * 3 + 1] = ((word & 0x0F) << 4) as u8;
            } else {
                fich[i / 2 * 3 + 1] |= (word >> 8) as u8;
                fich[i / 2 * 3 + 2] = (word & 0xFF) as u8;
            }
        }

        if !crc::check_ccitt16(&fich) {
            return Err(ProtocolError::InvalidFich);
        }
        Ok(Self::from_bytes(&fich))
    }
}
