//! EMB: colour code, privacy indicator and link control start/stop (LCSS).
//!
//! Sixteen QR (16,7,6) bits wrapped around the embedded signalling fragment,
//! in the low nibble of byte 13, the high nibble of byte 14, the low nibble of
//! byte 18 and the high nibble of byte 19.

use crate::error::ProtocolError;
use crate::fec::qr;

/// Single fragment, or no embedded signalling.
pub const LCSS_SINGLE: u8 = 0;
/// First fragment of a link control.
pub const LCSS_FIRST: u8 = 1;
/// Last fragment of a link control.
pub const LCSS_LAST: u8 = 2;
/// Continuation fragment.
pub const LCSS_CONTINUATION: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Emb {
    pub color_code: u8,
    pub pi: bool,
    pub lcss: u8,
}

impl Emb {
    pub fn new(color_code: u8, lcss: u8) -> Self {
        Self {
            color_code: color_code & 0x0F,
            pi: false,
            lcss: lcss & 0x03,
        }
    }

    pub fn encode(&self, burst: &mut [u8]) {
        let value = (self.color_code << 3) | (u8::from(self.pi) << 2) | self.lcss;
        let [emb0, emb1] = qr::encode(value).to_be_bytes();

        burst[13] = (burst[13] & 0xF0) | (emb0 >> 4);
        burst[14] = (burst[14] & 0x0F) | (emb0 << 4);
        burst[18] = (burst[18] & 0xF0) | (emb1 >> 4);
        burst[19] = (burst[19] & 0x0F) | (emb1 << 4);
    }

    pub fn decode(burst: &[u8]) -> Result<Self, ProtocolError> {
        let emb0 = (burst[13] << 4) | (burst[14] >> 4);
        let emb1 = (burst[18] << 4) | (burst[19] >> 4);

        let value = qr::decode(u16::from_be_bytes([emb0, emb1])).ok_or(ProtocolError::InvalidEmb)?;
        Ok(Self {
            color_code: value >> 3,
            pi: value & 0x04 != 0,
            lcss: value & 0x03,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emb_placement() {
        let mut burst = [0u8; 33];
        Emb::new(1, LCSS_FIRST).encode(&mut burst);
        // CC=1, PI=0, LCSS=1 -> 0x09 -> QR codeword 0x1391
        let expected = [0x13, 0x91];
        assert_eq!(qr::encode(0x09).to_be_bytes(), expected);
        assert_eq!(burst[13] & 0x0F, expected[0] >> 4);
        assert_eq!(burst[14] >> 4, expected[0] & 0x0F);
        assert_eq!(burst[18] & 0x0F, expected[1] >> 4);
        assert_eq!(burst[19] >> 4, expected[1] & 0x0F);
        assert_eq!(burst[15..18], [0, 0, 0]);
    }

    #[test]
    fn test_emb_decode_with_error() {
        let mut burst = [0x55u8; 33];
        let emb = Emb::new(12, LCSS_CONTINUATION);
        emb.encode(&mut burst);
        burst[18] ^= 0x02;
        assert_eq!(Emb::decode(&burst).unwrap(), emb);
    }
}
