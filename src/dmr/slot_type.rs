//! Slot type: colour code and data type, Golay (20,8) protected.
//!
//! The 20 bits sit either side of the sync field: bits 98..108 and 156..166.

use super::DataType;
use crate::error::ProtocolError;
use crate::fec::golay;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotType {
    pub color_code: u8,
    pub data_type: DataType,
}

impl SlotType {
    pub fn new(color_code: u8, data_type: DataType) -> Self {
        Self {
            color_code: color_code & 0x0F,
            data_type,
        }
    }

    pub fn encode(&self, burst: &mut [u8]) {
        let value = (self.color_code << 4) | ((self.data_type as u8) & 0x0F);
        let [st0, st1, st2] = golay::encode2087(value);

        burst[12] = (burst[12] & 0xC0) | ((st0 >> 2) & 0x3F);
        burst[13] = (burst[13] & 0x0F) | ((st0 << 6) & 0xC0) | ((st1 >> 2) & 0x30);
        burst[19] = (burst[19] & 0xF0) | ((st1 >> 2) & 0x0F);
        burst[20] = (burst[20] & 0x03) | ((st1 << 6) & 0xC0) | ((st2 >> 2) & 0x3C);
    }

    pub fn decode(burst: &[u8]) -> Result<Self, ProtocolError> {
        let st0 = ((burst[12] << 2) & 0xFC) | ((burst[13] >> 6) & 0x03);
        let st1 = ((burst[13] << 2) & 0xC0) | ((burst[19] << 2) & 0x3C) | ((burst[20] >> 6) & 0x03);
        let st2 = (burst[20] << 2) & 0xF0;

        let value = golay::decode2087(&[st0, st1, st2])
            .ok_or(ProtocolError::InvalidSlotType)?;
        Ok(Self {
            color_code: value >> 4,
            data_type: DataType::try_from(value & 0x0F)?,
        })
    }
}
