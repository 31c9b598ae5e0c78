//! `DMRD` voice and data packets exchanged with a Homebrew master.
//!
//! ```text
//!  0..4   "DMRD"
//!  4      sequence number
//!  5..8   source id
//!  8..11  destination id
//! 11..15  repeater id
//! 15      flags: slot (0x80), private call (0x40), frame type (0x30), data type or N (0x0F)
//! 16..20  stream id
//! 20..53  burst
//! 53      BER
//! 54      RSSI
//! ```

use byteorder::{BigEndian, ByteOrder};

use crate::dmr::{Burst, DataType, DmrData, BURST_LENGTH};
use crate::error::ProtocolError;
use crate::types::{CallType, DmrId, Slot};

pub const DMRD_LENGTH: usize = 55;
pub const DMRD_TAG: &[u8; 4] = b"DMRD";

const FLAG_SLOT_TWO: u8 = 0x80;
const FLAG_PRIVATE: u8 = 0x40;
const FRAME_TYPE_MASK: u8 = 0x30;
const FRAME_VOICE: u8 = 0x00;
const FRAME_VOICE_SYNC: u8 = 0x10;
const FRAME_DATA_SYNC: u8 = 0x20;

/// One `DMRD` packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmrdPacket {
    pub sequence: u8,
    pub repeater_id: u32,
    pub stream_id: u32,
    pub data: DmrData,
}

impl DmrdPacket {
    pub fn encode(&self) -> [u8; DMRD_LENGTH] {
        let data = &self.data;
        let mut buf = [0u8; DMRD_LENGTH];
        buf[0..4].copy_from_slice(DMRD_TAG);
        buf[4] = self.sequence;
        buf[5..8].copy_from_slice(&data.src.to_be_bytes());
        buf[8..11].copy_from_slice(&data.dst.to_be_bytes());
        BigEndian::write_u32(&mut buf[11..15], self.repeater_id);

        let mut flags = match data.data_type {
            DataType::VoiceSync => FRAME_VOICE_SYNC,
            DataType::Voice => FRAME_VOICE | (data.n & 0x0F),
            other => FRAME_DATA_SYNC | (other as u8 & 0x0F),
        };
        if data.slot == Slot::Two {
            flags |= FLAG_SLOT_TWO;
        }
        if data.call_type == CallType::Private {
            flags |= FLAG_PRIVATE;
        }
        buf[15] = flags;

        BigEndian::write_u32(&mut buf[16..20], self.stream_id);
        buf[20..20 + BURST_LENGTH].copy_from_slice(data.burst.as_bytes());
        buf[53] = data.ber;
        buf[54] = data.rssi;
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        if buf.len() < DMRD_LENGTH {
            return Err(ProtocolError::InvalidLength {
                expected: DMRD_LENGTH,
                got: buf.len(),
            });
        }
        if &buf[0..4] != DMRD_TAG {
            return Err(ProtocolError::UnknownTag);
        }

        let flags = buf[15];
        let slot = if flags & FLAG_SLOT_TWO != 0 {
            Slot::Two
        } else {
            Slot::One
        };
        let call_type = if flags & FLAG_PRIVATE != 0 {
            CallType::Private
        } else {
            CallType::Group
        };
        let (data_type, n) = match flags & FRAME_TYPE_MASK {
            FRAME_VOICE_SYNC => (DataType::VoiceSync, 0),
            FRAME_VOICE => (DataType::Voice, flags & 0x0F),
            FRAME_DATA_SYNC => (DataType::try_from(flags & 0x0F)?, 0),
            _ => return Err(ProtocolError::UnrecognizedDataType(flags)),
        };

        let mut data = DmrData::new(
            slot,
            DmrId::from_be_bytes([buf[5], buf[6], buf[7]]),
            DmrId::from_be_bytes([buf[8], buf[9], buf[10]]),
            call_type,
            data_type,
            Burst::from_slice(&buf[20..20 + BURST_LENGTH])?,
        )
        .with_n(n);
        data.ber = buf[53];
        data.rssi = buf[54];

        Ok(Self {
            sequence: buf[4],
            repeater_id: BigEndian::read_u32(&buf[11..15]),
            stream_id: BigEndian::read_u32(&buf[16..20]),
            data,
        })
    }
}
