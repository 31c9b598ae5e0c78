//! YSF network frame codec.
//!
//! A network frame is 155 bytes: the `YSFD` tag, three callsign fields, a
//! frame counter and the 120-byte radio frame (sync, FICH, five V/D mode 2
//! sections of data channel plus voice channel).

pub mod fich;
pub mod payload;

pub use fich::{Fich, FrameIndicator};
pub use payload::PayloadSlot;

use std::fmt;

use crate::dmr::VoiceSlice;
use crate::error::ProtocolError;
use crate::fec::{convolution, read_bit, write_bit};
use crate::types::{Callsign, CALLSIGN_LENGTH};

/// Network frame length.
pub const YSF_FRAME_LENGTH: usize = 155;

/// Tag of a data frame.
pub const FRAME_TAG: &[u8; 4] = b"YSFD";

/// Radio frame sync.
pub const SYNC: [u8; 5] = [0xD4, 0x71, 0xC9, 0x63, 0x4D];
pub const SYNC_LENGTH: usize = 5;
pub const FICH_LENGTH: usize = 25;

/// Voice slices per V/D mode 2 frame.
pub const SLICES_PER_FRAME: usize = 5;

const GATEWAY_OFFSET: usize = 4;
const SOURCE_OFFSET: usize = 14;
const DESTINATION_OFFSET: usize = 24;
const COUNTER_OFFSET: usize = 34;
const PAYLOAD_OFFSET: usize = 35;
const PAYLOAD_LENGTH: usize = YSF_FRAME_LENGTH - PAYLOAD_OFFSET;
const DATA_OFFSET: usize = SYNC_LENGTH + FICH_LENGTH;

/// One data channel plus voice channel section.
const SECTION_LENGTH: usize = 18;
const DCH_LENGTH: usize = 5;
const VCH_LENGTH: usize = 13;

/// Interleaver position for coded bit pair `i` of a channel split in `rows` rows.
fn interleave_position(i: usize, rows: usize) -> usize {
    (i / rows) * 2 + (i % rows) * 40
}

/// Convolutionally code and interleave `info_bits` bits (tail included).
pub(crate) fn channel_encode(info: &[u8], info_bits: usize, rows: usize) -> Vec<u8> {
    let mut coded = vec![0u8; info_bits * 2 / 8];
    convolution::encode(info, &mut coded, info_bits);

    let mut out = vec![0u8; coded.len()];
    for i in 0..info_bits {
        let n = interleave_position(i, rows);
        write_bit(&mut out, n, read_bit(&coded, 2 * i));
        write_bit(&mut out, n + 1, read_bit(&coded, 2 * i + 1));
    }
    out
}

/// Inverse of [`channel_encode`], returning `info_bits` decoded bits.
pub(crate) fn channel_decode(input: &[u8], info_bits: usize, rows: usize) -> Vec<u8> {
    let mut coded = vec![0u8; info_bits * 2 / 8];
    for i in 0..info_bits {
        let n = interleave_position(i, rows);
        write_bit(&mut coded, 2 * i, read_bit(input, n));
        write_bit(&mut coded, 2 * i + 1, read_bit(input, n + 1));
    }

    let mut out = vec![0u8; info_bits.div_ceil(8)];
    convolution::decode(&coded, &mut out, info_bits);
    out
}

/// Callsign fields of a network frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameAddress {
    /// The gateway's own callsign.
    pub gateway: Callsign,
    pub source: Callsign,
    pub destination: Callsign,
}

/// One 155-byte YSF network frame.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct YsfFrame([u8; YSF_FRAME_LENGTH]);

impl YsfFrame {
    fn blank(address: &FrameAddress, counter: u8, end: bool) -> Self {
        let mut bytes = [0u8; YSF_FRAME_LENGTH];
        bytes[..GATEWAY_OFFSET].copy_from_slice(FRAME_TAG);
        bytes[GATEWAY_OFFSET..SOURCE_OFFSET].copy_from_slice(address.gateway.as_bytes());
        bytes[SOURCE_OFFSET..DESTINATION_OFFSET].copy_from_slice(address.source.as_bytes());
        bytes[DESTINATION_OFFSET..COUNTER_OFFSET].copy_from_slice(address.destination.as_bytes());
        bytes[COUNTER_OFFSET] = ((counter & 0x7F) << 1) | u8::from(end);
        bytes[PAYLOAD_OFFSET..PAYLOAD_OFFSET + SYNC_LENGTH].copy_from_slice(&SYNC);
        Self(bytes)
    }

    fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.0[PAYLOAD_OFFSET..]
    }

    fn data_mut(&mut self) -> &mut [u8] {
        &mut self.0[PAYLOAD_OFFSET + DATA_OFFSET..]
    }

    fn data(&self) -> &[u8] {
        &self.0[PAYLOAD_OFFSET + DATA_OFFSET..]
    }

    /// Call header: FICH plus the header payload (destination and source).
    pub fn encode_header(address: &FrameAddress, counter: u8) -> Self {
        let mut frame = Self::blank(address, counter, false);
        Fich::gateway(FrameIndicator::Header, 0).encode(frame.payload_mut());
        payload::write_header(frame.data_mut(), &address.source, &address.destination);
        frame
    }

    /// Call terminator; the end bit of the counter byte is set.
    pub fn encode_terminator(address: &FrameAddress, counter: u8) -> Self {
        let mut frame = Self::blank(address, counter, true);
        Fich::gateway(FrameIndicator::Terminator, 0).encode(frame.payload_mut());
        payload::write_header(frame.data_mut(), &address.source, &address.destination);
        frame
    }

    /// V/D mode 2 communications frame carrying five voice slices.
    pub fn encode_voice(
        address: &FrameAddress,
        counter: u8,
        frame_number: u8,
        slices: &[VoiceSlice; SLICES_PER_FRAME],
    ) -> Self {
        let mut frame = Self::blank(address, counter, false);
        Fich::gateway(FrameIndicator::Communications, frame_number).encode(frame.payload_mut());

        payload::write_payload_slot(
            frame.data_mut(),
            frame_number,
            &address.source,
            &address.destination,
        );

        for (section, slice) in frame
            .data_mut()
            .chunks_exact_mut(SECTION_LENGTH)
            .zip(slices.iter())
        {
            let vch = &mut section[DCH_LENGTH..DCH_LENGTH + VCH_LENGTH];
            vch.fill(0);
            vch[..slice.as_bytes().len()].copy_from_slice(slice.as_bytes());
        }
        frame
    }

    /// Parse a received frame, checking length and tag.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let bytes: [u8; YSF_FRAME_LENGTH] =
            bytes.try_into().map_err(|_| ProtocolError::InvalidLength {
                expected: YSF_FRAME_LENGTH,
                got: bytes.len(),
            })?;
        if &bytes[..GATEWAY_OFFSET] != FRAME_TAG {
            return Err(ProtocolError::UnknownTag);
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; YSF_FRAME_LENGTH] {
        &self.0
    }

    pub fn gateway(&self) -> Callsign {
        Callsign::from_slice(&self.0[GATEWAY_OFFSET..GATEWAY_OFFSET + CALLSIGN_LENGTH])
    }

    pub fn source(&self) -> Callsign {
        Callsign::from_slice(&self.0[SOURCE_OFFSET..SOURCE_OFFSET + CALLSIGN_LENGTH])
    }

    pub fn destination(&self) -> Callsign {
        Callsign::from_slice(&self.0[DESTINATION_OFFSET..DESTINATION_OFFSET + CALLSIGN_LENGTH])
    }

    pub fn address(&self) -> FrameAddress {
        FrameAddress {
            gateway: self.gateway(),
            source: self.source(),
            destination: self.destination(),
        }
    }

    /// Network frame counter (7 bits).
    pub fn counter(&self) -> u8 {
        self.0[COUNTER_OFFSET] >> 1
    }

    /// End-of-transmission bit of the counter byte.
    pub fn is_end(&self) -> bool {
        self.0[COUNTER_OFFSET] & 0x01 != 0
    }

    /// The radio frame: sync, FICH and data.
    pub fn payload(&self) -> &[u8] {
        &self.0[PAYLOAD_OFFSET..]
    }

    pub fn fich(&self) -> Result<Fich, ProtocolError> {
        Fich::decode(self.payload())
    }

    /// The five voice slices of a V/D mode 2 frame.
    pub fn slices(&self) -> [VoiceSlice; SLICES_PER_FRAME] {
        let mut slices = [VoiceSlice::SILENCE; SLICES_PER_FRAME];
        for (slice, section) in slices.iter_mut().zip(self.data().chunks_exact(SECTION_LENGTH)) {
            let mut bytes = [0u8; 9];
            bytes.copy_from_slice(&section[DCH_LENGTH..DCH_LENGTH + 9]);
            *slice = VoiceSlice::from_bytes(bytes);
        }
        slices
    }

    /// The data channel of a V/D mode 2 frame, interpreted for `frame_number`.
    pub fn read_payload_slot(&self, frame_number: u8) -> Result<PayloadSlot, ProtocolError> {
        payload::read_payload_slot(self.data(), frame_number)
    }

    /// Source and destination from a header or terminator payload.
    pub fn decode_header_payload(&self) -> Result<(Callsign, Callsign), ProtocolError> {
        payload::read_header(self.data())
    }
}

impl fmt::Debug for YsfFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("YsfFrame")
            .field("source", &self.source())
            .field("destination", &self.destination())
            .field("counter", &self.counter())
            .field("end", &self.is_end())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> FrameAddress {
        FrameAddress {
            gateway: Callsign::new("CA6JAU"),
            source: Callsign::new("EA7EE"),
            destination: Callsign::new("TG 214"),
        }
    }

    #[test]
    fn test_interleave_is_a_permutation() {
        for (bits, rows) in [(100, 5), (180, 9)] {
            let mut seen = vec![false; bits * 2];
            for i in 0..bits {
                let n = interleave_position(i, rows);
                assert!(!seen[n] && !seen[n + 1]);
                seen[n] = true;
                seen[n + 1] = true;
            }
            assert!(seen.iter().all(|&s| s));
        }
    }

    #[test]
    fn test_header_layout() {
        let frame = YsfFrame::encode_header(&address(), 0);
        let bytes = frame.as_bytes();
        assert_eq!(&bytes[..4], b"YSFD");
        assert_eq!(&bytes[4..14], b"CA6JAU    ");
        assert_eq!(&bytes[14..24], b"EA7EE     ");
        assert_eq!(&bytes[24..34], b"TG 214    ");
        assert_eq!(bytes[34], 0x00);
        assert_eq!(&bytes[35..40], &SYNC);

        let fich = frame.fich().unwrap();
        assert_eq!(fich.fi, FrameIndicator::Header);
        assert_eq!(
            frame.decode_header_payload().unwrap(),
            (address().source, address().destination)
        );
    }

    #[test]
    fn test_terminator_sets_end_bit() {
        let frame = YsfFrame::encode_terminator(&address(), 0x45);
        assert_eq!(frame.as_bytes()[34], 0x8B);
        assert_eq!(frame.counter(), 0x45);
        assert!(frame.is_end());
        assert_eq!(frame.fich().unwrap().fi, FrameIndicator::Terminator);
    }

    #[test]
    fn test_voice_frame_carries_slices() {
        let slices = [
            VoiceSlice::SILENCE,
            VoiceSlice::from_bytes([1; 9]),
            VoiceSlice::from_bytes([2; 9]),
            VoiceSlice::from_bytes([3; 9]),
            VoiceSlice::from_bytes([4; 9]),
        ];
        let frame = YsfFrame::encode_voice(&address(), 9, 1, &slices);
        assert_eq!(frame.slices(), slices);

        let fich = frame.fich().unwrap();
        assert_eq!(fich.frame_number, 1);
        assert_eq!(fich.dt, fich::DataType::VdMode2);
        assert_eq!(
            frame.read_payload_slot(1),
            Ok(PayloadSlot::Source(address().source))
        );
    }

    #[test]
    fn test_from_slice_rejects_other_tags() {
        let mut bytes = *YsfFrame::encode_header(&address(), 0).as_bytes();
        assert!(YsfFrame::from_slice(&bytes).is_ok());
        assert!(matches!(
            YsfFrame::from_slice(&bytes[..14]),
            Err(ProtocolError::InvalidLength { expected: 155, got: 14 })
        ));
        bytes[3] = b'P';
        assert_eq!(YsfFrame::from_slice(&bytes), Err(ProtocolError::UnknownTag));
    }
}
