//! Data channel contents of V/D mode 2 frames and the header payload.
//!
//! All operate on the 90-byte data region after the FICH.

use super::{channel_decode, channel_encode, DCH_LENGTH, SECTION_LENGTH};
use crate::error::ProtocolError;
use crate::fec::crc;
use crate::types::{Callsign, CALLSIGN_LENGTH};

const WHITENING: [u8; 20] = [
    0x93, 0xD7, 0x51, 0x21, 0x9C, 0x2F, 0x6C, 0xD0, 0xEF, 0x0F, 0xF8, 0x3D, 0xF1, 0x73, 0x20, 0x94,
    0xED, 0x1E, 0x7C, 0xD8,
];

/// Content of a data channel slot.
pub const SLOT_LENGTH: usize = CALLSIGN_LENGTH;

const FILLER: [u8; SLOT_LENGTH] = *b"**********";
const BLANK: [u8; SLOT_LENGTH] = *b"          ";
const TELEMETRY_1: [u8; SLOT_LENGTH] = [0x31, 0x22, 0x62, 0x5F, 0x29, 0x00, 0x00, 0x00, 0x00, 0x00];
const TELEMETRY_2: [u8; SLOT_LENGTH] = [0x00, 0x00, 0x00, 0x00, 0x6C, 0x20, 0x1C, 0x20, 0x03, 0x08];

/// Coded header payload chunk length (one CSD per section).
const CSD_CHUNK: usize = 9;

/// What the data channel carries at a given frame number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadSlot {
    /// Frame 0.
    Filler,
    /// Frame 1.
    Source(Callsign),
    /// Frame 2.
    Destination(Callsign),
    /// Frames 6 and 7.
    Telemetry([u8; SLOT_LENGTH]),
    /// Frames 3 to 5.
    Blank,
}

impl PayloadSlot {
    /// The slot transmitted at `frame_number` of a call from `source` to `destination`.
    pub fn for_frame(frame_number: u8, source: &Callsign, destination: &Callsign) -> Self {
        match frame_number & 0x07 {
            0 => Self::Filler,
            1 => Self::Source(*source),
            2 => Self::Destination(*destination),
            6 => Self::Telemetry(TELEMETRY_1),
            7 => Self::Telemetry(TELEMETRY_2),
            _ => Self::Blank,
        }
    }

    /// Interpret received slot content by frame number.
    pub fn from_content(frame_number: u8, content: [u8; SLOT_LENGTH]) -> Self {
        match frame_number & 0x07 {
            0 => Self::Filler,
            1 => Self::Source(Callsign::from_bytes(content)),
            2 => Self::Destination(Callsign::from_bytes(content)),
            6 | 7 => Self::Telemetry(content),
            _ => Self::Blank,
        }
    }

    pub fn content(&self) -> [u8; SLOT_LENGTH] {
        match self {
            Self::Filler => FILLER,
            Self::Source(cs) | Self::Destination(cs) => *cs.as_bytes(),
            Self::Telemetry(bytes) => *bytes,
            Self::Blank => BLANK,
        }
    }
}

fn whiten(data: &mut [u8]) {
    for (byte, w) in data.iter_mut().zip(WHITENING.iter()) {
        *byte ^= w;
    }
}

/// Write ten bytes into the V/D mode 2 data channel.
pub fn write_data_channel(data: &mut [u8], content: &[u8; SLOT_LENGTH]) {
    let mut info = [0u8; 13];
    info[..SLOT_LENGTH].copy_from_slice(content);
    whiten(&mut info[..SLOT_LENGTH]);
    crc::add_ccitt16(&mut info[..12]);

    let coded = channel_encode(&info, 100, 5);
    for (section, chunk) in data
        .chunks_exact_mut(SECTION_LENGTH)
        .zip(coded.chunks_exact(DCH_LENGTH))
    {
        section[..DCH_LENGTH].copy_from_slice(chunk);
    }
}

/// Read and check the V/D mode 2 data channel.
pub fn read_data_channel(data: &[u8]) -> Result<[u8; SLOT_LENGTH], ProtocolError> {
    let coded: Vec<u8> = data
        .chunks_exact(SECTION_LENGTH)
        .flat_map(|section| section[..DCH_LENGTH].iter().copied())
        .collect();
    let mut info = channel_decode(&coded, 100, 5);

    if !crc::check_ccitt16(&info[..12]) {
        return Err(ProtocolError::InvalidDataChannel);
    }
    whiten(&mut info[..SLOT_LENGTH]);

    let mut content = [0u8; SLOT_LENGTH];
    content.copy_from_slice(&info[..SLOT_LENGTH]);
    Ok(content)
}

/// Write the fixed content for `frame_number` into the data channel.
pub fn write_payload_slot(data: &mut [u8], frame_number: u8, source: &Callsign, destination: &Callsign) {
    let slot = PayloadSlot::for_frame(frame_number, source, destination);
    write_data_channel(data, &slot.content());
}

/// Read the data channel and interpret it for `frame_number`.
pub fn read_payload_slot(data: &[u8], frame_number: u8) -> Result<PayloadSlot, ProtocolError> {
    read_data_channel(data).map(|content| PayloadSlot::from_content(frame_number, content))
}

fn write_csd(data: &mut [u8], csd: &[u8; 20], offset: usize) {
    let mut info = [0u8; 23];
    info[..20].copy_from_slice(csd);
    whiten(&mut info[..20]);
    crc::add_ccitt16(&mut info[..22]);

    let coded = channel_encode(&info, 180, 9);
    for (section, chunk) in data
        .chunks_exact_mut(SECTION_LENGTH)
        .zip(coded.chunks_exact(CSD_CHUNK))
    {
        section[offset..offset + CSD_CHUNK].copy_from_slice(chunk);
    }
}

fn read_csd(data: &[u8], offset: usize) -> Result<[u8; 20], ProtocolError> {
    let coded: Vec<u8> = data
        .chunks_exact(SECTION_LENGTH)
        .flat_map(|section| section[offset..offset + CSD_CHUNK].iter().copied())
        .collect();
    let mut info = channel_decode(&coded, 180, 9);

    if !crc::check_ccitt16(&info[..22]) {
        return Err(ProtocolError::InvalidHeaderPayload);
    }
    whiten(&mut info[..20]);

    let mut csd = [0u8; 20];
    csd.copy_from_slice(&info[..20]);
    Ok(csd)
}

/// Write the header/terminator payload: CSD1 (destination, source) and a blank CSD2.
pub fn write_header(data: &mut [u8], source: &Callsign, destination: &Callsign) {
    let mut csd1 = [0u8; 20];
    csd1[..CALLSIGN_LENGTH].copy_from_slice(destination.as_bytes());
    csd1[CALLSIGN_LENGTH..].copy_from_slice(source.as_bytes());
    write_csd(data, &csd1, 0);
    write_csd(data, &[b' '; 20], CSD_CHUNK);
}

/// Read the source and destination callsigns from a header/terminator payload.
pub fn read_header(data: &[u8]) -> Result<(Callsign, Callsign), ProtocolError> {
    let csd1 = read_csd(data, 0)?;
    let destination = Callsign::from_slice(&csd1[..CALLSIGN_LENGTH]);
    let source = Callsign::from_slice(&csd1[CALLSIGN_LENGTH..]);
    Ok((source, destination))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_mapping() {
        let src = Callsign::new("G4KLX");
        let dst = Callsign::new("ALL");
        let slots: Vec<PayloadSlot> = (0..8).map(|n| PayloadSlot::for_frame(n, &src, &dst)).collect();
        assert_eq!(slots[0], PayloadSlot::Filler);
        assert_eq!(slots[1], PayloadSlot::Source(src));
        assert_eq!(slots[2], PayloadSlot::Destination(dst));
        assert!(slots[3..6].iter().all(|s| *s == PayloadSlot::Blank));
        assert_eq!(slots[6].content(), TELEMETRY_1);
        assert_eq!(slots[7].content(), TELEMETRY_2);

        for (n, slot) in slots.iter().enumerate() {
            assert_eq!(PayloadSlot::from_content(n as u8, slot.content()), *slot);
        }
    }

    #[test]
    fn test_data_channel_leaves_voice_channel_alone() {
        let mut data = [0xEEu8; 90];
        write_data_channel(&mut data, b"EA7EE/P   ");
        for section in data.chunks_exact(SECTION_LENGTH) {
            assert!(section[DCH_LENGTH..].iter().all(|&b| b == 0xEE));
        }
        assert_eq!(read_data_channel(&data), Ok(*b"EA7EE/P   "));
    }

    #[test]
    fn test_data_channel_crc_failure() {
        let mut data = [0u8; 90];
        write_data_channel(&mut data, &FILLER);
        // Corrupt a whole section so the decoder cannot recover.
        data[18..23].fill(0xFF);
        data[36..41].fill(0x00);
        assert_eq!(read_data_channel(&data), Err(ProtocolError::InvalidDataChannel));
    }

    #[test]
    fn test_header_round_trip_with_errors() {
        let mut data = [0u8; 90];
        let src = Callsign::new("M1ABC");
        let dst = Callsign::new("**********");
        write_header(&mut data, &src, &dst);
        data[3] ^= 0x20;
        data[40] ^= 0x04;
        assert_eq!(read_header(&data), Ok((src, dst)));
    }
}
