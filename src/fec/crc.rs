//! Checksums: CRC-CCITT as used by YSF, and the DMR five-bit LC checksum.

use crc::{Crc, CRC_16_GSM};

/// CRC-CCITT with zero init and inverted output, transmitted MSB first.
const CCITT: Crc<u16> = Crc::<u16>::new(&CRC_16_GSM);

/// CRC of `data`.
pub fn ccitt16(data: &[u8]) -> u16 {
    CCITT.checksum(data)
}

/// Write the CRC of all but the last two bytes into the last two bytes, big-endian.
pub fn add_ccitt16(buf: &mut [u8]) {
    let split = buf.len() - 2;
    let crc = ccitt16(&buf[..split]);
    buf[split..].copy_from_slice(&crc.to_be_bytes());
}

/// Verify a buffer written by [`add_ccitt16`].
pub fn check_ccitt16(buf: &[u8]) -> bool {
    if buf.len() < 2 {
        return false;
    }
    let split = buf.len() - 2;
    ccitt16(&buf[..split]).to_be_bytes() == buf[split..]
}

/// Five-bit checksum of a link control word: byte sum modulo 31.
pub fn five_bit_checksum(data: &[u8]) -> u8 {
    (data.iter().map(|&b| u32::from(b)).sum::<u32>() % 31) as u8
}
