//! Forward error correction and bit packing shared by the DMR and YSF codecs.
//!
//! Everything here works on MSB-first bit numbering: bit 0 is the top bit of
//! byte 0.

pub mod convolution;
pub mod crc;
pub mod golay;
pub mod hamming;
pub mod qr;
pub mod rs;

/// Read bit `pos` of `data`.
#[inline]
pub fn read_bit(data: &[u8], pos: usize) -> bool {
    data[pos >> 3] & (0x80u8 >> (pos & 7)) != 0
}

/// Set or clear bit `pos` of `data`.
#[inline]
pub fn write_bit(data: &mut [u8], pos: usize, value: bool) {
    let mask = 0x80u8 >> (pos & 7);
    if value {
        data[pos >> 3] |= mask;
    } else {
        data[pos >> 3] &= !mask;
    }
}

/// Unpack the leading `bits.len()` bits of `data`.
pub fn bytes_to_bits(data: &[u8], bits: &mut [bool]) {
    for (pos, bit) in bits.iter_mut().enumerate() {
        *bit = read_bit(data, pos);
    }
}

/// Pack `bits` into the leading bits of `data`, leaving the rest untouched.
pub fn bits_to_bytes(bits: &[bool], data: &mut [u8]) {
    for (pos, &bit) in bits.iter().enumerate() {
        write_bit(data, pos, bit);
    }
}
