//! Quadratic residue (16,7,6) code protecting the DMR EMB field.

/// Generator polynomial of the (15,7) cyclic core.
const GENERATOR: u32 = 0x139;

/// Encode seven data bits into a 16-bit codeword.
///
/// Layout: data in bits 15..9, eight parity bits in 8..1, overall parity in bit 0.
pub fn encode(data: u8) -> u16 {
    let data = u32::from(data & 0x7F);
    let mut reg = data << 8;
    for bit in (8..15).rev() {
        if reg & (1 << bit) != 0 {
            reg ^= GENERATOR << (bit - 8);
        }
    }
    let cw = (data << 9) | ((reg & 0xFF) << 1);
    (cw | (cw.count_ones() & 1)) as u16
}

/// Decode to the nearest codeword, correcting up to two bit errors.
pub fn decode(codeword: u16) -> Option<u8> {
    (0u8..0x80)
        .map(|data| (data, (encode(data) ^ codeword).count_ones()))
        .min_by_key(|&(_, distance)| distance)
        .filter(|&(_, distance)| distance <= 2)
        .map(|(data, _)| data)
}
