//! Golay (23,12), extended (24,12) and shortened (20,8) codes.
//!
//! The (23,12) code is perfect: every 11-bit syndrome maps to exactly one
//! error pattern of weight three or less, so decoding is a table lookup.

use std::sync::OnceLock;

/// Generator polynomial x^11 + x^10 + x^6 + x^5 + x^4 + x^2 + 1.
const GENERATOR: u32 = 0xC75;

fn parity23(data: u32) -> u32 {
    let mut reg = (data & 0x0FFF) << 11;
    for bit in (11..23).rev() {
        if reg & (1 << bit) != 0 {
            reg ^= GENERATOR << (bit - 11);
        }
    }
    reg & 0x07FF
}

fn syndrome23(codeword: u32) -> usize {
    ((codeword & 0x07FF) ^ parity23(codeword >> 11)) as usize
}

fn error_patterns() -> &'static [u32] {
    static TABLE: OnceLock<Vec<u32>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = vec![0u32; 1 << 11];
        for a in 0..23 {
            let one = 1u32 << a;
            table[syndrome23(one)] = one;
            for b in (a + 1)..23 {
                let two = one | (1 << b);
                table[syndrome23(two)] = two;
                for c in (b + 1)..23 {
                    let three = two | (1 << c);
                    table[syndrome23(three)] = three;
                }
            }
        }
        table
    })
}

/// Encode 12 data bits into a 23-bit codeword (data in the top bits).
pub fn encode23127(data: u16) -> u32 {
    let data = u32::from(data & 0x0FFF);
    (data << 11) | parity23(data)
}

/// Encode 12 data bits into a 24-bit codeword with even overall parity.
pub fn encode24128(data: u16) -> u32 {
    let cw = encode23127(data);
    (cw << 1) | (cw.count_ones() & 1)
}

/// Correct up to three errors in a 23-bit codeword.
///
/// Returns the data bits and the number of bits corrected.
pub fn decode23127(codeword: u32) -> (u16, u32) {
    let codeword = codeword & 0x007F_FFFF;
    let error = error_patterns()[syndrome23(codeword)];
    (((codeword ^ error) >> 11) as u16, error.count_ones())
}

/// Correct up to three errors in a 24-bit codeword.
///
/// Returns `None` when the overall parity shows a fourth error.
pub fn decode24128(codeword: u32) -> Option<u16> {
    let cw23 = (codeword >> 1) & 0x007F_FFFF;
    let error = error_patterns()[syndrome23(cw23)];
    let corrected = ((cw23 ^ error) << 1) | (codeword & 1);
    let parity_error = corrected.count_ones() & 1;

    if error.count_ones() + parity_error > 3 {
        return None;
    }
    Some(((cw23 ^ error) >> 11) as u16)
}

/// Encode a byte with the shortened (20,8) code used by the DMR slot type.
///
/// Returns the data byte followed by 12 parity bits, left aligned.
pub fn encode2087(data: u8) -> [u8; 3] {
    let parity = encode24128(u16::from(data)) & 0x0FFF;
    [data, (parity >> 4) as u8, ((parity & 0x0F) << 4) as u8]
}

/// Decode a (20,8) codeword laid out as by [`encode2087`].
pub fn decode2087(code: &[u8; 3]) -> Option<u8> {
    let codeword =
        (u32::from(code[0]) << 12) | (u32::from(code[1]) << 4) | (u32::from(code[2]) >> 4);
    let data = decode24128(codeword)?;
    u8::try_from(data).ok()
}
