//! Reed-Solomon (12,9) over GF(256), used as the full LC checksum.
//!
//! Only encoding is needed: a received LC is checked by re-encoding the nine
//! data bytes and comparing parity.

use std::sync::OnceLock;

/// Field polynomial x^8 + x^4 + x^3 + x^2 + 1.
const FIELD_POLYNOMIAL: u16 = 0x11D;

/// Generator polynomial coefficients, lowest order first.
const GENERATOR: [u8; 4] = [0x40, 0x38, 0x0E, 0x01];

struct Tables {
    exp: [u8; 512],
    log: [u8; 256],
}

fn tables() -> &'static Tables {
    static TABLES: OnceLock<Tables> = OnceLock::new();
    TABLES.get_or_init(|| {
        let mut exp = [0u8; 512];
        let mut log = [0u8; 256];
        let mut x: u16 = 1;
        for i in 0..255 {
            exp[i] = x as u8;
            log[x as usize] = i as u8;
            x <<= 1;
            if x & 0x100 != 0 {
                x ^= FIELD_POLYNOMIAL;
            }
        }
        for i in 255..512 {
            exp[i] = exp[i - 255];
        }
        Tables { exp, log }
    })
}

fn gmult(a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        return 0;
    }
    let t = tables();
    t.exp[usize::from(t.log[usize::from(a)]) + usize::from(t.log[usize::from(b)])]
}

/// Compute the three parity bytes for nine data bytes, in transmission order.
pub fn encode(data: &[u8; 9]) -> [u8; 3] {
    let mut parity = [0u8; 3];
    for &byte in data {
        let feedback = byte ^ parity[2];
        parity[2] = parity[1] ^ gmult(GENERATOR[2], feedback);
        parity[1] = parity[0] ^ gmult(GENERATOR[1], feedback);
        parity[0] = gmult(GENERATOR[0], feedback);
    }
    [parity[2], parity[1], parity[0]]
}

/// Check a 12-byte codeword (data followed by unmasked parity).
pub fn check(codeword: &[u8; 12]) -> bool {
    let mut data = [0u8; 9];
    data.copy_from_slice(&codeword[..9]);
    encode(&data) == codeword[9..12]
}
