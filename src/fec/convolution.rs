//! Rate 1/2, K=5 convolutional code used by the YSF FICH and data channels.
//!
//! Generators are G1 = 1 + D^3 + D^4 and G2 = 1 + D + D^2 + D^4. Callers
//! append four zero tail bits so the decoder can end in state zero.

use super::{read_bit, write_bit};

const STATES: usize = 16;

/// Output pair for `input` entering a register holding `state`.
///
/// State bit 0 is the most recent input.
fn branch(state: usize, input: bool) -> (bool, bool) {
    let d = usize::from(input);
    let d1 = state & 1;
    let d2 = (state >> 1) & 1;
    let d3 = (state >> 2) & 1;
    let d4 = (state >> 3) & 1;
    ((d ^ d3 ^ d4) == 1, (d ^ d1 ^ d2 ^ d4) == 1)
}

/// Encode the first `n_bits` bits of `input` into `2 * n_bits` bits of `output`.
pub fn encode(input: &[u8], output: &mut [u8], n_bits: usize) {
    let mut state = 0usize;
    for i in 0..n_bits {
        let bit = read_bit(input, i);
        let (g1, g2) = branch(state, bit);
        write_bit(output, 2 * i, g1);
        write_bit(output, 2 * i + 1, g2);
        state = ((state << 1) | usize::from(bit)) & (STATES - 1);
    }
}

/// Hard-decision Viterbi decode of `2 * n_bits` bits back to `n_bits` bits.
///
/// Returns the path metric of the survivor, i.e. the number of channel bit
/// errors the decoder had to assume.
pub fn decode(input: &[u8], output: &mut [u8], n_bits: usize) -> u32 {
    const UNREACHABLE: u32 = u32::MAX / 2;

    let mut metrics = [UNREACHABLE; STATES];
    metrics[0] = 0;
    // For each step and next state, the oldest register bit of the chosen predecessor.
    let mut decisions: Vec<u16> = Vec::with_capacity(n_bits);

    for i in 0..n_bits {
        let r1 = read_bit(input, 2 * i);
        let r2 = read_bit(input, 2 * i + 1);
        let mut next = [UNREACHABLE; STATES];
        let mut chosen = 0u16;

        for (ns, slot) in next.iter_mut().enumerate() {
            let input_bit = ns & 1 == 1;
            for oldest in 0..2 {
                let ps = (ns >> 1) | (oldest << 3);
                let (g1, g2) = branch(ps, input_bit);
                let cost = metrics[ps] + u32::from(g1 != r1) + u32::from(g2 != r2);
                if cost < *slot {
                    *slot = cost;
                    if oldest == 1 {
                        chosen |= 1 << ns;
                    } else {
                        chosen &= !(1 << ns);
                    }
                }
            }
        }

        metrics = next;
        decisions.push(chosen);
    }

    let mut state = 0usize;
    for i in (0..n_bits).rev() {
        write_bit(output, i, state & 1 == 1);
        let oldest = usize::from((decisions[i] >> state) & 1);
        state = (state >> 1) | (oldest << 3);
    }
    metrics[0]
}
