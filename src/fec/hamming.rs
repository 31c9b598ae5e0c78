//! Single-error-correcting Hamming codes used by the DMR BPTC and embedded LC.
//!
//! Each code is described by its parity equations: parity bit `j` (stored at
//! `data_bits + j`) is the XOR of the data bits listed in equation `j`.

/// Outcome of checking one codeword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syndrome {
    /// No error detected.
    Clean,
    /// A single error at this bit position was fixed in place.
    Corrected(usize),
    /// More errors than the code can correct.
    Uncorrectable,
}

impl Syndrome {
    pub fn is_usable(self) -> bool {
        !matches!(self, Self::Uncorrectable)
    }
}

/// A systematic Hamming code over a `bool` slice.
#[derive(Debug)]
pub struct HammingCode {
    data_bits: usize,
    equations: &'static [&'static [usize]],
}

/// Hamming (15,11,3) variant 2, the BPTC(196,96) row code.
pub const HAMMING_15_11_3: HammingCode = HammingCode {
    data_bits: 11,
    equations: &[
        &[0, 1, 2, 3, 5, 7, 8],
        &[1, 2, 3, 4, 6, 8, 9],
        &[2, 3, 4, 5, 7, 9, 10],
        &[0, 1, 2, 4, 6, 7, 10],
    ],
};

/// Hamming (13,9,3), the BPTC(196,96) column code.
pub const HAMMING_13_9_3: HammingCode = HammingCode {
    data_bits: 9,
    equations: &[
        &[0, 1, 3, 5, 6],
        &[0, 1, 2, 4, 6, 7],
        &[0, 1, 2, 3, 5, 7, 8],
        &[0, 2, 4, 5, 8],
    ],
};

/// Hamming (16,11,4), the embedded LC row code.
pub const HAMMING_16_11_4: HammingCode = HammingCode {
    data_bits: 11,
    equations: &[
        &[0, 1, 2, 3, 5, 7, 8],
        &[1, 2, 3, 4, 6, 8, 9],
        &[2, 3, 4, 5, 7, 9, 10],
        &[0, 1, 2, 4, 6, 7, 10],
        &[0, 2, 5, 6, 8, 9, 10],
    ],
};

impl HammingCode {
    /// Total codeword length in bits.
    pub fn codeword_bits(&self) -> usize {
        self.data_bits + self.equations.len()
    }

    fn parity(&self, word: &[bool], equation: usize) -> bool {
        self.equations[equation]
            .iter()
            .fold(false, |acc, &bit| acc ^ word[bit])
    }

    fn syndrome_of_position(&self, pos: usize) -> u32 {
        if pos >= self.data_bits {
            return 1 << (pos - self.data_bits);
        }
        self.equations
            .iter()
            .enumerate()
            .filter(|(_, eq)| eq.contains(&pos))
            .fold(0, |acc, (j, _)| acc | (1 << j))
    }

    /// Fill in the parity bits of `word[..self.codeword_bits()]`.
    pub fn encode(&self, word: &mut [bool]) {
        for j in 0..self.equations.len() {
            word[self.data_bits + j] = self.parity(word, j);
        }
    }

    /// Check `word` and correct a single bit error in place.
    pub fn decode(&self, word: &mut [bool]) -> Syndrome {
        let syndrome = (0..self.equations.len()).fold(0u32, |acc, j| {
            if self.parity(word, j) != word[self.data_bits + j] {
                acc | (1 << j)
            } else {
                acc
            }
        });
        if syndrome == 0 {
            return Syndrome::Clean;
        }

        match (0..self.codeword_bits()).find(|&pos| self.syndrome_of_position(pos) == syndrome) {
            Some(pos) => {
                word[pos] = !word[pos];
                Syndrome::Corrected(pos)
            }
            None => Syndrome::Uncorrectable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(code: &HammingCode, seed: u32) -> Vec<bool> {
        let mut word: Vec<bool> = (0..code.codeword_bits()).map(|i| (seed >> i) & 1 == 1).collect();
        code.encode(&mut word);
        word
    }

    #[test]
    fn test_every_single_error_is_corrected() {
        for code in [&HAMMING_15_11_3, &HAMMING_13_9_3, &HAMMING_16_11_4] {
            let clean = word(code, 0b101_1001_0110);
            assert_eq!(code.decode(&mut clean.clone()), Syndrome::Clean);
            for pos in 0..code.codeword_bits() {
                let mut damaged = clean.clone();
                damaged[pos] = !damaged[pos];
                assert_eq!(code.decode(&mut damaged), Syndrome::Corrected(pos));
                assert_eq!(damaged, clean, "position {pos}");
            }
        }
    }

    #[test]
    fn test_double_error_detected_by_extended_code() {
        let clean = word(&HAMMING_16_11_4, 0b011_0110_1010);
        let mut damaged = clean.clone();
        damaged[1] = !damaged[1];
        damaged[2] = !damaged[2];
        assert_eq!(HAMMING_16_11_4.decode(&mut damaged), Syndrome::Uncorrectable);
    }
}
