//! Embedded link control, spread over voice bursts B to E of a superframe.
//!
//! The 72 LC bits and a five-bit checksum fill a 16x8 matrix protected by
//! Hamming (16,11,4) rows and a column parity row. The matrix is read out
//! column-wise into 128 bits and sent as four 32-bit fragments.

use super::emb::{LCSS_CONTINUATION, LCSS_FIRST, LCSS_LAST, LCSS_SINGLE};
use super::lc::{LinkControl, LC_LENGTH};
use crate::fec::crc::five_bit_checksum;
use crate::fec::hamming::HAMMING_16_11_4;
use crate::fec::{read_bit, write_bit};

const MATRIX_BITS: usize = 128;
const ROW_BITS: usize = 16;
const CODED_ROWS: usize = 7;
const FRAGMENT_BITS: usize = 32;

/// Burst bit offset of the fragment, between the two halves of the EMB.
const FRAGMENT_OFFSET: usize = 116;

/// Matrix positions of the five checksum bits, most significant first.
const CHECKSUM_POSITIONS: [usize; 5] = [42, 58, 74, 90, 106];

/// Matrix positions of the 72 LC bits, in order.
fn lc_positions() -> impl Iterator<Item = usize> {
    (0..11)
        .chain(16..27)
        .chain((2..CODED_ROWS).flat_map(|row| {
            let start = row * ROW_BITS;
            start..start + 10
        }))
}

/// Matrix index of transmitted bit `a`.
fn interleave() -> [usize; MATRIX_BITS] {
    let mut order = [0usize; MATRIX_BITS];
    let mut b = 0;
    for slot in order.iter_mut() {
        *slot = b;
        b += 16;
        if b > 127 {
            b -= 127;
        }
    }
    order
}

/// One fragment of embedded signalling as carried by a voice burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EmbeddedFragment {
    pub lcss: u8,
    pub bits: [u8; 4],
}

impl EmbeddedFragment {
    pub fn write(&self, burst: &mut [u8]) {
        for i in 0..FRAGMENT_BITS {
            write_bit(burst, FRAGMENT_OFFSET + i, read_bit(&self.bits, i));
        }
    }

    /// Read the fragment bits; `lcss` comes from the EMB.
    pub fn read(burst: &[u8], lcss: u8) -> Self {
        let mut bits = [0u8; 4];
        for i in 0..FRAGMENT_BITS {
            write_bit(&mut bits, i, read_bit(burst, FRAGMENT_OFFSET + i));
        }
        Self { lcss, bits }
    }
}

/// The encoded embedded LC of one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedLc {
    raw: [bool; MATRIX_BITS],
}

impl EmbeddedLc {
    pub fn new(lc: &LinkControl) -> Self {
        let bytes = lc.to_bytes();
        let mut matrix = [false; MATRIX_BITS];

        for (i, pos) in lc_positions().enumerate() {
            matrix[pos] = read_bit(&bytes, i);
        }
        let checksum = five_bit_checksum(&bytes);
        for (i, &pos) in CHECKSUM_POSITIONS.iter().enumerate() {
            matrix[pos] = checksum & (0x10 >> i) != 0;
        }

        for row in 0..CODED_ROWS {
            let start = row * ROW_BITS;
            HAMMING_16_11_4.encode(&mut matrix[start..start + ROW_BITS]);
        }
        for c in 0..ROW_BITS {
            matrix[CODED_ROWS * ROW_BITS + c] =
                (0..CODED_ROWS).fold(false, |acc, row| acc ^ matrix[row * ROW_BITS + c]);
        }

        let mut raw = [false; MATRIX_BITS];
        for (slot, src) in raw.iter_mut().zip(interleave()) {
            *slot = matrix[src];
        }
        Self { raw }
    }

    /// Fragment for superframe position `n`.
    ///
    /// Positions 1 to 4 carry the LC; everything else carries null signalling.
    pub fn fragment(&self, n: u8) -> EmbeddedFragment {
        let lcss = match n {
            1 => LCSS_FIRST,
            2 | 3 => LCSS_CONTINUATION,
            4 => LCSS_LAST,
            _ => return EmbeddedFragment::default(),
        };

        let start = usize::from(n - 1) * FRAGMENT_BITS;
        let mut bits = [0u8; 4];
        for (i, &bit) in self.raw[start..start + FRAGMENT_BITS].iter().enumerate() {
            write_bit(&mut bits, i, bit);
        }
        EmbeddedFragment { lcss, bits }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum CollectorState {
    #[default]
    Idle,
    /// Waiting for the fragment with this index.
    Expecting(usize),
}

/// Reassembles embedded LC fragments received in voice bursts.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedCollector {
    raw: Vec<bool>,
    state: CollectorState,
}

impl EmbeddedCollector {
    pub fn new() -> Self {
        Self {
            raw: Vec::with_capacity(MATRIX_BITS),
            state: CollectorState::Idle,
        }
    }

    pub fn reset(&mut self) {
        self.raw.clear();
        self.state = CollectorState::Idle;
    }

    fn append(&mut self, fragment: &EmbeddedFragment) {
        self.raw
            .extend((0..FRAGMENT_BITS).map(|i| read_bit(&fragment.bits, i)));
    }

    /// Feed one fragment; returns the LC when the last fragment completes a valid set.
    pub fn push(&mut self, fragment: &EmbeddedFragment) -> Option<LinkControl> {
        match (fragment.lcss, self.state) {
            (LCSS_FIRST, _) => {
                self.raw.clear();
                self.append(fragment);
                self.state = CollectorState::Expecting(1);
                None
            }
            (LCSS_CONTINUATION, CollectorState::Expecting(index @ (1 | 2))) => {
                self.append(fragment);
                self.state = CollectorState::Expecting(index + 1);
                None
            }
            (LCSS_LAST, CollectorState::Expecting(3)) => {
                self.append(fragment);
                let lc = self.decode();
                self.reset();
                lc
            }
            (LCSS_SINGLE, _) => None,
            _ => {
                self.reset();
                None
            }
        }
    }

    fn decode(&self) -> Option<LinkControl> {
        let mut matrix = [false; MATRIX_BITS];
        for (&bit, dst) in self.raw.iter().zip(interleave()) {
            matrix[dst] = bit;
        }

        for row in 0..CODED_ROWS {
            let start = row * ROW_BITS;
            if !HAMMING_16_11_4
                .decode(&mut matrix[start..start + ROW_BITS])
                .is_usable()
            {
                return None;
            }
        }
        let columns_ok = (0..ROW_BITS).all(|c| {
            !(0..=CODED_ROWS).fold(false, |acc, row| acc ^ matrix[row * ROW_BITS + c])
        });
        if !columns_ok {
            return None;
        }

        let mut bytes = [0u8; LC_LENGTH];
        for (i, pos) in lc_positions().enumerate() {
            write_bit(&mut bytes, i, matrix[pos]);
        }
        let checksum = CHECKSUM_POSITIONS
            .iter()
            .enumerate()
            .fold(0u8, |acc, (i, &pos)| if matrix[pos] { acc | (0x10 >> i) } else { acc });
        if checksum != five_bit_checksum(&bytes) {
            return None;
        }

        LinkControl::from_bytes(&bytes).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CallType, DmrId};

    fn lc() -> LinkControl {
        LinkControl::new(CallType::Group, DmrId::new(3_100_001), DmrId::new(31_000))
    }

    #[test]
    fn test_positions() {
        let positions: Vec<usize> = lc_positions().collect();
        assert_eq!(positions.len(), 72);
        assert!(positions
            .iter()
            .all(|p| !CHECKSUM_POSITIONS.contains(p) && p % 16 < 11));
        let order = interleave();
        assert_eq!(order[1], 16);
        assert_eq!(order[8], 1);
        assert_eq!(order[127], 127);
    }

    #[test]
    fn test_lcss_sequence() {
        let embedded = EmbeddedLc::new(&lc());
        let lcss: Vec<u8> = (0..6).map(|n| embedded.fragment(n).lcss).collect();
        assert_eq!(lcss, [0, 1, 3, 3, 2, 0]);
        assert_eq!(embedded.fragment(5).bits, [0; 4]);
    }

    #[test]
    fn test_collector_reassembles() {
        let embedded = EmbeddedLc::new(&lc());
        let mut collector = EmbeddedCollector::new();
        for n in 1..4 {
            assert_eq!(collector.push(&embedded.fragment(n)), None);
        }
        assert_eq!(collector.push(&embedded.fragment(4)), Some(lc()));
    }

    #[test]
    fn test_collector_corrects_single_error_per_row() {
        let embedded = EmbeddedLc::new(&lc());
        let mut collector = EmbeddedCollector::new();
        let mut first = embedded.fragment(1);
        first.bits[0] ^= 0x80;
        collector.push(&first);
        collector.push(&embedded.fragment(2));
        collector.push(&embedded.fragment(3));
        assert_eq!(collector.push(&embedded.fragment(4)), Some(lc()));
    }

    #[test]
    fn test_collector_rejects_out_of_order() {
        let embedded = EmbeddedLc::new(&lc());
        let mut collector = EmbeddedCollector::new();
        collector.push(&embedded.fragment(1));
        collector.push(&embedded.fragment(3));
        assert_eq!(collector.push(&embedded.fragment(4)), None);

        // A fresh first fragment restarts collection.
        for n in 1..4 {
            collector.push(&embedded.fragment(n));
        }
        assert_eq!(collector.push(&embedded.fragment(4)), Some(lc()));
    }

    #[test]
    fn test_fragment_placement() {
        let fragment = EmbeddedFragment {
            lcss: LCSS_FIRST,
            bits: [0xDE, 0xAD, 0xBE, 0xEF],
        };
        let mut burst = [0u8; 33];
        fragment.write(&mut burst);
        assert_eq!(&burst[14..19], &[0x0D, 0xEA, 0xDB, 0xEE, 0xF0]);
        assert_eq!(EmbeddedFragment::read(&burst, LCSS_FIRST), fragment);
    }
}
