//! Block product turbo code BPTC(196,96) carrying the full LC.
//!
//! 96 data bits sit in a 13x15 matrix (plus one reserved bit), protected by
//! Hamming (15,11,3) rows and Hamming (13,9,3) columns, then interleaved and
//! split around the centre of the burst.

use crate::fec::hamming::{Syndrome, HAMMING_13_9_3, HAMMING_15_11_3};
use crate::fec::{read_bit, write_bit};

const MATRIX_BITS: usize = 196;
const ROWS_WITH_DATA: usize = 9;
const COLUMNS: usize = 15;
const COLUMN_BITS: usize = 13;
const MAX_PASSES: usize = 5;

/// Matrix positions carrying the 96 data bits, in order.
fn data_positions() -> impl Iterator<Item = usize> {
    (4..12).chain((0..8).flat_map(|row| {
        let start = 16 + row * 15;
        start..start + 11
    }))
}

fn interleave_position(index: usize) -> usize {
    (index * 181) % MATRIX_BITS
}

/// Burst bit offset for interleaved bit `index`, skipping the centre field.
fn burst_position(index: usize) -> usize {
    if index < 98 {
        index
    } else {
        index + 68
    }
}

fn column(matrix: &[bool; MATRIX_BITS], c: usize) -> [bool; COLUMN_BITS] {
    let mut col = [false; COLUMN_BITS];
    for (a, bit) in col.iter_mut().enumerate() {
        *bit = matrix[c + 1 + a * COLUMNS];
    }
    col
}

fn set_column(matrix: &mut [bool; MATRIX_BITS], c: usize, col: &[bool; COLUMN_BITS]) {
    for (a, &bit) in col.iter().enumerate() {
        matrix[c + 1 + a * COLUMNS] = bit;
    }
}

/// Encode 12 bytes into the payload bits of `burst`, leaving the centre untouched.
pub fn encode(data: &[u8; 12], burst: &mut [u8]) {
    let mut matrix = [false; MATRIX_BITS];
    for (i, pos) in data_positions().enumerate() {
        matrix[pos] = read_bit(data, i);
    }

    for row in 0..ROWS_WITH_DATA {
        let start = row * COLUMNS + 1;
        HAMMING_15_11_3.encode(&mut matrix[start..start + COLUMNS]);
    }
    for c in 0..COLUMNS {
        let mut col = column(&matrix, c);
        HAMMING_13_9_3.encode(&mut col);
        set_column(&mut matrix, c, &col);
    }

    for (index, &bit) in matrix.iter().enumerate() {
        write_bit(burst, burst_position(interleave_position(index)), bit);
    }
}

/// Decode the payload bits of `burst`, correcting what the product code can.
pub fn decode(burst: &[u8]) -> [u8; 12] {
    let mut matrix = [false; MATRIX_BITS];
    for (index, bit) in matrix.iter_mut().enumerate() {
        *bit = read_bit(burst, burst_position(interleave_position(index)));
    }

    for _ in 0..MAX_PASSES {
        let mut fixing = false;

        for c in 0..COLUMNS {
            let mut col = column(&matrix, c);
            if let Syndrome::Corrected(_) = HAMMING_13_9_3.decode(&mut col) {
                set_column(&mut matrix, c, &col);
                fixing = true;
            }
        }
        for row in 0..ROWS_WITH_DATA {
            let start = row * COLUMNS + 1;
            if let Syndrome::Corrected(_) =
                HAMMING_15_11_3.decode(&mut matrix[start..start + COLUMNS])
            {
                fixing = true;
            }
        }

        if !fixing {
            break;
        }
    }

    let mut data = [0u8; 12];
    for (i, pos) in data_positions().enumerate() {
        write_bit(&mut data, i, matrix[pos]);
    }
    data
}
