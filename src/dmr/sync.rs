//! Sync patterns in bits 108..156 of a burst.

/// Which bits of bytes 13..20 belong to the sync field.
pub const SYNC_MASK: [u8; 7] = [0x0F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xF0];

pub const MS_VOICE_SYNC: [u8; 7] = [0x07, 0xF7, 0xD5, 0xDD, 0x57, 0xDF, 0xD0];
pub const MS_DATA_SYNC: [u8; 7] = [0x0D, 0x5D, 0x7F, 0x77, 0xFD, 0x75, 0x70];
pub const BS_VOICE_SYNC: [u8; 7] = [0x07, 0x55, 0xFD, 0x7D, 0xF7, 0x5F, 0x70];
pub const BS_DATA_SYNC: [u8; 7] = [0x0D, 0xFF, 0x57, 0xD7, 0x5D, 0xF5, 0xD0];

/// Bit errors tolerated when recognising a pattern.
const MAX_SYNC_ERRORS: u32 = 4;

const OFFSET: usize = 13;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPattern {
    MsVoice,
    MsData,
    BsVoice,
    BsData,
}

impl SyncPattern {
    const ALL: [SyncPattern; 4] = [Self::MsVoice, Self::MsData, Self::BsVoice, Self::BsData];

    fn bytes(self) -> &'static [u8; 7] {
        match self {
            Self::MsVoice => &MS_VOICE_SYNC,
            Self::MsData => &MS_DATA_SYNC,
            Self::BsVoice => &BS_VOICE_SYNC,
            Self::BsData => &BS_DATA_SYNC,
        }
    }

    pub fn is_voice(self) -> bool {
        matches!(self, Self::MsVoice | Self::BsVoice)
    }
}

/// Overwrite the sync field of `burst` with `pattern`.
pub fn add(burst: &mut [u8], pattern: SyncPattern) {
    for (i, (&sync, &mask)) in pattern.bytes().iter().zip(SYNC_MASK.iter()).enumerate() {
        let byte = &mut burst[OFFSET + i];
        *byte = (*byte & !mask) | (sync & mask);
    }
}

/// Find the pattern in the sync field, if any is close enough.
pub fn detect(burst: &[u8]) -> Option<SyncPattern> {
    SyncPattern::ALL.into_iter().find(|pattern| {
        let errors: u32 = pattern
            .bytes()
            .iter()
            .zip(SYNC_MASK.iter())
            .enumerate()
            .map(|(i, (&sync, &mask))| ((burst[OFFSET + i] ^ sync) & mask).count_ones())
            .sum();
        errors <= MAX_SYNC_ERRORS
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_keeps_neighbouring_nibbles() {
        let mut burst = [0xAAu8; 33];
        add(&mut burst, SyncPattern::MsVoice);
        assert_eq!(burst[13], 0xA7);
        assert_eq!(burst[19], 0xDA);
        assert_eq!(&burst[14..19], &MS_VOICE_SYNC[1..6]);
    }

    #[test]
    fn test_detect_with_errors() {
        let mut burst = [0u8; 33];
        add(&mut burst, SyncPattern::BsData);
        burst[15] ^= 0x81;
        assert_eq!(detect(&burst), Some(SyncPattern::BsData));

        add(&mut burst, SyncPattern::MsVoice);
        assert!(detect(&burst).is_some_and(SyncPattern::is_voice));

        assert_eq!(detect(&[0u8; 33]), None);
    }
}
