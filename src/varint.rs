//! LEB128 variable-length integers.
//!
//! Seven payload bits per byte, least significant group first, high bit set on
//! every byte except the last. Small magnitudes cost one byte; a typical
//! two-decimal price costs two or three.
//!
//! Words up to 18 groups (126 bits) are handled as `u128`, anything wider as
//! [`BigUint`]. The reader rejects non-minimal encodings (a trailing zero
//! group) so that every word has exactly one byte representation.

use num_bigint::BigUint;

/// Groups that always fit in a `u128`.
const SMALL_GROUPS: usize = 18;

pub(crate) fn write_u128(mut value: u128, out: &mut Vec<u8>) {
    loop {
        let group = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(group);
            return;
        }
        out.push(group | 0x80);
    }
}

pub(crate) fn write_big(value: &BigUint, out: &mut Vec<u8>) {
    let groups = value.to_radix_le(128);
    if groups.is_empty() {
        out.push(0);
        return;
    }
    let last = groups.len() - 1;
    for (i, group) in groups.into_iter().enumerate() {
        out.push(if i == last { group } else { group | 0x80 });
    }
}

/// A decoded varint word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Word {
    Small(u128),
    Big(BigUint),
}

/// Why a varint was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VarintError {
    TooLong,
    NonMinimal,
}

/// Accumulates varint bytes that may arrive split across chunks.
#[derive(Debug, Default)]
pub(crate) struct VarintReader {
    groups: Vec<u8>,
    max_len: usize,
}

impl VarintReader {
    pub(crate) fn new(max_len: usize) -> Self {
        VarintReader {
            groups: Vec::with_capacity(SMALL_GROUPS),
            max_len: max_len.max(1),
        }
    }

    /// True when no byte of the next word has been seen.
    pub(crate) fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Feeds one byte; returns the word once its last byte arrives.
    pub(crate) fn push(&mut self, byte: u8) -> Result<Option<Word>, VarintError> {
        if self.groups.len() == self.max_len {
            return Err(VarintError::TooLong);
        }
        self.groups.push(byte & 0x7f);
        if byte & 0x80 != 0 {
            return Ok(None);
        }
        if self.groups.len() > 1 && byte == 0 {
            return Err(VarintError::NonMinimal);
        }

        let word = if self.groups.len() <= SMALL_GROUPS {
            let value = self
                .groups
                .iter()
                .rev()
                .fold(0u128, |acc, &group| (acc << 7) | u128::from(group));
            Word::Small(value)
        } else {
            // every group is below the radix, so this cannot fail
            match BigUint::from_radix_le(&self.groups, 128) {
                Some(value) => Word::Big(value),
                None => return Err(VarintError::TooLong),
            }
        };
        self.groups.clear();
        Ok(Some(word))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(bytes: &[u8]) -> Result<Vec<Word>, VarintError> {
        let mut reader = VarintReader::new(64);
        let mut words = Vec::new();
        for &byte in bytes {
            if let Some(word) = reader.push(byte)? {
                words.push(word);
            }
        }
        assert!(reader.is_empty());
        Ok(words)
    }

    #[test]
    fn test_known_encodings() {
        let cases: &[(u128, &[u8])] = &[
            (0, &[0x00]),
            (1, &[0x01]),
            (127, &[0x7f]),
            (128, &[0x80, 0x01]),
            (300, &[0xac, 0x02]),
            (16384, &[0x80, 0x80, 0x01]),
        ];
        for (value, bytes) in cases {
            let mut out = Vec::new();
            write_u128(*value, &mut out);
            assert_eq!(out, *bytes, "encoding {value}");
            assert_eq!(read_all(bytes).unwrap(), vec![Word::Small(*value)]);
        }
    }

    #[test]
    fn test_u128_max() {
        let mut out = Vec::new();
        write_u128(u128::MAX, &mut out);
        assert_eq!(out.len(), 19);
        let words = read_all(&out).unwrap();
        assert_eq!(words, vec![Word::Big(BigUint::from(u128::MAX))]);
    }

    #[test]
    fn test_big_matches_small_layout() {
        let value = 1u128 << 100;
        let mut small = Vec::new();
        let mut big = Vec::new();
        write_u128(value, &mut small);
        write_big(&BigUint::from(value), &mut big);
        assert_eq!(small, big);
    }

    #[test]
    fn test_wide_big_roundtrip() {
        let value = BigUint::from(u128::MAX) * BigUint::from(u128::MAX);
        let mut out = Vec::new();
        write_big(&value, &mut out);
        assert_eq!(read_all(&out).unwrap(), vec![Word::Big(value)]);
    }

    #[test]
    fn test_rejects_non_minimal() {
        assert_eq!(read_all(&[0x81, 0x00]), Err(VarintError::NonMinimal));
    }

    #[test]
    fn test_rejects_too_long() {
        let mut reader = VarintReader::new(2);
        assert_eq!(reader.push(0x80), Ok(None));
        assert_eq!(reader.push(0x80), Ok(None));
        assert_eq!(reader.push(0x01), Err(VarintError::TooLong));
    }

    #[test]
    fn test_split_word_is_pending() {
        let mut reader = VarintReader::new(8);
        assert_eq!(reader.push(0xac), Ok(None));
        assert!(!reader.is_empty());
        assert_eq!(reader.push(0x02), Ok(Some(Word::Small(300))));
    }
}
