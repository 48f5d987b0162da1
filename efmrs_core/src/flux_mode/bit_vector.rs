//! Module providing a fixed width multi-word bit vector
use serde::{Deserialize, Serialize};

/// Number of bits held by each word of a [`BitVector`]
pub const WORD_BITS: usize = 64;

/// Bit vector stored as an array of 64 bit words, bit `i` lives in word `i / 64` at position
/// `i % 64` (low bit first)
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BitVector {
    words: Vec<u64>,
}

impl BitVector {
    /// Create a bit vector able to hold `bit_count` bits, all unset
    pub fn new(bit_count: usize) -> Self {
        BitVector {
            words: vec![0; bit_count.div_ceil(WORD_BITS)],
        }
    }

    pub fn from_words(words: Vec<u64>) -> Self {
        BitVector { words }
    }

    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Number of words in the vector
    pub fn width(&self) -> usize {
        self.words.len()
    }

    /// Set `bit`
    ///
    /// # Panics
    /// Panics if `bit` is beyond the width of the vector
    pub fn set_bit(&mut self, bit: usize) {
        self.words[bit / WORD_BITS] |= 1u64 << (bit % WORD_BITS);
    }

    /// Whether `bit` is set, bits beyond the width of the vector are unset
    pub fn get_bit(&self, bit: usize) -> bool {
        match self.words.get(bit / WORD_BITS) {
            Some(word) => word & (1u64 << (bit % WORD_BITS)) != 0,
            None => false,
        }
    }

    /// Word-by-word AND of two vectors
    pub fn and(&self, other: &BitVector) -> BitVector {
        BitVector {
            words: self
                .words
                .iter()
                .zip(other.words.iter())
                .map(|(a, b)| a & b)
                .collect(),
        }
    }

    /// Population count across all words
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Whether every bit set in `self` is also set in `other`
    pub fn is_subset_of(&self, other: &BitVector) -> bool {
        self.words.len() == other.words.len()
            && self
                .words
                .iter()
                .zip(other.words.iter())
                .all(|(a, b)| a & b == *a)
    }

    /// Indices of the set bits, in increasing order
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words
            .iter()
            .enumerate()
            .flat_map(|(index, &word)| Ones {
                word,
                base: index * WORD_BITS,
            })
    }
}

/// Iterator over the set bits of a single word
struct Ones {
    word: u64,
    base: usize,
}

impl Iterator for Ones {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        if self.word == 0 {
            return None;
        }
        let offset = self.word.trailing_zeros() as usize;
        self.word &= self.word - 1;
        Some(self.base + offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get() {
        let mut bits = BitVector::new(130);
        assert_eq!(bits.width(), 3);
        bits.set_bit(0);
        bits.set_bit(63);
        bits.set_bit(64);
        bits.set_bit(129);
        assert!(bits.get_bit(0));
        assert!(bits.get_bit(63));
        assert!(bits.get_bit(64));
        assert!(bits.get_bit(129));
        assert!(!bits.get_bit(1));
        assert!(!bits.get_bit(500));
        assert_eq!(bits.count_ones(), 4);
        assert_eq!(bits.iter_ones().collect::<Vec<_>>(), vec![0, 63, 64, 129]);
    }

    #[test]
    fn and_and_subset() {
        let a = BitVector::from_words(vec![0b1011, 1 << 5]);
        let b = BitVector::from_words(vec![0b0110, (1 << 5) | 1]);
        let c = a.and(&b);
        assert_eq!(c.words(), &[0b0010, 1 << 5]);
        assert!(c.is_subset_of(&a));
        assert!(c.is_subset_of(&b));
        assert!(!a.is_subset_of(&b));
        assert!(c.count_ones() <= a.count_ones().min(b.count_ones()));
        // Different widths are never subsets
        assert!(!BitVector::new(64).is_subset_of(&BitVector::new(128)));
    }

    #[test]
    fn empty_vector() {
        let bits = BitVector::new(0);
        assert_eq!(bits.width(), 0);
        assert_eq!(bits.count_ones(), 0);
        assert_eq!(bits.iter_ones().count(), 0);
    }
}
