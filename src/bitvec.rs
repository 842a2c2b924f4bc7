// Copyright (c) 2020 Helge Wrede, Alexander Schultheiß, Lukas Simon
// Copyright (c) 2022 Alexis Sellier
//
// Licensed under the MIT license.

//! Bit vector functionality.
use std::fmt::Debug;

use crate::error::{Error, Result};

/// A fixed-length packed bit vector.
///
/// Bit `i` lives in byte `i / 8` at position `i % 8`, least significant bit
/// first. Bits past the length in the last byte are always zero.
#[derive(Clone, PartialEq, Eq)]
pub struct BitVec {
    bytes: Vec<u8>,
    nbits: usize,
}

/// Number of bytes needed to hold `nbits` bits.
pub(crate) fn byte_len(nbits: usize) -> usize {
    nbits / 8 + usize::from(nbits % 8 != 0)
}

impl BitVec {
    /// Create a new, all-zero bit vector of the given capacity, in bits.
    pub fn new(capacity: usize) -> Self {
        Self {
            nbits: capacity,
            bytes: vec![0; byte_len(capacity)],
        }
    }

    /// Rebuild a bit vector from its packed bytes.
    ///
    /// Fails if the byte count doesn't match `nbits`, or if any padding bit
    /// in the last byte is set.
    pub fn from_raw(bytes: Vec<u8>, nbits: usize) -> Result<Self> {
        if bytes.len() != byte_len(nbits) {
            return Err(Error::corrupt(format!(
                "bit array of {} bits needs {} bytes, got {}",
                nbits,
                byte_len(nbits),
                bytes.len()
            )));
        }
        let tail = nbits % 8;
        if tail != 0 {
            let padding = !0u8 << tail;
            if bytes.last().map_or(false, |b| b & padding != 0) {
                return Err(Error::corrupt("padding bits are set"));
            }
        }
        Ok(Self { bytes, nbits })
    }

    /// Get the length in bits of the vector.
    pub fn len(&self) -> usize {
        self.nbits
    }

    /// Check whether this vector is empty, ie. has a length of zero.
    pub fn is_empty(&self) -> bool {
        self.nbits == 0
    }

    /// Set all bits to zero.
    pub fn clear(&mut self) {
        self.bytes.iter_mut().for_each(|b| *b = 0);
    }

    /// Set a single bit to `1`. Returns whether the bit was previously unset.
    pub fn set(&mut self, index: usize) -> bool {
        let (byte_index, mask) = self.locate(index);
        let was_unset = self.bytes[byte_index] & mask == 0;

        self.bytes[byte_index] |= mask;
        was_unset
    }

    /// Check whether a bit is set.
    pub fn is_set(&self, index: usize) -> bool {
        let (byte_index, mask) = self.locate(index);

        self.bytes[byte_index] & mask == mask
    }

    /// Count the number of `1` bits.
    pub fn count_ones(&self) -> usize {
        self.bytes.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Count the number of `0` bits.
    pub fn count_zeros(&self) -> usize {
        self.len() - self.count_ones()
    }

    /// Return the union of two bit vectors of the same length.
    /// This is a bitwise `OR` of two vectors.
    pub fn union(&self, other: &Self) -> Self {
        self.zip_with(other, |a, b| a | b)
    }

    /// Return the intersection of two bit vectors of the same length.
    /// This is a bitwise `AND` of two vectors.
    pub fn intersection(&self, other: &Self) -> Self {
        self.zip_with(other, |a, b| a & b)
    }

    /// Return the underlying bytes storage.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn zip_with(&self, other: &Self, op: impl Fn(u8, u8) -> u8) -> Self {
        if self.nbits != other.nbits {
            panic!(
                "unable to combine bitvecs with different lengths: {} and {}",
                self.nbits, other.nbits
            );
        }

        Self {
            bytes: self
                .bytes
                .iter()
                .zip(other.bytes.iter())
                .map(|(a, b)| op(*a, *b))
                .collect(),
            nbits: self.nbits,
        }
    }

    fn locate(&self, index: usize) -> (usize, u8) {
        if index >= self.len() {
            panic!(
                "index out of bounds: the len is {} but the index is {}",
                self.len(),
                index,
            )
        }
        (index / 8, 0x01 << (index % 8))
    }
}

impl Debug for BitVec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bits: String = (0..self.nbits)
            .map(|i| if self.is_set(i) { '1' } else { '0' })
            .collect();
        write!(f, "BitVec({})", bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitvec_with_length() {
        let bitvec = BitVec::new(1);
        assert_eq!(1, bitvec.len());
        assert_eq!(1, bitvec.as_bytes().len());

        let bitvec = BitVec::new(8);
        assert_eq!(8, bitvec.len());
        assert_eq!(1, bitvec.as_bytes().len());

        let bitvec = BitVec::new(9);
        assert_eq!(9, bitvec.len());
        assert_eq!(2, bitvec.as_bytes().len());
    }

    #[test]
    fn set_is_monotonic() {
        let mut bitvec = BitVec::new(9);

        assert!(bitvec.set(8));
        assert!(!bitvec.set(8));
        assert!(bitvec.is_set(8));
        for i in 0..8 {
            assert!(!bitvec.is_set(i));
        }
        assert_eq!(1, bitvec.count_ones());
        assert_eq!(8, bitvec.count_zeros());
    }

    #[test]
    fn set_uses_lsb_first_layout() {
        let mut bitvec = BitVec::new(16);
        bitvec.set(0);
        bitvec.set(9);

        assert_eq!(bitvec.as_bytes(), &[0b0000_0001, 0b0000_0010]);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn must_set_with_correct_index() {
        BitVec::new(5).set(5);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn must_get_with_correct_index() {
        BitVec::new(12).is_set(12);
    }

    #[test]
    fn clear_resets_all_bits() {
        let mut bitvec = BitVec::new(24);
        bitvec.set(0);
        bitvec.set(23);
        bitvec.clear();

        assert_eq!(0, bitvec.count_ones());
    }

    #[test]
    fn bitvec_union_and_intersection() {
        let mut a = BitVec::new(6);
        a.set(0);
        a.set(3);

        let mut b = BitVec::new(6);
        b.set(2);
        b.set(3);
        b.set(5);

        let union = a.union(&b);
        assert_eq!(4, union.count_ones());
        for i in [0, 2, 3, 5] {
            assert!(union.is_set(i));
        }

        let intersection = a.intersection(&b);
        assert_eq!(1, intersection.count_ones());
        assert!(intersection.is_set(3));
    }

    #[test]
    #[should_panic(expected = "different lengths")]
    fn must_union_with_same_length() {
        BitVec::new(8).union(&BitVec::new(16));
    }

    #[test]
    #[should_panic(expected = "different lengths")]
    fn must_intersect_with_same_length() {
        BitVec::new(9).intersection(&BitVec::new(8));
    }

    #[test]
    fn from_raw_round_trips() {
        let mut bitvec = BitVec::new(11);
        bitvec.set(1);
        bitvec.set(10);

        let restored = BitVec::from_raw(bitvec.as_bytes().to_vec(), 11).unwrap();
        assert_eq!(bitvec, restored);
    }

    #[test]
    fn from_raw_rejects_length_mismatch() {
        assert!(BitVec::from_raw(vec![0; 1], 9).unwrap_err().is_corrupt());
        assert!(BitVec::from_raw(vec![0; 3], 9).unwrap_err().is_corrupt());
    }

    #[test]
    fn from_raw_rejects_padding_bits() {
        assert!(BitVec::from_raw(vec![0xff, 0b0000_0001], 9).is_ok());
        assert!(BitVec::from_raw(vec![0xff, 0b0000_0010], 9)
            .unwrap_err()
            .is_corrupt());
    }
}
