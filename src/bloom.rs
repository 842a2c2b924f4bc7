// Copyright (c) 2018 Aleksandr Bezobchuk
// Copyright (c) 2022 Alexis Sellier
//
// Licensed under the MIT license.

//! A persistable Bloom filter using enhanced double hashing over a
//! deterministic base digest.

use std::f64;
use std::fmt;

use tracing::debug;

use crate::bitvec::BitVec;
use crate::error::{Error, Result};
use crate::hash::{mix64, HashAlgorithm, StableBytes};

/// The default false positive probability value, 1%.
pub const DEFAULT_FALSE_POSITIVE_RATE: f64 = 0.01;

/// `ln` squared.
const LN_SQR: f64 = f64::consts::LN_2 * f64::consts::LN_2;

/// Largest number of hash rounds a filter may use.
pub const MAX_HASH_ROUNDS: usize = 64;

/// Largest bit array size a filter may use.
pub const MAX_BIT_COUNT: usize = isize::MAX as usize / 8;

/// Mixed into the base digest to derive the second hash. Changing it moves
/// every bit position, which invalidates stored filters.
const SECOND_HASH_SALT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Size, round count and hash algorithm of a filter.
///
/// Always valid once constructed: both counts are positive, the bit count is
/// at most [`MAX_BIT_COUNT`] and the round count at most [`MAX_HASH_ROUNDS`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "serde_impl::RawConfig"))]
pub struct BloomFilterConfig {
    bit_count: usize,
    hash_rounds: usize,
    algorithm: HashAlgorithm,
}

impl BloomFilterConfig {
    /// Configuration with an explicit bit array size and round count.
    pub fn new(bit_count: usize, hash_rounds: usize, algorithm: HashAlgorithm) -> Result<Self> {
        if bit_count == 0 {
            return Err(Error::invalid("bit count must be positive"));
        }
        if bit_count > MAX_BIT_COUNT {
            return Err(Error::invalid(format!(
                "bit count {bit_count} exceeds {MAX_BIT_COUNT}"
            )));
        }
        if hash_rounds == 0 {
            return Err(Error::invalid("hash round count must be positive"));
        }
        if hash_rounds > MAX_HASH_ROUNDS {
            return Err(Error::invalid(format!(
                "hash round count {hash_rounds} exceeds {MAX_HASH_ROUNDS}"
            )));
        }
        Ok(Self {
            bit_count,
            hash_rounds,
            algorithm,
        })
    }

    /// Configuration sized for `capacity` items at the given false positive rate.
    pub fn for_capacity(capacity: usize, fp_rate: f64, algorithm: HashAlgorithm) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::invalid("expected element count must be positive"));
        }
        if !(fp_rate > 0. && fp_rate < 1.) {
            return Err(Error::invalid(format!(
                "false positive rate {fp_rate} is outside (0, 1)"
            )));
        }
        let required = -(fp_rate.ln() * (capacity as f64)) / LN_SQR;
        if !required.is_finite() || required > MAX_BIT_COUNT as f64 {
            return Err(Error::invalid(format!(
                "{capacity} elements at rate {fp_rate} need more bits than addressable"
            )));
        }
        let nbits = optimal_bits(capacity, fp_rate).max(1);
        let nhashes = optimal_hashes(nbits, capacity).min(MAX_HASH_ROUNDS);

        Self::new(nbits, nhashes, algorithm)
    }

    /// Size of the bit array (`m`).
    pub fn bit_count(&self) -> usize {
        self.bit_count
    }

    /// Number of positions probed per item (`k`).
    pub fn hash_rounds(&self) -> usize {
        self.hash_rounds
    }

    /// Algorithm driving every round.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }
}

impl fmt::Display for BloomFilterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bits, {} rounds, {}",
            self.bit_count, self.hash_rounds, self.algorithm
        )
    }
}

/// A Bloom filter over any [`StableBytes`] item.
///
/// Bit positions depend only on the item bytes and the filter's
/// configuration, so a filter restored with [`BloomFilter::from_bytes`]
/// answers every query exactly as the filter that was saved.
///
/// The filter is a plain value. Share it across threads behind a lock if
/// more than one writer is needed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BloomFilter {
    bits: BitVec,
    config: BloomFilterConfig,
}

impl BloomFilter {
    /// Return a new Bloom filter with a given approximate item capacity.
    /// The default false positive probability is set and defined by
    /// [`DEFAULT_FALSE_POSITIVE_RATE`].
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_rate(capacity, DEFAULT_FALSE_POSITIVE_RATE)
    }

    /// Return a new Bloom filter with a given approximate item capacity
    /// and a desired false positive rate, hashing with [`HashAlgorithm::Djb2`].
    pub fn with_rate(capacity: usize, fp_rate: f64) -> Result<Self> {
        BloomFilterConfig::for_capacity(capacity, fp_rate, HashAlgorithm::default())
            .map(Self::from_config)
    }

    /// Return a new Bloom filter with an explicit size in bits and number of rounds.
    pub fn with_params(
        bit_count: usize,
        hash_rounds: usize,
        algorithm: HashAlgorithm,
    ) -> Result<Self> {
        BloomFilterConfig::new(bit_count, hash_rounds, algorithm).map(Self::from_config)
    }

    /// Return a new Bloom filter given a size in bytes for the filter.
    pub fn with_size(nbytes: usize, algorithm: HashAlgorithm) -> Result<Self> {
        let nbits = nbytes
            .checked_mul(8)
            .ok_or_else(|| Error::invalid(format!("{nbytes} bytes is too large")))?;
        if nbits == 0 {
            return Err(Error::invalid("filter size must be positive"));
        }
        let capacity = optimal_capacity(nbits, DEFAULT_FALSE_POSITIVE_RATE).max(1);
        let nhashes = optimal_hashes(nbits, capacity);

        Self::with_params(nbits, nhashes, algorithm)
    }

    /// Return an empty filter for a validated configuration.
    pub fn from_config(config: BloomFilterConfig) -> Self {
        debug!(
            bits = config.bit_count,
            rounds = config.hash_rounds,
            algorithm = %config.algorithm,
            "created bloom filter"
        );
        Self {
            bits: BitVec::new(config.bit_count),
            config,
        }
    }

    pub(crate) fn from_parts(config: BloomFilterConfig, bits: BitVec) -> Self {
        debug_assert_eq!(config.bit_count, bits.len());

        Self { bits, config }
    }

    /// Set an item in the Bloom filter. This operation is idempotent with regards
    /// to each unique item.
    ///
    /// Returns `true` if at least one bit changed, ie. the item was definitely
    /// not present before.
    pub fn insert<T: StableBytes + ?Sized>(&mut self, item: &T) -> bool {
        let (h1, h2) = self.base_hashes(item);
        let mut changed = false;

        for i in 0..self.config.hash_rounds {
            let index = self.bloom_hash(h1, h2, i as u64);
            changed |= self.bits.set(index);
        }
        changed
    }

    /// Return whether or not a given item is likely in the Bloom filter or not. There is a
    /// possibility for a false positive with the probability being under the Bloom filter's `p`
    /// value, but a false negative will never occur.
    pub fn contains<T: StableBytes + ?Sized>(&self, item: &T) -> bool {
        let (h1, h2) = self.base_hashes(item);

        for i in 0..self.config.hash_rounds {
            let index = self.bloom_hash(h1, h2, i as u64);
            if !self.bits.is_set(index) {
                return false;
            }
        }
        true
    }

    /// Set all bits to zero. Items inserted before may no longer be found.
    pub fn clear(&mut self) {
        self.bits.clear();
    }

    /// Return the number of bits in this filter.
    pub fn bits(&self) -> usize {
        self.bits.len()
    }

    /// Number of hashes used (`k` parameter).
    pub fn hashes(&self) -> usize {
        self.config.hash_rounds
    }

    /// Algorithm used to compute the base digest.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.config.algorithm
    }

    /// The filter's configuration.
    pub fn config(&self) -> &BloomFilterConfig {
        &self.config
    }

    /// Number of bits currently set.
    pub fn bits_set(&self) -> usize {
        self.bits.count_ones()
    }

    /// Count the approximate number of items in the filter.
    ///
    /// Saturates at `usize::MAX` once every bit is set.
    pub fn count(&self) -> usize {
        let nbits = self.bits.len() as f64;
        let nbits_set = self.bits.count_ones() as f64;
        let nhashes = self.config.hash_rounds as f64;
        let count = -(nbits / nhashes) * (1. - (nbits_set / nbits)).ln();

        count.round() as usize
    }

    /// Expected false positive rate after `inserted` distinct items:
    /// `(1 - e^(-k * n / m))^k`.
    pub fn estimated_false_positive_rate(&self, inserted: usize) -> f64 {
        let k = self.config.hash_rounds as f64;
        let exponent = -k * (inserted as f64) / (self.bits.len() as f64);

        (1. - exponent.exp()).powf(k)
    }

    /// Compute the union of two Bloom filters.
    pub fn union(&self, other: &Self) -> Result<Self> {
        self.check_comparable(other)?;

        Ok(Self {
            bits: self.bits.union(&other.bits),
            config: self.config,
        })
    }

    /// Compute the intersection of two Bloom filters.
    pub fn intersection(&self, other: &Self) -> Result<Self> {
        self.check_comparable(other)?;

        Ok(Self {
            bits: self.bits.intersection(&other.bits),
            config: self.config,
        })
    }

    /// Check whether two filters can be intersected and unioned.
    pub fn is_comparable(&self, other: &Self) -> bool {
        self.config == other.config
    }

    /// Return the underlying bytes storage.
    pub fn as_bytes(&self) -> &[u8] {
        self.bits.as_bytes()
    }

    fn check_comparable(&self, other: &Self) -> Result<()> {
        if self.is_comparable(other) {
            Ok(())
        } else {
            Err(Error::IncompatibleFilters {
                left: self.config.to_string(),
                right: other.config.to_string(),
            })
        }
    }

    fn base_hashes<T: StableBytes + ?Sized>(&self, item: &T) -> (u64, u64) {
        let digest = self.config.algorithm.apply(item);

        (mix64(digest), mix64(digest ^ SECOND_HASH_SALT))
    }

    fn bloom_hash(&self, h1: u64, h2: u64, i: u64) -> usize {
        let r = h1
            .wrapping_add(i.wrapping_mul(h2))
            .wrapping_add(i.wrapping_pow(3));
        (r % self.bits.len() as u64) as usize
    }
}

impl AsRef<[u8]> for BloomFilter {
    fn as_ref(&self) -> &[u8] {
        self.bits.as_bytes()
    }
}

/// Return the optimal bit vector size for a Bloom filter given an approximate
/// size and a desired false positive rate.
pub fn optimal_bits(capacity: usize, fp_rate: f64) -> usize {
    (-((fp_rate.ln() * (capacity as f64)) / LN_SQR)).ceil() as usize
}

/// Return the optimal item capacity of a filter given a bit vector size and false positive rate.
pub fn optimal_capacity(nbits: usize, fp_rate: f64) -> usize {
    ((-(nbits as f64) * LN_SQR) / fp_rate.ln()).round() as usize
}

/// Return the optimal number of hash functions for a Bloom filter given a
/// bit vector size and an approximate set size. Never less than one.
///
/// Also called `k`.
pub fn optimal_hashes(nbits: usize, capacity: usize) -> usize {
    if capacity == 0 {
        return 1;
    }
    let k = ((nbits as f64 / capacity as f64) * f64::consts::LN_2).round() as usize;

    k.max(1)
}

#[cfg(feature = "serde")]
mod serde_impl {
    use serde::Deserialize;

    use super::BloomFilterConfig;
    use crate::error::Error;
    use crate::hash::HashAlgorithm;

    #[derive(Deserialize)]
    pub(super) struct RawConfig {
        bit_count: usize,
        hash_rounds: usize,
        algorithm: HashAlgorithm,
    }

    impl TryFrom<RawConfig> for BloomFilterConfig {
        type Error = Error;

        fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
            BloomFilterConfig::new(raw.bit_count, raw.hash_rounds, raw.algorithm)
        }
    }
}
