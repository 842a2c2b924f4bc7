//! A persistable Bloom filter with deterministic hashing.
//!
//! # Bloom Filters
//!
//! A Bloom filter is a space-efficient probabilistic data structure that is
//! used to test whether an element is a member of a set. It allows for queries
//! to return: "possibly in set" or "definitely not in set". Elements can be
//! added to the set, but not removed; the more elements that are added to the
//! set, the larger the probability of false positives.
//!
//! # Deterministic Hashing
//!
//! The filter is meant to be stored and reloaded, so its bit positions must be
//! recomputable after a restart. General purpose hashers seed themselves per
//! process and are unusable here. Instead, items expose a stable byte
//! representation through [`StableBytes`], and one of a small set of fixed
//! algorithms ([`HashAlgorithm`]) folds those bytes into a 64-bit digest.
//!
//! # Enhanced Double Hashing
//!
//! Bit positions are derived from a single digest `d` of the item:
//!
//! g<sub>i</sub>(x) = (H<sub>1</sub> + iH<sub>2</sub> + i<sup>3</sup>) mod m, where
//! H<sub>1</sub> = mix(d) and H<sub>2</sub> = mix(d ⊕ s) for a fixed salt `s`
//!
//! The scheme is part of the serialized format: a restored filter probes the
//! same positions as the one that was saved.
//!
//! # Example
//!
//! ```
//! use detbloom::BloomFilter;
//!
//! let mut filter = BloomFilter::with_rate(1000, 0.01)?;
//!
//! filter.insert("foo");
//! filter.insert("bar");
//!
//! assert!(filter.contains("foo"));
//! assert!(filter.contains("bar"));
//! assert!(!filter.contains("baz"));
//!
//! let bytes = filter.to_bytes();
//! let restored = BloomFilter::from_bytes(&bytes)?;
//!
//! assert!(restored.contains("foo"));
//! # Ok::<(), detbloom::Error>(())
//! ```
#![warn(missing_docs)]
#![allow(clippy::bool_assert_comparison)]

pub mod bitvec;
pub mod bloom;
pub mod codec;
pub mod error;
pub mod hash;

pub use bloom::{
    BloomFilter, BloomFilterConfig, DEFAULT_FALSE_POSITIVE_RATE, MAX_BIT_COUNT, MAX_HASH_ROUNDS,
};
pub use error::{Error, Result};
pub use hash::{HashAlgorithm, StableBytes};
