// Copyright (c) 2022 Alexis Sellier
//
// Licensed under the MIT license.

//! Deterministic hash functions.
//!
//! The digests produced here depend only on the chosen [`HashAlgorithm`] and
//! the input bytes. There is no per-process seed, so a digest computed today
//! is the digest computed after a restart, on another machine, or after a
//! filter has been written to disk and read back. This rules out
//! [`std::collections::hash_map::RandomState`] and the [`std::hash::Hash`]
//! trait, whose byte feed is not guaranteed to be stable across compiler
//! versions.
use std::borrow::Cow;
use std::fmt;
use std::hash::Hasher;
use std::str::FromStr;

use siphasher::sip::SipHasher13;

use crate::error::Error;

/// Key used by [`HashAlgorithm::Sip13`].
///
/// Part of the persisted format: every stored filter built with `Sip13`
/// depends on it.
const SIP_KEY: [u8; 16] = [
    136, 168, 28, 251, 141, 239, 69, 38, 166, 209, 98, 201, 2, 169, 146, 170,
];

const DJB2_INIT: u64 = 5381;
const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// A fixed, non-cryptographic hash algorithm.
///
/// All arithmetic is wrapping on 64-bit unsigned integers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum HashAlgorithm {
    /// Bernstein's hash: `acc * 33 + byte`, starting from 5381.
    #[default]
    Djb2,
    /// The sdbm hash: `byte + acc * 65 + acc * 65536 - acc`, starting from 0.
    Sdbm,
    /// 64-bit FNV-1a.
    Fnv1a,
    /// SipHash-1-3 under a fixed key.
    Sip13,
    /// The textbook sdbm step, `byte + (acc << 6) + (acc << 16) - acc`.
    ///
    /// Unlike [`HashAlgorithm::Sdbm`] its multiplier is odd, so early bytes
    /// of long inputs still reach the digest.
    #[cfg_attr(feature = "serde", serde(rename = "sdbm-classic"))]
    SdbmClassic,
}

impl HashAlgorithm {
    /// Every supported algorithm, in tag order.
    pub const ALL: [HashAlgorithm; 5] = [
        Self::Djb2,
        Self::Sdbm,
        Self::Fnv1a,
        Self::Sip13,
        Self::SdbmClassic,
    ];

    /// Hash the byte representation of `input`.
    pub fn apply<T: StableBytes + ?Sized>(self, input: &T) -> u64 {
        self.digest(&input.stable_bytes())
    }

    /// Hash a raw byte slice. The empty slice yields the initial accumulator.
    pub fn digest(self, bytes: &[u8]) -> u64 {
        match self {
            Self::Djb2 => bytes.iter().fold(DJB2_INIT, |acc, &b| {
                acc.wrapping_mul(33).wrapping_add(u64::from(b))
            }),
            Self::Sdbm => bytes.iter().fold(0, |acc: u64, &b| {
                u64::from(b)
                    .wrapping_add(acc.wrapping_mul(65))
                    .wrapping_add(acc.wrapping_mul(65536))
                    .wrapping_sub(acc)
            }),
            Self::SdbmClassic => bytes.iter().fold(0, |acc: u64, &b| {
                u64::from(b)
                    .wrapping_add(acc << 6)
                    .wrapping_add(acc << 16)
                    .wrapping_sub(acc)
            }),
            Self::Fnv1a => bytes.iter().fold(FNV_OFFSET, |acc, &b| {
                (acc ^ u64::from(b)).wrapping_mul(FNV_PRIME)
            }),
            Self::Sip13 => {
                let mut sip = SipHasher13::new_with_key(&SIP_KEY);
                sip.write(bytes);
                sip.finish()
            }
        }
    }

    /// Tag identifying this algorithm in the serialized format.
    pub fn tag(self) -> u8 {
        match self {
            Self::Djb2 => 0,
            Self::Sdbm => 1,
            Self::Fnv1a => 2,
            Self::Sip13 => 3,
            Self::SdbmClassic => 4,
        }
    }

    /// Look up an algorithm by its serialized tag.
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.tag() == tag)
    }

    /// Lower-case name, as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            Self::Djb2 => "djb2",
            Self::Sdbm => "sdbm",
            Self::Fnv1a => "fnv1a",
            Self::Sip13 => "sip13",
            Self::SdbmClassic => "sdbm-classic",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::invalid(format!("unknown hash algorithm `{s}`")))
    }
}

/// 64-bit avalanche finalizer, used to spread a digest before it is turned
/// into bit positions.
pub(crate) fn mix64(mut h: u64) -> u64 {
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
    h ^= h >> 33;
    h = h.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    h ^= h >> 33;
    h
}

/// Values that expose a stable, ordered byte representation.
///
/// Implementations must return the same bytes for equal values on every
/// platform. Integers are encoded little-endian. `usize` and `isize` are
/// deliberately not implemented since their width depends on the target.
pub trait StableBytes {
    /// The bytes fed to the hash function.
    fn stable_bytes(&self) -> Cow<'_, [u8]>;
}

impl StableBytes for [u8] {
    fn stable_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self)
    }
}

impl<const N: usize> StableBytes for [u8; N] {
    fn stable_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_slice())
    }
}

impl StableBytes for Vec<u8> {
    fn stable_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_slice())
    }
}

impl StableBytes for str {
    fn stable_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_bytes())
    }
}

impl StableBytes for String {
    fn stable_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_bytes())
    }
}

impl StableBytes for bool {
    fn stable_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Owned(vec![u8::from(*self)])
    }
}

impl StableBytes for char {
    fn stable_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Owned(u32::from(*self).to_le_bytes().to_vec())
    }
}

impl<T: StableBytes + ?Sized> StableBytes for &T {
    fn stable_bytes(&self) -> Cow<'_, [u8]> {
        (**self).stable_bytes()
    }
}

impl<T: StableBytes + ?Sized> StableBytes for Box<T> {
    fn stable_bytes(&self) -> Cow<'_, [u8]> {
        (**self).stable_bytes()
    }
}

macro_rules! impl_stable_bytes_le {
    ($($t:ty),*) => {
        $(
            impl StableBytes for $t {
                fn stable_bytes(&self) -> Cow<'_, [u8]> {
                    Cow::Owned(self.to_le_bytes().to_vec())
                }
            }
        )*
    };
}

impl_stable_bytes_le!(u8, u16, u32, u64, u128, i8, i16, i32, i64, i128);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_yields_initial_accumulator() {
        assert_eq!(HashAlgorithm::Djb2.digest(b""), 5381);
        assert_eq!(HashAlgorithm::Sdbm.digest(b""), 0);
        assert_eq!(HashAlgorithm::SdbmClassic.digest(b""), 0);
        assert_eq!(HashAlgorithm::Fnv1a.digest(b""), FNV_OFFSET);
    }

    #[test]
    fn test_djb2_known_values() {
        assert_eq!(HashAlgorithm::Djb2.digest(b"a"), 177_670);
        assert_eq!(HashAlgorithm::Djb2.digest(b"abc"), 193_485_963);
    }

    #[test]
    fn test_sdbm_known_values() {
        assert_eq!(HashAlgorithm::Sdbm.digest(b"a"), 97);
        assert_eq!(HashAlgorithm::Sdbm.digest(b"ab"), 6_363_298);
        assert_eq!(HashAlgorithm::Sdbm.digest(b"abc"), 417_432_348_899);

        let folded = b"ab".iter().fold(0u64, |acc, &b| {
            u64::from(b) + acc * 65 + acc * 65536 - acc
        });
        assert_eq!(HashAlgorithm::Sdbm.digest(b"ab"), folded);
    }

    #[test]
    fn test_sdbm_classic_known_values() {
        assert_eq!(HashAlgorithm::SdbmClassic.digest(b"a"), 97);
        assert_eq!(HashAlgorithm::SdbmClassic.digest(b"ab"), 6_363_201);
        assert_eq!("sdbm-classic".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::SdbmClassic);
    }

    #[test]
    fn test_fnv1a_known_values() {
        assert_eq!(HashAlgorithm::Fnv1a.digest(b"a"), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn test_sip13_known_values() {
        assert_eq!(HashAlgorithm::Sip13.digest(b""), 0x749a_ef69_5cc6_e55e);
        assert_eq!(HashAlgorithm::Sip13.digest(b"hello"), 0x67f6_d0d6_7de7_34c4);
    }

    #[test]
    fn test_wrapping_on_long_input() {
        let input = vec![0xffu8; 4096];

        for algorithm in HashAlgorithm::ALL {
            assert_eq!(algorithm.digest(&input), algorithm.digest(&input));
        }
    }

    #[test]
    fn test_apply_matches_digest_of_bytes() {
        for algorithm in HashAlgorithm::ALL {
            assert_eq!(algorithm.apply("hello"), algorithm.digest(b"hello"));
            assert_eq!(algorithm.apply(&String::from("hello")), algorithm.digest(b"hello"));
            assert_eq!(algorithm.apply(&b"hello".to_vec()), algorithm.digest(b"hello"));
            assert_eq!(algorithm.apply(&0x0102_u16), algorithm.digest(&[0x02, 0x01]));
            assert_eq!(algorithm.apply(&'a'), algorithm.digest(&[97, 0, 0, 0]));
            assert_eq!(algorithm.apply(&true), algorithm.digest(&[1]));
        }
    }

    #[test]
    fn test_algorithms_disagree() {
        let digests: Vec<u64> = HashAlgorithm::ALL
            .iter()
            .map(|a| a.digest(b"0xABCD1234"))
            .collect();

        for (i, a) in digests.iter().enumerate() {
            for b in &digests[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_tags_round_trip() {
        for algorithm in HashAlgorithm::ALL {
            assert_eq!(HashAlgorithm::from_tag(algorithm.tag()), Some(algorithm));
        }
        assert_eq!(HashAlgorithm::from_tag(5), None);
        assert_eq!(HashAlgorithm::from_tag(0xff), None);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("djb2".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Djb2);
        assert_eq!(" SDBM ".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sdbm);
        assert_eq!("Fnv1a".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Fnv1a);
        assert_eq!(HashAlgorithm::Sip13.to_string(), "sip13");

        let err = "murmur3".parse::<HashAlgorithm>().unwrap_err();
        assert!(matches!(err, Error::InvalidParameters(_)));
    }

    #[test]
    fn test_mix64_spreads_adjacent_inputs() {
        let a = mix64(1);
        let b = mix64(2);

        assert_ne!(a, b);
        assert!((a ^ b).count_ones() > 16);
    }
}
