// Copyright (c) 2022 Alexis Sellier
//
// Licensed under the MIT license.

//! Binary serialization of filters.
//!
//! A serialized filter is a fixed 26-byte header followed by the packed bit
//! array. All integers are little-endian.
//!
//! | Offset | Size | Field                                  |
//! |--------|------|----------------------------------------|
//! | 0      | 4    | magic, `DBLM`                          |
//! | 4      | 1    | format version, currently `1`          |
//! | 5      | 1    | hash algorithm tag                     |
//! | 6      | 4    | hash rounds                            |
//! | 10     | 8    | bit count                              |
//! | 18     | 8    | payload length in bytes                |
//! | 26     | n    | bit array, least significant bit first |
//!
//! Decoding either yields a complete filter or fails with
//! [`Error::CorruptData`]; the caller decides whether to start over with an
//! empty filter.
use std::io::{self, Read, Write};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use tracing::debug;

use crate::bitvec::{byte_len, BitVec};
use crate::bloom::{BloomFilter, BloomFilterConfig};
use crate::error::{Error, Result};
use crate::hash::HashAlgorithm;

/// Leading bytes of every serialized filter.
pub const MAGIC: [u8; 4] = *b"DBLM";
/// Version of the layout written by [`BloomFilter::to_bytes`].
pub const FORMAT_VERSION: u8 = 1;
/// Size of the header preceding the bit array.
pub const HEADER_LEN: usize = 26;

impl BloomFilter {
    /// Serialize the filter, including its configuration.
    pub fn to_bytes(&self) -> Vec<u8> {
        let payload = self.as_bytes();
        let mut buf = vec![0; HEADER_LEN + payload.len()];

        buf[0..4].copy_from_slice(&MAGIC);
        buf[4] = FORMAT_VERSION;
        buf[5] = self.algorithm().tag();
        // The round count is bounded by `MAX_HASH_ROUNDS` on construction.
        LittleEndian::write_u32(&mut buf[6..10], self.hashes() as u32);
        LittleEndian::write_u64(&mut buf[10..18], self.bits() as u64);
        LittleEndian::write_u64(&mut buf[18..26], payload.len() as u64);
        buf[HEADER_LEN..].copy_from_slice(payload);

        buf
    }

    /// Deserialize a filter produced by [`BloomFilter::to_bytes`].
    ///
    /// The buffer must contain exactly one filter.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = bytes;
        let filter = Self::read_from(&mut reader)?;

        if !reader.is_empty() {
            let err = Error::corrupt(format!("{} trailing bytes after bit array", reader.len()));
            debug!(reason = %err, "rejected serialized bloom filter");

            return Err(err);
        }
        Ok(filter)
    }

    /// Write the serialized filter to `writer`.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&self.to_bytes())?;
        writer.flush()?;

        Ok(())
    }

    /// Read one serialized filter from `reader`, leaving any following bytes unread.
    pub fn read_from<R: Read>(reader: R) -> Result<Self> {
        match decode(reader) {
            Ok(filter) => {
                debug!(
                    bits = filter.bits(),
                    rounds = filter.hashes(),
                    algorithm = %filter.algorithm(),
                    bits_set = filter.bits_set(),
                    "restored bloom filter"
                );
                Ok(filter)
            }
            Err(err) => {
                debug!(reason = %err, "rejected serialized bloom filter");
                Err(err)
            }
        }
    }
}

fn decode<R: Read>(mut reader: R) -> Result<BloomFilter> {
    let mut magic = [0; 4];
    reader.read_exact(&mut magic).map_err(truncated)?;
    if magic != MAGIC {
        return Err(Error::corrupt(format!("bad magic {magic:02x?}")));
    }

    let version = reader.read_u8().map_err(truncated)?;
    if version != FORMAT_VERSION {
        return Err(Error::corrupt(format!("unsupported format version {version}")));
    }

    let tag = reader.read_u8().map_err(truncated)?;
    let algorithm = HashAlgorithm::from_tag(tag)
        .ok_or_else(|| Error::corrupt(format!("unknown hash algorithm tag {tag}")))?;

    let rounds = reader.read_u32::<LittleEndian>().map_err(truncated)?;
    let nbits = reader.read_u64::<LittleEndian>().map_err(truncated)?;
    let declared = reader.read_u64::<LittleEndian>().map_err(truncated)?;

    let nbits = usize::try_from(nbits)
        .map_err(|_| Error::corrupt(format!("bit count {nbits} is not addressable")))?;
    let config = BloomFilterConfig::new(nbits, rounds as usize, algorithm)
        .map_err(|err| Error::corrupt(err.to_string()))?;

    let expected = byte_len(nbits) as u64;
    if declared != expected {
        return Err(Error::corrupt(format!(
            "declared payload of {declared} bytes, {nbits} bits need {expected}"
        )));
    }

    // Grow the buffer as data arrives rather than trusting the header.
    let mut payload = Vec::new();
    reader.by_ref().take(declared).read_to_end(&mut payload)?;
    if payload.len() as u64 != declared {
        return Err(Error::corrupt(format!(
            "payload truncated: {} of {declared} bytes",
            payload.len()
        )));
    }

    let bits = BitVec::from_raw(payload, nbits)?;

    Ok(BloomFilter::from_parts(config, bits))
}

fn truncated(err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        Error::corrupt("header truncated")
    } else {
        Error::Io(err)
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use std::fmt;

    use serde::de::{self, SeqAccess, Visitor};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::bloom::BloomFilter;

    impl Serialize for BloomFilter {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_bytes(&self.to_bytes())
        }
    }

    impl<'de> Deserialize<'de> for BloomFilter {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_bytes(FilterVisitor)
        }
    }

    struct FilterVisitor;

    impl<'de> Visitor<'de> for FilterVisitor {
        type Value = BloomFilter;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a serialized bloom filter")
        }

        fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
            BloomFilter::from_bytes(v).map_err(E::custom)
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut bytes = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(b) = seq.next_element::<u8>()? {
                bytes.push(b);
            }
            self.visit_bytes(&bytes)
        }
    }
}
