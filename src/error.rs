// Copyright (c) 2022 Alexis Sellier
//
// Licensed under the MIT license.

//! Error types.
use std::io;

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned when building, combining or decoding filters.
#[derive(Debug, Error)]
pub enum Error {
    /// A size, round count or false positive rate was out of range.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// A serialized filter could not be decoded.
    #[error("corrupt data: {0}")]
    CorruptData(String),

    /// Two filters with different configurations were combined.
    #[error("incompatible filters: {left} vs {right}")]
    IncompatibleFilters {
        /// Configuration of the receiving filter.
        left: String,
        /// Configuration of the other filter.
        right: String,
    },

    /// The underlying reader or writer failed.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidParameters(reason.into())
    }

    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        Self::CorruptData(reason.into())
    }

    /// Whether this error means the stored bytes are unusable.
    ///
    /// Callers typically discard the stored state and start from an empty
    /// filter when this returns `true`.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::CorruptData(_))
    }
}
