// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for cache tier operations.

use std::path::{Path, PathBuf};

/// An error from a cache tier operation.
///
/// The cache layer treats every variant as non-fatal: read failures degrade to a miss and
/// write failures are logged. The type is public so custom tiers can report failures.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Reading or writing durable storage failed.
    #[error("cache i/o failed for {}", path.display())]
    Io {
        /// The file or directory involved.
        path: PathBuf,
        /// The underlying failure.
        #[source]
        source: std::io::Error,
    },

    /// A stored entry could not be decoded.
    #[error("malformed cache entry at {}", path.display())]
    Malformed {
        /// The offending file.
        path: PathBuf,
        /// The decoding failure.
        #[source]
        source: serde_json::Error,
    },

    /// A value could not be serialized for storage.
    #[error("failed to serialize cache value")]
    Serialize(#[from] serde_json::Error),

    /// A structured key pattern failed to compile.
    #[error("invalid key pattern")]
    InvalidPattern(#[from] regex::Error),
}

impl Error {
    /// Creates an [`Error::Io`] for `path`.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Creates an [`Error::Malformed`] for `path`.
    pub fn malformed(path: impl AsRef<Path>, source: serde_json::Error) -> Self {
        Self::Malformed {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Returns `true` when the failure is a missing file or directory.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// A specialized [`Result`] type for cache tier operations.
pub type Result<T> = std::result::Result<T, Error>;
