//! Error types for `zvdb`.

use thiserror::Error;

/// Result type alias for `zvdb` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in `zvdb` operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Vector length disagrees with the index's configured dimension, or
    /// between two operands of a distance kernel.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        actual: usize,
    },

    /// A graph operation (`delete`, `update`) targeted an id not present in
    /// the HNSW index.
    #[error("node {0} not found")]
    NodeNotFound(u64),

    /// A vector store operation (`get`, `update`, `delete`) targeted an id
    /// not present in the store.
    #[error("id {0} not found")]
    IdNotFound(u64),

    /// An id already exists; only reachable while deserializing a corrupted
    /// blob that reused an id.
    #[error("duplicate id {0}")]
    DuplicateId(u64),

    /// Cosine distance was requested over an integer scalar type.
    #[error("metric {metric} is not supported for scalar type {scalar}")]
    UnsupportedMetricForType {
        /// The offending metric.
        metric: &'static str,
        /// The offending scalar kind.
        scalar: &'static str,
    },

    /// Configuration failed validation (e.g. `dimension == 0`, `m == 0`).
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A persisted blob did not parse as a valid `zvdb` structure.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// The file header's magic bytes did not read `"ZVDB"`.
    #[error("invalid magic number")]
    InvalidMagicNumber,

    /// The file header declared a format version this crate cannot read.
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u32),

    /// Cross-invariant validation failed while loading (keyset mismatch,
    /// dangling neighbor id, inconsistent `max_level`, ...).
    #[error("corrupted index data: {0}")]
    Corrupted(String),

    /// `load` was given a zero-length file.
    #[error("file is empty")]
    EmptyFile,

    /// `load` ran out of bytes before the format was fully read.
    #[error("file truncated: {0}")]
    Truncated(String),

    /// Allocation failed while growing an internal buffer.
    #[error("out of memory: {0}")]
    OutOfMemory(String),

    /// Propagated failure from the underlying storage medium.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if this error reflects a caller mistake the caller can
    /// retry after fixing (bad input), as opposed to persisted-state
    /// corruption or resource exhaustion.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::Corrupted(_) | Self::OutOfMemory(_) | Self::InvalidMagicNumber
        )
    }
}
