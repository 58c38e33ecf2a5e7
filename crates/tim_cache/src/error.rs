//! Error types for cache operations.

use std::path::PathBuf;

/// Errors that can occur while writing cache state.
///
/// Reads are fail-safe (they produce cache misses), so this enum covers
/// the write path: artifact serialization and storage I/O.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while writing under the storage root.
    #[error("cache I/O error at {}: {source}", path.display())]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The compiled template could not be serialized.
    #[error("artifact serialization error: {reason}")]
    Serialization {
        /// Description of the failure.
        reason: String,
    },
}
