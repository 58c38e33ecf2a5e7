//! Error types for source resolution.

use std::path::PathBuf;

/// Errors produced while resolving or reading template sources.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// No template file exists for the requested name.
    #[error("template not found: {name}")]
    NotFound {
        /// The logical template name that failed to resolve.
        name: String,
    },

    /// The name is empty or would resolve outside the template root.
    #[error("invalid template name: {name}")]
    InvalidName {
        /// The rejected template name.
        name: String,
    },

    /// The template file exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// The path that failed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}
