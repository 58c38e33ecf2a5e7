//! Error types for the render path.

use std::path::PathBuf;

/// Failure to obtain a compiled template through [`TemplateProvider`].
///
/// Mirrors the engine-level failure kinds so that an error inside an
/// included template surfaces with its original classification.
///
/// [`TemplateProvider`]: crate::TemplateProvider
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// No template exists for the requested name.
    #[error("template not found: {name}")]
    NotFound {
        /// The unresolved template name.
        name: String,
    },

    /// The template failed to compile.
    #[error("syntax error in `{name}` at {line}:{col}: {message}")]
    Syntax {
        /// The template that failed.
        name: String,
        /// 1-indexed line.
        line: u32,
        /// 1-indexed column.
        col: u32,
        /// What went wrong.
        message: String,
    },

    /// The template source or a cache artifact could not be accessed.
    #[error("I/O error at {}: {message}", path.display())]
    Io {
        /// The path that failed.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },
}

/// Errors that abort a single render call.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// An expression evaluated to a value of the wrong type, e.g. a
    /// `for` directive over a non-sequence.
    #[error("type mismatch: {message}")]
    TypeMismatch {
        /// Description of the mismatch, including the offending expression.
        message: String,
    },

    /// A template transitively includes itself.
    #[error("include cycle: {}", chain.join(" -> "))]
    IncludeCycle {
        /// The chain of template names ending at the repeat.
        chain: Vec<String>,
    },

    /// An included template could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),
}
