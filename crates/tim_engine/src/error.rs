//! The engine's caller-facing error type.

use std::path::PathBuf;

use tim_cache::CacheError;
use tim_compiler::CompileError;
use tim_render::{LoadError, RenderError};
use tim_source::SourceError;

/// Errors surfaced by engine operations.
///
/// Every failure on the render path aborts that single call; none of
/// them corrupt the cache (a failed compile leaves the previous valid
/// entry untouched) and none crash the process. Watch failures are not
/// represented here at all: they are logged warnings by design.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A template or layout name did not resolve to a source file.
    #[error("template not found: {name}")]
    NotFound {
        /// The unresolved name.
        name: String,
    },

    /// A template failed to compile.
    #[error("syntax error in `{name}` at {line}:{col}: {message}")]
    Syntax {
        /// The template that failed.
        name: String,
        /// 1-indexed line of the offending construct.
        line: u32,
        /// 1-indexed column of the offending construct.
        col: u32,
        /// What went wrong.
        message: String,
    },

    /// An expression evaluated to a value of the wrong type, e.g. a
    /// loop over a non-sequence.
    #[error("type mismatch: {message}")]
    TypeMismatch {
        /// Description of the mismatch.
        message: String,
    },

    /// A template transitively includes itself.
    #[error("include cycle: {}", chain.join(" -> "))]
    IncludeCycle {
        /// The chain of template names ending at the repeat.
        chain: Vec<String>,
    },

    /// A source or storage read/write failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// The path that failed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Engine initialization failed (missing or unusable roots).
    #[error("engine initialization failed: {message}")]
    Init {
        /// Description of the failure.
        message: String,
    },
}

impl EngineError {
    pub(crate) fn from_source(err: SourceError) -> Self {
        match err {
            SourceError::NotFound { name } => EngineError::NotFound { name },
            // An invalid (escaping) name is unresolvable by definition.
            SourceError::InvalidName { name } => EngineError::NotFound { name },
            SourceError::Io { path, source } => EngineError::Io { path, source },
        }
    }

    pub(crate) fn from_compile(name: &str, err: CompileError) -> Self {
        EngineError::Syntax {
            name: name.to_string(),
            line: err.line,
            col: err.col,
            message: err.message,
        }
    }

    pub(crate) fn from_cache(storage_root: &std::path::Path, err: CacheError) -> Self {
        match err {
            CacheError::Io { path, source } => EngineError::Io { path, source },
            CacheError::Serialization { reason } => EngineError::Io {
                path: storage_root.to_path_buf(),
                source: std::io::Error::other(reason),
            },
        }
    }

    pub(crate) fn from_render(err: RenderError) -> Self {
        match err {
            RenderError::TypeMismatch { message } => EngineError::TypeMismatch { message },
            RenderError::IncludeCycle { chain } => EngineError::IncludeCycle { chain },
            RenderError::Load(load) => match load {
                LoadError::NotFound { name } => EngineError::NotFound { name },
                LoadError::Syntax {
                    name,
                    line,
                    col,
                    message,
                } => EngineError::Syntax {
                    name,
                    line,
                    col,
                    message,
                },
                LoadError::Io { path, message } => EngineError::Io {
                    path,
                    source: std::io::Error::other(message),
                },
            },
        }
    }

    pub(crate) fn to_load_error(&self, name: &str) -> LoadError {
        match self {
            EngineError::NotFound { name } => LoadError::NotFound { name: name.clone() },
            EngineError::Syntax {
                name,
                line,
                col,
                message,
            } => LoadError::Syntax {
                name: name.clone(),
                line: *line,
                col: *col,
                message: message.clone(),
            },
            EngineError::Io { path, source } => LoadError::Io {
                path: path.clone(),
                message: source.to_string(),
            },
            other => LoadError::Io {
                path: PathBuf::from(name),
                message: other.to_string(),
            },
        }
    }
}
