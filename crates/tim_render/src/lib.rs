//! Template rendering: executing compiled IR against a data context.
//!
//! The renderer borrows compiled templates read-only and owns a private
//! output buffer per call, so concurrent renders share no mutable state.
//! Includes are resolved lazily through the [`TemplateProvider`] seam,
//! with a render-time include stack guarding against cycles.

#![warn(missing_docs)]

mod context;
mod error;
mod eval;
mod render;

pub use context::RenderContext;
pub use error::{LoadError, RenderError};
pub use render::{render_template, TemplateProvider};
