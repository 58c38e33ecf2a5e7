//! The compiled template intermediate representation.
//!
//! A compiled template is a flat node sequence the renderer executes
//! directly. IR values are immutable after compilation and shared between
//! concurrent renders behind `Arc`; everything is serde-serializable so
//! that level-2 caching can persist compiled templates to disk.

#![warn(missing_docs)]

mod expr;
mod node;
mod template;

pub use expr::{BinaryOp, Expr, PathSegment};
pub use node::Node;
pub use template::CompiledTemplate;
