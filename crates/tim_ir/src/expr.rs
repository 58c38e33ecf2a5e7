//! Expressions usable inside interpolation, condition, and loop directives.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of a dotted-path lookup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PathSegment {
    /// Object key access (`user.name`).
    Key(String),
    /// Array element access with a literal index (`items[0]`).
    Index(usize),
}

/// Binary operators of the restricted expression grammar.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    /// Logical conjunction over truthiness.
    And,
    /// Logical disjunction over truthiness.
    Or,
    /// Equality, defined for all value types.
    Eq,
    /// Inequality.
    Ne,
    /// Less-than ordering (numbers and strings only).
    Lt,
    /// Less-or-equal ordering.
    Le,
    /// Greater-than ordering.
    Gt,
    /// Greater-or-equal ordering.
    Ge,
}

impl BinaryOp {
    /// The operator's source spelling.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }
}

/// A compiled template expression.
///
/// The grammar is deliberately restricted: dotted paths with literal
/// indexes, scalar literals, `and`/`or`/`not`, and comparisons. There is
/// no host-language evaluation, which bounds the attack surface when
/// render data is caller-controlled.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// A dotted-path lookup into the render context.
    Path(Vec<PathSegment>),
    /// A string literal.
    Str(String),
    /// An integer literal.
    Int(i64),
    /// A float literal.
    Float(f64),
    /// A boolean literal.
    Bool(bool),
    /// Logical negation over truthiness.
    Not(Box<Expr>),
    /// A binary operation.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
}

impl fmt::Display for Expr {
    /// Reconstructs a source-like spelling, used in render error messages.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Path(segments) => {
                for (i, segment) in segments.iter().enumerate() {
                    match segment {
                        PathSegment::Key(key) => {
                            if i > 0 {
                                write!(f, ".")?;
                            }
                            write!(f, "{key}")?;
                        }
                        PathSegment::Index(idx) => write!(f, "[{idx}]")?,
                    }
                }
                Ok(())
            }
            Expr::Str(s) => write!(f, "{s:?}"),
            Expr::Int(i) => write!(f, "{i}"),
            Expr::Float(x) => write!(f, "{x}"),
            Expr::Bool(b) => write!(f, "{b}"),
            Expr::Not(inner) => write!(f, "not {inner}"),
            Expr::Binary { op, lhs, rhs } => {
                write!(f, "{lhs} {} {rhs}", op.symbol())
            }
        }
    }
}
