//! Renderable nodes of a compiled template.

use crate::expr::Expr;
use serde::{Deserialize, Serialize};

/// One node of a compiled template's sequence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Raw text emitted verbatim.
    Literal(String),
    /// `{{ expr }}` — evaluates the expression and emits its text form.
    Interpolate(Expr),
    /// `{% if expr %} … {% else %} … {% endif %}`.
    If {
        /// The condition, tested for truthiness.
        cond: Expr,
        /// Nodes rendered when the condition is truthy.
        then_branch: Vec<Node>,
        /// Nodes rendered otherwise; empty when no `{% else %}` was given.
        else_branch: Vec<Node>,
    },
    /// `{% for binding in expr %} … {% endfor %}`.
    For {
        /// The loop variable name, shadowing outer bindings in the body.
        binding: String,
        /// The iterated expression; must evaluate to an array at render time.
        iterable: Expr,
        /// Nodes rendered once per element.
        body: Vec<Node>,
    },
    /// `{% include "name" %}` — resolved lazily at render time so that a
    /// change to the included template does not require recompiling every
    /// template that includes it.
    Include {
        /// Logical name of the included template.
        name: String,
    },
    /// `{% content %}` — the layout's content-injection point.
    Slot,
}
