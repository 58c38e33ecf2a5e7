//! Expression evaluation against the render context.

use crate::context::RenderContext;
use crate::error::RenderError;
use tim_common::Value;
use tim_ir::{BinaryOp, Expr, PathSegment};

/// Evaluates an expression to a value.
///
/// Path lookups are lenient: a missing key or an index past the end
/// evaluates to [`Value::Null`] rather than raising, so templates can
/// reference optional fields without existence checks. Type errors in
/// ordering comparisons are hard failures.
pub(crate) fn evaluate(expr: &Expr, ctx: &RenderContext<'_>) -> Result<Value, RenderError> {
    match expr {
        Expr::Path(segments) => Ok(resolve_path(segments, ctx)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Int(i) => Ok(Value::Int(*i)),
        Expr::Float(f) => Ok(Value::Float(*f)),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Not(inner) => {
            let value = evaluate(inner, ctx)?;
            Ok(Value::Bool(!value.is_truthy()))
        }
        Expr::Binary { op, lhs, rhs } => evaluate_binary(*op, lhs, rhs, ctx, expr),
    }
}

fn resolve_path(segments: &[PathSegment], ctx: &RenderContext<'_>) -> Value {
    let mut iter = segments.iter();
    let root = match iter.next() {
        Some(PathSegment::Key(key)) => match ctx.lookup(key) {
            Some(value) => value,
            None => return Value::Null,
        },
        _ => return Value::Null,
    };

    let mut current = root;
    for segment in iter {
        let next = match segment {
            PathSegment::Key(key) => current.get(key),
            PathSegment::Index(idx) => current.index(*idx),
        };
        match next {
            Some(value) => current = value,
            None => return Value::Null,
        }
    }
    current.clone()
}

fn evaluate_binary(
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
    ctx: &RenderContext<'_>,
    whole: &Expr,
) -> Result<Value, RenderError> {
    match op {
        // Short-circuit over truthiness.
        BinaryOp::And => {
            let left = evaluate(lhs, ctx)?;
            if !left.is_truthy() {
                return Ok(Value::Bool(false));
            }
            let right = evaluate(rhs, ctx)?;
            Ok(Value::Bool(right.is_truthy()))
        }
        BinaryOp::Or => {
            let left = evaluate(lhs, ctx)?;
            if left.is_truthy() {
                return Ok(Value::Bool(true));
            }
            let right = evaluate(rhs, ctx)?;
            Ok(Value::Bool(right.is_truthy()))
        }
        BinaryOp::Eq => {
            let left = evaluate(lhs, ctx)?;
            let right = evaluate(rhs, ctx)?;
            Ok(Value::Bool(values_equal(&left, &right)))
        }
        BinaryOp::Ne => {
            let left = evaluate(lhs, ctx)?;
            let right = evaluate(rhs, ctx)?;
            Ok(Value::Bool(!values_equal(&left, &right)))
        }
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let left = evaluate(lhs, ctx)?;
            let right = evaluate(rhs, ctx)?;
            let ordering = compare_values(&left, &right).ok_or_else(|| {
                RenderError::TypeMismatch {
                    message: format!(
                        "cannot compare {} and {} in `{whole}`",
                        left.type_name(),
                        right.type_name()
                    ),
                }
            })?;
            let result = match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                BinaryOp::Ge => ordering.is_ge(),
                _ => unreachable!("handled above"),
            };
            Ok(Value::Bool(result))
        }
    }
}

/// Equality with int/float unification; defined for every value pair.
fn values_equal(left: &Value, right: &Value) -> bool {
    match (left.as_number(), right.as_number()) {
        (Some(a), Some(b)) => a == b,
        _ => left == right,
    }
}

/// Total order for numbers and strings; `None` for any other pairing.
fn compare_values(left: &Value, right: &Value) -> Option<std::cmp::Ordering> {
    if let (Some(a), Some(b)) = (left.as_number(), right.as_number()) {
        return a.partial_cmp(&b);
    }
    if let (Value::Str(a), Value::Str(b)) = (left, right) {
        return Some(a.cmp(b));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn eval_str(src: &str, local: &BTreeMap<String, Value>) -> Result<Value, RenderError> {
        let source = tim_source::TemplateSource::new(
            "t",
            "t.tim",
            format!("{{{{ {src} }}}}"),
        );
        let compiled = tim_compiler::compile(&source).unwrap();
        let expr = match &compiled.nodes[0] {
            tim_ir::Node::Interpolate(expr) => expr.clone(),
            other => panic!("expected interpolation, got {other:?}"),
        };
        let global = BTreeMap::new();
        let ctx = RenderContext::new(&global, local);
        evaluate(&expr, &ctx)
    }

    fn data(json: &str) -> BTreeMap<String, Value> {
        match serde_json::from_str::<Value>(json).unwrap() {
            Value::Object(entries) => entries,
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[test]
    fn path_lookup() {
        let local = data(r#"{"user":{"name":"ada","tags":["x","y"]}}"#);
        assert_eq!(
            eval_str("user.name", &local).unwrap(),
            Value::Str("ada".into())
        );
        assert_eq!(
            eval_str("user.tags[1]", &local).unwrap(),
            Value::Str("y".into())
        );
    }

    #[test]
    fn missing_paths_are_null() {
        let local = data(r#"{"user":{"name":"ada"}}"#);
        assert_eq!(eval_str("user.email", &local).unwrap(), Value::Null);
        assert_eq!(eval_str("missing.deep.path", &local).unwrap(), Value::Null);
        assert_eq!(eval_str("user.name[4]", &local).unwrap(), Value::Null);
    }

    #[test]
    fn logic_operators() {
        let local = data(r#"{"yes":true,"no":false}"#);
        assert_eq!(eval_str("yes and no", &local).unwrap(), Value::Bool(false));
        assert_eq!(eval_str("yes or no", &local).unwrap(), Value::Bool(true));
        assert_eq!(eval_str("not no", &local).unwrap(), Value::Bool(true));
    }

    #[test]
    fn short_circuit_skips_rhs_type_error() {
        // The rhs would be a comparison type error, but `or` short-circuits.
        let local = data(r#"{"yes":true,"obj":{}}"#);
        assert_eq!(
            eval_str("yes or obj > 1", &local).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn numeric_equality_unifies_int_and_float() {
        let local = data(r#"{"i":2,"f":2.0}"#);
        assert_eq!(eval_str("i == f", &local).unwrap(), Value::Bool(true));
        assert_eq!(eval_str("i != f", &local).unwrap(), Value::Bool(false));
    }

    #[test]
    fn comparisons() {
        let local = data(r#"{"n":5,"s":"abc"}"#);
        assert_eq!(eval_str("n > 3", &local).unwrap(), Value::Bool(true));
        assert_eq!(eval_str("n <= 5", &local).unwrap(), Value::Bool(true));
        assert_eq!(eval_str("s < \"abd\"", &local).unwrap(), Value::Bool(true));
    }

    #[test]
    fn ordering_type_mismatch() {
        let local = data(r#"{"s":"abc"}"#);
        let err = eval_str("s > 3", &local).unwrap_err();
        match err {
            RenderError::TypeMismatch { message } => {
                assert!(message.contains("string"));
                assert!(message.contains("s > 3"));
            }
            other => panic!("expected TypeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn equality_is_total() {
        let local = data(r#"{"s":"abc","n":3}"#);
        assert_eq!(eval_str("s == n", &local).unwrap(), Value::Bool(false));
        assert_eq!(eval_str("s != n", &local).unwrap(), Value::Bool(true));
    }
}
