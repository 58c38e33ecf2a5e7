//! The data model template expressions evaluate against.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A render-time data value.
///
/// Mirrors the JSON data model. Objects use a `BTreeMap` so that iteration
/// order is deterministic, which keeps rendered output byte-identical for
/// identical inputs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// The absent value. Missing lookups evaluate to this.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating-point number.
    Float(f64),
    /// A string.
    Str(String),
    /// An ordered sequence.
    Array(Vec<Value>),
    /// A string-keyed mapping with deterministic iteration order.
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Returns `true` if the value counts as true in a condition.
    ///
    /// Null and empty collections are falsy; zero numbers and empty
    /// strings are falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Object(entries) => !entries.is_empty(),
        }
    }

    /// Returns a short name for the value's type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Renders the value as template output text.
    ///
    /// Null renders as the empty string so that optional data can be
    /// interpolated without existence checks. Arrays and objects render
    /// as compact JSON.
    pub fn to_output(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Str(s) => s.clone(),
            Value::Array(_) | Value::Object(_) => {
                serde_json::to_string(self).unwrap_or_default()
            }
        }
    }

    /// Looks up a key if this value is an object.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(entries) => entries.get(key),
            _ => None,
        }
    }

    /// Looks up an element if this value is an array.
    pub fn index(&self, idx: usize) -> Option<&Value> {
        match self {
            Value::Array(items) => items.get(idx),
            _ => None,
        }
    }

    /// Returns the numeric content as `f64` for mixed int/float comparison.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Value::Object(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(Value::Int(-3).is_truthy());
        assert!(!Value::Float(0.0).is_truthy());
        assert!(!Value::Str(String::new()).is_truthy());
        assert!(Value::Str("x".into()).is_truthy());
        assert!(!Value::Array(vec![]).is_truthy());
        assert!(Value::Array(vec![Value::Null]).is_truthy());
        assert!(!Value::Object(BTreeMap::new()).is_truthy());
    }

    #[test]
    fn null_renders_empty() {
        assert_eq!(Value::Null.to_output(), "");
    }

    #[test]
    fn scalars_render_canonically() {
        assert_eq!(Value::Bool(true).to_output(), "true");
        assert_eq!(Value::Int(42).to_output(), "42");
        assert_eq!(Value::Str("plain".into()).to_output(), "plain");
    }

    #[test]
    fn composites_render_as_json() {
        let v = Value::Array(vec![Value::Int(1), Value::Str("a".into())]);
        assert_eq!(v.to_output(), r#"[1,"a"]"#);
    }

    #[test]
    fn object_iteration_is_sorted() {
        let mut entries = BTreeMap::new();
        entries.insert("b".to_string(), Value::Int(2));
        entries.insert("a".to_string(), Value::Int(1));
        let obj = Value::Object(entries);
        let keys: Vec<&str> = match &obj {
            Value::Object(e) => e.keys().map(|k| k.as_str()).collect(),
            _ => unreachable!(),
        };
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn deserialize_from_json() {
        let v: Value = serde_json::from_str(r#"{"name":"tim","tags":[1,2]}"#).unwrap();
        assert_eq!(v.get("name"), Some(&Value::Str("tim".into())));
        assert_eq!(
            v.get("tags").and_then(|t| t.index(1)),
            Some(&Value::Int(2))
        );
    }

    #[test]
    fn get_and_index_on_wrong_types() {
        assert_eq!(Value::Int(1).get("x"), None);
        assert_eq!(Value::Str("s".into()).index(0), None);
    }

    #[test]
    fn mixed_number_comparison_form() {
        assert_eq!(Value::Int(2).as_number(), Some(2.0));
        assert_eq!(Value::Float(2.5).as_number(), Some(2.5));
        assert_eq!(Value::Str("2".into()).as_number(), None);
    }
}
