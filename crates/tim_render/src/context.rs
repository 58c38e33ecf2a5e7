//! The per-call data context expressions are evaluated against.

use std::collections::BTreeMap;
use tim_common::Value;

/// The merged data context of one render call.
///
/// Lookup order is innermost loop binding first, then per-call local
/// data, then the global snapshot — so locals override globals on name
/// collision, and a loop binding shadows both within its body. A context
/// is created fresh per render call and never shared across calls.
pub struct RenderContext<'a> {
    global: &'a BTreeMap<String, Value>,
    local: &'a BTreeMap<String, Value>,
    bindings: Vec<(String, Value)>,
}

impl<'a> RenderContext<'a> {
    /// Creates a context over a global snapshot and per-call locals.
    pub fn new(global: &'a BTreeMap<String, Value>, local: &'a BTreeMap<String, Value>) -> Self {
        Self {
            global,
            local,
            bindings: Vec::new(),
        }
    }

    /// Resolves a root identifier.
    pub fn lookup(&self, key: &str) -> Option<&Value> {
        for (name, value) in self.bindings.iter().rev() {
            if name == key {
                return Some(value);
            }
        }
        self.local.get(key).or_else(|| self.global.get(key))
    }

    /// Pushes a loop binding, shadowing any outer binding of the same name.
    pub fn push_binding(&mut self, name: &str, value: Value) {
        self.bindings.push((name.to_string(), value));
    }

    /// Pops the innermost loop binding.
    pub fn pop_binding(&mut self) {
        self.bindings.pop();
    }
}
