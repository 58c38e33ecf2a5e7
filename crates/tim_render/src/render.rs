//! Node execution: compiled IR to output text.

use std::sync::Arc;

use crate::context::RenderContext;
use crate::error::{LoadError, RenderError};
use crate::eval::evaluate;
use tim_common::Value;
use tim_ir::{CompiledTemplate, Node};

/// Source of compiled templates for render-time includes.
///
/// The engine implements this over its resolver + cache so that an
/// included template goes through the same ensure-compiled path as a
/// top-level render.
pub trait TemplateProvider {
    /// Returns the compiled template for a logical name.
    fn load(&self, name: &str) -> Result<Arc<CompiledTemplate>, LoadError>;
}

/// Renders a compiled template against a context.
///
/// `slot_content` carries the already-rendered content output when the
/// template being rendered is a layout; its `{% content %}` node emits
/// that text. Content templates are rendered with `None`, so a stray
/// slot in one renders as empty text.
pub fn render_template(
    name: &str,
    template: &CompiledTemplate,
    provider: &dyn TemplateProvider,
    ctx: &mut RenderContext<'_>,
    slot_content: Option<&str>,
) -> Result<String, RenderError> {
    let mut renderer = Renderer {
        provider,
        slot_content,
        include_stack: vec![name.to_string()],
        out: String::new(),
    };
    renderer.exec_nodes(&template.nodes, ctx)?;
    Ok(renderer.out)
}

struct Renderer<'a> {
    provider: &'a dyn TemplateProvider,
    slot_content: Option<&'a str>,
    /// Names currently being rendered, innermost last. Seeded with the
    /// top-level template so direct self-inclusion is caught too.
    include_stack: Vec<String>,
    out: String,
}

impl Renderer<'_> {
    fn exec_nodes(
        &mut self,
        nodes: &[Node],
        ctx: &mut RenderContext<'_>,
    ) -> Result<(), RenderError> {
        for node in nodes {
            self.exec_node(node, ctx)?;
        }
        Ok(())
    }

    fn exec_node(&mut self, node: &Node, ctx: &mut RenderContext<'_>) -> Result<(), RenderError> {
        match node {
            Node::Literal(text) => self.out.push_str(text),
            Node::Interpolate(expr) => {
                let value = evaluate(expr, ctx)?;
                self.out.push_str(&value.to_output());
            }
            Node::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let branch = if evaluate(cond, ctx)?.is_truthy() {
                    then_branch
                } else {
                    else_branch
                };
                self.exec_nodes(branch, ctx)?;
            }
            Node::For {
                binding,
                iterable,
                body,
            } => {
                let value = evaluate(iterable, ctx)?;
                let items = match value {
                    Value::Array(items) => items,
                    other => {
                        return Err(RenderError::TypeMismatch {
                            message: format!(
                                "cannot iterate {} in `for {binding} in {iterable}`",
                                other.type_name()
                            ),
                        })
                    }
                };
                // Source order of the sequence is preserved exactly.
                for item in items {
                    ctx.push_binding(binding, item);
                    let result = self.exec_nodes(body, ctx);
                    ctx.pop_binding();
                    result?;
                }
            }
            Node::Include { name } => {
                if self.include_stack.iter().any(|entry| entry == name) {
                    let mut chain = self.include_stack.clone();
                    chain.push(name.clone());
                    return Err(RenderError::IncludeCycle { chain });
                }
                let included = self.provider.load(name)?;
                self.include_stack.push(name.clone());
                // Same context: included fragments see the caller's
                // locals and loop bindings.
                let result = self.exec_nodes(&included.nodes, ctx);
                self.include_stack.pop();
                result?;
            }
            Node::Slot => {
                if let Some(content) = self.slot_content {
                    self.out.push_str(content);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, HashMap};
    use tim_source::TemplateSource;

    struct MapProvider {
        templates: HashMap<String, Arc<CompiledTemplate>>,
    }

    impl MapProvider {
        fn new(sources: &[(&str, &str)]) -> Self {
            let templates = sources
                .iter()
                .map(|(name, text)| {
                    let source =
                        TemplateSource::new(*name, format!("{name}.tim"), text.to_string());
                    let compiled = tim_compiler::compile(&source).unwrap();
                    (name.to_string(), Arc::new(compiled))
                })
                .collect();
            Self { templates }
        }

        fn get(&self, name: &str) -> Arc<CompiledTemplate> {
            Arc::clone(&self.templates[name])
        }
    }

    impl TemplateProvider for MapProvider {
        fn load(&self, name: &str) -> Result<Arc<CompiledTemplate>, LoadError> {
            self.templates
                .get(name)
                .cloned()
                .ok_or_else(|| LoadError::NotFound {
                    name: name.to_string(),
                })
        }
    }

    fn data(json: &str) -> BTreeMap<String, Value> {
        match serde_json::from_str::<Value>(json).unwrap() {
            Value::Object(entries) => entries,
            other => panic!("expected object, got {other:?}"),
        }
    }

    fn render_one(
        provider: &MapProvider,
        name: &str,
        local: &BTreeMap<String, Value>,
        slot: Option<&str>,
    ) -> Result<String, RenderError> {
        let global = BTreeMap::new();
        let mut ctx = RenderContext::new(&global, local);
        render_template(name, &provider.get(name), provider, &mut ctx, slot)
    }

    #[test]
    fn literal_and_interpolation() {
        let provider = MapProvider::new(&[("t", "Hello {{ user.name }}!")]);
        let out = render_one(&provider, "t", &data(r#"{"user":{"name":"Tim"}}"#), None).unwrap();
        assert_eq!(out, "Hello Tim!");
    }

    #[test]
    fn missing_data_renders_empty() {
        let provider = MapProvider::new(&[("t", "[{{ user.name }}]")]);
        let out = render_one(&provider, "t", &data("{}"), None).unwrap();
        assert_eq!(out, "[]");
    }

    #[test]
    fn conditional_branches() {
        let provider =
            MapProvider::new(&[("t", "{% if on %}yes{% else %}no{% endif %}")]);
        assert_eq!(
            render_one(&provider, "t", &data(r#"{"on":true}"#), None).unwrap(),
            "yes"
        );
        assert_eq!(
            render_one(&provider, "t", &data(r#"{"on":false}"#), None).unwrap(),
            "no"
        );
        // Missing condition is falsy, not an error.
        assert_eq!(render_one(&provider, "t", &data("{}"), None).unwrap(), "no");
    }

    #[test]
    fn loop_preserves_order() {
        let provider =
            MapProvider::new(&[("t", "{% for n in nums %}{{ n }},{% endfor %}")]);
        let out = render_one(&provider, "t", &data(r#"{"nums":[3,1,2]}"#), None).unwrap();
        assert_eq!(out, "3,1,2,");
    }

    #[test]
    fn loop_binding_shadows_and_restores() {
        let provider = MapProvider::new(&[(
            "t",
            "{{ x }}|{% for x in xs %}{{ x }}{% endfor %}|{{ x }}",
        )]);
        let out = render_one(&provider, "t", &data(r#"{"x":"outer","xs":["a","b"]}"#), None)
            .unwrap();
        assert_eq!(out, "outer|ab|outer");
    }

    #[test]
    fn loop_over_non_sequence_fails() {
        let provider = MapProvider::new(&[("t", "{% for x in name %}{{ x }}{% endfor %}")]);
        let err = render_one(&provider, "t", &data(r#"{"name":"tim"}"#), None).unwrap_err();
        match err {
            RenderError::TypeMismatch { message } => {
                assert!(message.contains("string"));
                assert!(message.contains("for x in name"));
            }
            other => panic!("expected TypeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn loop_over_missing_value_fails() {
        let provider = MapProvider::new(&[("t", "{% for x in xs %}{{ x }}{% endfor %}")]);
        let err = render_one(&provider, "t", &data("{}"), None).unwrap_err();
        assert!(matches!(err, RenderError::TypeMismatch { .. }));
    }

    #[test]
    fn include_shares_caller_scope() {
        let provider = MapProvider::new(&[
            ("page", "{% for u in users %}{% include \"row\" %}{% endfor %}"),
            ("row", "<{{ u.name }}>"),
        ]);
        let out = render_one(
            &provider,
            "page",
            &data(r#"{"users":[{"name":"a"},{"name":"b"}]}"#),
            None,
        )
        .unwrap();
        assert_eq!(out, "<a><b>");
    }

    #[test]
    fn missing_include_is_not_found() {
        let provider = MapProvider::new(&[("t", "{% include \"ghost\" %}")]);
        let err = render_one(&provider, "t", &data("{}"), None).unwrap_err();
        assert!(matches!(
            err,
            RenderError::Load(LoadError::NotFound { .. })
        ));
    }

    #[test]
    fn include_cycle_detected() {
        let provider = MapProvider::new(&[
            ("a", "A{% include \"b\" %}"),
            ("b", "B{% include \"a\" %}"),
        ]);
        let err = render_one(&provider, "a", &data("{}"), None).unwrap_err();
        match err {
            RenderError::IncludeCycle { chain } => {
                assert_eq!(chain, vec!["a", "b", "a"]);
            }
            other => panic!("expected IncludeCycle, got {other:?}"),
        }
    }

    #[test]
    fn direct_self_include_detected() {
        let provider = MapProvider::new(&[("a", "{% include \"a\" %}")]);
        let err = render_one(&provider, "a", &data("{}"), None).unwrap_err();
        assert!(matches!(err, RenderError::IncludeCycle { .. }));
    }

    #[test]
    fn slot_substitution() {
        let provider = MapProvider::new(&[("layout", "<L>{% content %}</L>")]);
        let out = render_one(&provider, "layout", &data("{}"), Some("Hello")).unwrap();
        assert_eq!(out, "<L>Hello</L>");
    }

    #[test]
    fn slot_without_content_renders_empty() {
        let provider = MapProvider::new(&[("t", "a{% content %}b")]);
        let out = render_one(&provider, "t", &data("{}"), None).unwrap();
        assert_eq!(out, "ab");
    }

    #[test]
    fn repeated_renders_are_byte_identical() {
        let provider = MapProvider::new(&[(
            "t",
            "{% for k in ks %}{{ k }};{% endfor %}{{ obj }}",
        )]);
        let local = data(r#"{"ks":[2,1],"obj":{"b":1,"a":2}}"#);
        let first = render_one(&provider, "t", &local, None).unwrap();
        for _ in 0..5 {
            assert_eq!(render_one(&provider, "t", &local, None).unwrap(), first);
        }
    }
}
