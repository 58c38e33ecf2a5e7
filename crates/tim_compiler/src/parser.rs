//! Directive parser: assembles scanned segments into the IR node tree.

use crate::error::CompileError;
use crate::expr::{self, Token};
use crate::scanner::{scan, Segment};
use tim_ir::{CompiledTemplate, Expr, Node};
use tim_source::TemplateSource;

/// Compiles a template source into IR.
///
/// The scan is a single left-to-right pass; block directives push frames
/// onto an explicit stack, and a close directive that does not match the
/// top of the stack is a syntax error carrying the directive's position.
pub fn compile(source: &TemplateSource) -> Result<CompiledTemplate, CompileError> {
    let segments =
        scan(&source.text).map_err(|e| CompileError::at(source, e.offset, e.message))?;

    let mut stack = vec![Frame {
        kind: FrameKind::Root,
        nodes: Vec::new(),
    }];

    for segment in segments {
        match segment {
            Segment::Literal(text) => {
                top(&mut stack).nodes.push(Node::Literal(text.to_string()));
            }
            Segment::Expr { body, offset } => {
                let parsed = expr::parse(body)
                    .map_err(|e| CompileError::at(source, offset + 2 + e.rel, e.message))?;
                top(&mut stack).nodes.push(Node::Interpolate(parsed));
            }
            Segment::Tag { body, offset } => {
                handle_tag(source, &mut stack, body, offset)?;
            }
        }
    }

    if stack.len() > 1 {
        let unclosed = stack.last().expect("stack is never empty");
        let (offset, what) = match &unclosed.kind {
            FrameKind::If { open_offset, .. } => (*open_offset, "{% if %}"),
            FrameKind::For { open_offset, .. } => (*open_offset, "{% for %}"),
            FrameKind::Root => unreachable!("root frame is always at the bottom"),
        };
        return Err(CompileError::at(
            source,
            offset,
            format!("unclosed {what} at end of template"),
        ));
    }

    let root = stack.pop().expect("root frame remains");
    Ok(CompiledTemplate::new(source.fingerprint, root.nodes))
}

struct Frame {
    kind: FrameKind,
    nodes: Vec<Node>,
}

enum FrameKind {
    Root,
    If {
        cond: Expr,
        /// Filled when `{% else %}` is seen; `nodes` then collects the
        /// else branch.
        then_branch: Option<Vec<Node>>,
        open_offset: usize,
    },
    For {
        binding: String,
        iterable: Expr,
        open_offset: usize,
    },
}

fn top<'a>(stack: &'a mut Vec<Frame>) -> &'a mut Frame {
    stack.last_mut().expect("stack is never empty")
}

fn handle_tag(
    source: &TemplateSource,
    stack: &mut Vec<Frame>,
    body: &str,
    offset: usize,
) -> Result<(), CompileError> {
    let tokens = expr::tokenize(body)
        .map_err(|e| CompileError::at(source, offset + 2 + e.rel, e.message))?;

    let Some((first, _)) = tokens.first() else {
        return Err(CompileError::at(source, offset, "empty directive"));
    };
    let word = match first {
        Token::Ident(word) => word.as_str(),
        _ => {
            return Err(CompileError::at(
                source,
                offset,
                "directive must start with a keyword",
            ))
        }
    };

    match word {
        "if" => {
            let cond = expr::parse_tokens(tokens[1..].to_vec())
                .map_err(|e| CompileError::at(source, offset + 2 + e.rel, e.message))?;
            stack.push(Frame {
                kind: FrameKind::If {
                    cond,
                    then_branch: None,
                    open_offset: offset,
                },
                nodes: Vec::new(),
            });
        }
        "else" => {
            expect_bare(source, &tokens, offset, "else")?;
            let frame = top(stack);
            match &mut frame.kind {
                FrameKind::If { then_branch, .. } if then_branch.is_none() => {
                    *then_branch = Some(std::mem::take(&mut frame.nodes));
                }
                FrameKind::If { .. } => {
                    return Err(CompileError::at(
                        source,
                        offset,
                        "duplicate {% else %} in {% if %} block",
                    ))
                }
                _ => {
                    return Err(CompileError::at(
                        source,
                        offset,
                        "{% else %} outside of an {% if %} block",
                    ))
                }
            }
        }
        "endif" => {
            expect_bare(source, &tokens, offset, "endif")?;
            let frame = stack.pop().expect("stack is never empty");
            match frame.kind {
                FrameKind::If {
                    cond, then_branch, ..
                } => {
                    let (then_nodes, else_nodes) = match then_branch {
                        Some(then_nodes) => (then_nodes, frame.nodes),
                        None => (frame.nodes, Vec::new()),
                    };
                    top(stack).nodes.push(Node::If {
                        cond,
                        then_branch: then_nodes,
                        else_branch: else_nodes,
                    });
                }
                other => {
                    stack.push(Frame {
                        kind: other,
                        nodes: frame.nodes,
                    });
                    return Err(CompileError::at(
                        source,
                        offset,
                        "{% endif %} does not close an open {% if %}",
                    ));
                }
            }
        }
        "for" => {
            let mut rest = tokens[1..].iter();
            let binding = match rest.next() {
                Some((Token::Ident(binding), _)) => binding.clone(),
                _ => {
                    return Err(CompileError::at(
                        source,
                        offset,
                        "expected loop variable after {% for %}",
                    ))
                }
            };
            match rest.next() {
                Some((Token::In, _)) => {}
                _ => {
                    return Err(CompileError::at(
                        source,
                        offset,
                        "expected `in` in {% for %} directive",
                    ))
                }
            }
            let iterable = expr::parse_tokens(tokens[3..].to_vec())
                .map_err(|e| CompileError::at(source, offset + 2 + e.rel, e.message))?;
            stack.push(Frame {
                kind: FrameKind::For {
                    binding,
                    iterable,
                    open_offset: offset,
                },
                nodes: Vec::new(),
            });
        }
        "endfor" => {
            expect_bare(source, &tokens, offset, "endfor")?;
            let frame = stack.pop().expect("stack is never empty");
            match frame.kind {
                FrameKind::For {
                    binding, iterable, ..
                } => {
                    top(stack).nodes.push(Node::For {
                        binding,
                        iterable,
                        body: frame.nodes,
                    });
                }
                other => {
                    stack.push(Frame {
                        kind: other,
                        nodes: frame.nodes,
                    });
                    return Err(CompileError::at(
                        source,
                        offset,
                        "{% endfor %} does not close an open {% for %}",
                    ));
                }
            }
        }
        "include" => {
            let name = match &tokens[1..] {
                [(Token::Str(name), _)] => name.clone(),
                _ => {
                    return Err(CompileError::at(
                        source,
                        offset,
                        "expected a quoted template name in {% include %}",
                    ))
                }
            };
            top(stack).nodes.push(Node::Include { name });
        }
        "content" => {
            expect_bare(source, &tokens, offset, "content")?;
            top(stack).nodes.push(Node::Slot);
        }
        other => {
            return Err(CompileError::at(
                source,
                offset,
                format!("unknown directive `{other}`"),
            ));
        }
    }

    Ok(())
}

/// Directives like `else`/`endif`/`content` take no arguments.
fn expect_bare(
    source: &TemplateSource,
    tokens: &[(Token, usize)],
    offset: usize,
    word: &str,
) -> Result<(), CompileError> {
    if tokens.len() > 1 {
        return Err(CompileError::at(
            source,
            offset,
            format!("{{% {word} %}} takes no arguments"),
        ));
    }
    Ok(())
}
