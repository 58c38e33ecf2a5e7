//! Tokenizer and Pratt parser for the restricted expression grammar.
//!
//! Binding powers (lowest to highest):
//!
//! 1. `or`
//! 2. `and`
//! 3. `== != < <= > >=`
//! 4. `not` (prefix)
//! 5. primaries: literals, dotted paths with literal indexes, parens

use tim_ir::{BinaryOp, Expr, PathSegment};

/// A parse failure with a byte offset relative to the expression body.
#[derive(Debug)]
pub(crate) struct ExprError {
    pub rel: usize,
    pub message: String,
}

impl ExprError {
    fn new(rel: usize, message: impl Into<String>) -> Self {
        Self {
            rel,
            message: message.into(),
        }
    }
}

/// A token of the expression grammar, with its offset in the body.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    True,
    False,
    And,
    Or,
    Not,
    In,
    Dot,
    LBracket,
    RBracket,
    LParen,
    RParen,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Tokenizes an expression body. Offsets are relative to the body start.
pub(crate) fn tokenize(body: &str) -> Result<Vec<(Token, usize)>, ExprError> {
    let bytes = body.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let b = bytes[pos];
        if b.is_ascii_whitespace() {
            pos += 1;
            continue;
        }
        let start = pos;
        match b {
            b'.' => {
                tokens.push((Token::Dot, start));
                pos += 1;
            }
            b'[' => {
                tokens.push((Token::LBracket, start));
                pos += 1;
            }
            b']' => {
                tokens.push((Token::RBracket, start));
                pos += 1;
            }
            b'(' => {
                tokens.push((Token::LParen, start));
                pos += 1;
            }
            b')' => {
                tokens.push((Token::RParen, start));
                pos += 1;
            }
            b'=' => {
                if bytes.get(pos + 1) == Some(&b'=') {
                    tokens.push((Token::EqEq, start));
                    pos += 2;
                } else {
                    return Err(ExprError::new(start, "expected `==`"));
                }
            }
            b'!' => {
                if bytes.get(pos + 1) == Some(&b'=') {
                    tokens.push((Token::NotEq, start));
                    pos += 2;
                } else {
                    return Err(ExprError::new(start, "expected `!=`"));
                }
            }
            b'<' => {
                if bytes.get(pos + 1) == Some(&b'=') {
                    tokens.push((Token::Le, start));
                    pos += 2;
                } else {
                    tokens.push((Token::Lt, start));
                    pos += 1;
                }
            }
            b'>' => {
                if bytes.get(pos + 1) == Some(&b'=') {
                    tokens.push((Token::Ge, start));
                    pos += 2;
                } else {
                    tokens.push((Token::Gt, start));
                    pos += 1;
                }
            }
            b'"' => {
                let (value, next) = lex_string(body, pos)?;
                tokens.push((Token::Str(value), start));
                pos = next;
            }
            b'-' | b'0'..=b'9' => {
                let (token, next) = lex_number(body, pos)?;
                tokens.push((token, start));
                pos = next;
            }
            _ if is_ident_start(b) => {
                let mut end = pos + 1;
                while end < bytes.len() && is_ident_char(bytes[end]) {
                    end += 1;
                }
                let word = &body[pos..end];
                let token = match word {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "in" => Token::In,
                    "true" => Token::True,
                    "false" => Token::False,
                    _ => Token::Ident(word.to_string()),
                };
                tokens.push((token, start));
                pos = end;
            }
            _ => {
                return Err(ExprError::new(
                    start,
                    format!("unexpected character `{}`", &body[start..start + 1]),
                ));
            }
        }
    }

    Ok(tokens)
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Lexes a double-quoted string with `\"` and `\\` escapes.
fn lex_string(body: &str, start: usize) -> Result<(String, usize), ExprError> {
    let bytes = body.as_bytes();
    let mut value = String::new();
    let mut pos = start + 1;
    while pos < bytes.len() {
        match bytes[pos] {
            b'"' => return Ok((value, pos + 1)),
            b'\\' => {
                match bytes.get(pos + 1) {
                    Some(b'"') => value.push('"'),
                    Some(b'\\') => value.push('\\'),
                    Some(b'n') => value.push('\n'),
                    Some(b't') => value.push('\t'),
                    _ => return Err(ExprError::new(pos, "invalid escape sequence")),
                }
                pos += 2;
            }
            _ => {
                // Advance by whole UTF-8 characters, not bytes.
                let ch = body[pos..].chars().next().unwrap_or('\u{FFFD}');
                value.push(ch);
                pos += ch.len_utf8();
            }
        }
    }
    Err(ExprError::new(start, "unterminated string literal"))
}

/// Lexes an integer or float literal, with an optional leading minus.
fn lex_number(body: &str, start: usize) -> Result<(Token, usize), ExprError> {
    let bytes = body.as_bytes();
    let mut pos = start;
    if bytes[pos] == b'-' {
        pos += 1;
        if pos >= bytes.len() || !bytes[pos].is_ascii_digit() {
            return Err(ExprError::new(start, "expected digits after `-`"));
        }
    }
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
    }
    let mut is_float = false;
    if pos + 1 < bytes.len() && bytes[pos] == b'.' && bytes[pos + 1].is_ascii_digit() {
        is_float = true;
        pos += 1;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
    }
    let text = &body[start..pos];
    let token = if is_float {
        Token::Float(
            text.parse()
                .map_err(|_| ExprError::new(start, "invalid float literal"))?,
        )
    } else {
        Token::Int(
            text.parse()
                .map_err(|_| ExprError::new(start, "integer literal out of range"))?,
        )
    };
    Ok((token, pos))
}

/// Parses a full expression body; trailing tokens are an error.
pub(crate) fn parse(body: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(body)?;
    let mut parser = ExprParser { tokens, pos: 0 };
    let expr = parser.parse_bp(0)?;
    if let Some((_, offset)) = parser.peek() {
        return Err(ExprError::new(offset, "unexpected trailing tokens"));
    }
    Ok(expr)
}

/// Parses an expression from an already-tokenized stream, used by the
/// directive parser for the iterable part of `for` tags.
pub(crate) fn parse_tokens(tokens: Vec<(Token, usize)>) -> Result<Expr, ExprError> {
    let mut parser = ExprParser { tokens, pos: 0 };
    let expr = parser.parse_bp(0)?;
    if let Some((_, offset)) = parser.peek() {
        return Err(ExprError::new(offset, "unexpected trailing tokens"));
    }
    Ok(expr)
}

struct ExprParser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

/// Binding power for binary operators: (left, right). Left-associative
/// operators have left < right.
fn infix_binding_power(token: &Token) -> Option<(u8, u8, BinaryOp)> {
    match token {
        Token::Or => Some((1, 2, BinaryOp::Or)),
        Token::And => Some((3, 4, BinaryOp::And)),
        Token::EqEq => Some((5, 6, BinaryOp::Eq)),
        Token::NotEq => Some((5, 6, BinaryOp::Ne)),
        Token::Lt => Some((5, 6, BinaryOp::Lt)),
        Token::Le => Some((5, 6, BinaryOp::Le)),
        Token::Gt => Some((5, 6, BinaryOp::Gt)),
        Token::Ge => Some((5, 6, BinaryOp::Ge)),
        _ => None,
    }
}

const NOT_BP: u8 = 7;

impl ExprParser {
    fn peek(&self) -> Option<(&Token, usize)> {
        self.tokens.get(self.pos).map(|(t, o)| (t, *o))
    }

    fn advance(&mut self) -> Option<(Token, usize)> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn parse_bp(&mut self, min_bp: u8) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_prefix()?;

        while let Some((token, _)) = self.peek() {
            let Some((l_bp, r_bp, op)) = infix_binding_power(token) else {
                break;
            };
            if l_bp < min_bp {
                break;
            }
            self.advance();
            let rhs = self.parse_bp(r_bp)?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<Expr, ExprError> {
        let Some((token, offset)) = self.advance() else {
            return Err(ExprError::new(0, "expected expression"));
        };
        match token {
            Token::Not => {
                let operand = self.parse_bp(NOT_BP)?;
                Ok(Expr::Not(Box::new(operand)))
            }
            Token::Str(s) => Ok(Expr::Str(s)),
            Token::Int(i) => Ok(Expr::Int(i)),
            Token::Float(f) => Ok(Expr::Float(f)),
            Token::True => Ok(Expr::Bool(true)),
            Token::False => Ok(Expr::Bool(false)),
            Token::LParen => {
                let inner = self.parse_bp(0)?;
                match self.advance() {
                    Some((Token::RParen, _)) => Ok(inner),
                    Some((_, off)) => Err(ExprError::new(off, "expected `)`")),
                    None => Err(ExprError::new(offset, "unclosed `(`")),
                }
            }
            Token::Ident(first) => self.parse_path(first),
            other => Err(ExprError::new(
                offset,
                format!("unexpected token {other:?}"),
            )),
        }
    }

    /// Parses the tail of a dotted path: `.key` and `[index]` segments.
    fn parse_path(&mut self, first: String) -> Result<Expr, ExprError> {
        let mut segments = vec![PathSegment::Key(first)];
        loop {
            match self.peek() {
                Some((Token::Dot, dot_off)) => {
                    self.advance();
                    match self.advance() {
                        Some((Token::Ident(key), _)) => segments.push(PathSegment::Key(key)),
                        Some((_, off)) => {
                            return Err(ExprError::new(off, "expected identifier after `.`"))
                        }
                        None => {
                            return Err(ExprError::new(dot_off, "expected identifier after `.`"))
                        }
                    }
                }
                Some((Token::LBracket, open_off)) => {
                    self.advance();
                    let idx = match self.advance() {
                        Some((Token::Int(i), off)) => {
                            usize::try_from(i).map_err(|_| {
                                ExprError::new(off, "array index must be non-negative")
                            })?
                        }
                        Some((_, off)) => {
                            return Err(ExprError::new(off, "expected integer index"))
                        }
                        None => return Err(ExprError::new(open_off, "unclosed `[`")),
                    };
                    match self.advance() {
                        Some((Token::RBracket, _)) => segments.push(PathSegment::Index(idx)),
                        Some((_, off)) => return Err(ExprError::new(off, "expected `]`")),
                        None => return Err(ExprError::new(open_off, "unclosed `[`")),
                    }
                }
                _ => break,
            }
        }
        Ok(Expr::Path(segments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(k: &str) -> PathSegment {
        PathSegment::Key(k.to_string())
    }

    #[test]
    fn simple_path() {
        let e = parse("user.name").unwrap();
        assert_eq!(e, Expr::Path(vec![key("user"), key("name")]));
    }

    #[test]
    fn indexed_path() {
        let e = parse("items[2].id").unwrap();
        assert_eq!(
            e,
            Expr::Path(vec![key("items"), PathSegment::Index(2), key("id")])
        );
    }

    #[test]
    fn literals() {
        assert_eq!(parse("42").unwrap(), Expr::Int(42));
        assert_eq!(parse("-7").unwrap(), Expr::Int(-7));
        assert_eq!(parse("2.5").unwrap(), Expr::Float(2.5));
        assert_eq!(parse("true").unwrap(), Expr::Bool(true));
        assert_eq!(parse(r#""hi""#).unwrap(), Expr::Str("hi".into()));
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            parse(r#""a\"b\\c""#).unwrap(),
            Expr::Str(r#"a"b\c"#.into())
        );
    }

    #[test]
    fn precedence_or_and_cmp() {
        // a or b and c == d  parses as  a or (b and (c == d))
        let e = parse("a or b and c == d").unwrap();
        match e {
            Expr::Binary {
                op: BinaryOp::Or,
                rhs,
                ..
            } => match *rhs {
                Expr::Binary {
                    op: BinaryOp::And,
                    rhs,
                    ..
                } => {
                    assert!(matches!(*rhs, Expr::Binary { op: BinaryOp::Eq, .. }));
                }
                other => panic!("expected and, got {other:?}"),
            },
            other => panic!("expected or, got {other:?}"),
        }
    }

    #[test]
    fn not_binds_tighter_than_and() {
        // not a and b  parses as  (not a) and b
        let e = parse("not a and b").unwrap();
        match e {
            Expr::Binary {
                op: BinaryOp::And,
                lhs,
                ..
            } => assert!(matches!(*lhs, Expr::Not(_))),
            other => panic!("expected and, got {other:?}"),
        }
    }

    #[test]
    fn parens_override() {
        let e = parse("not (a and b)").unwrap();
        assert!(matches!(e, Expr::Not(_)));
    }

    #[test]
    fn comparison_operators() {
        for (src, op) in [
            ("a == b", BinaryOp::Eq),
            ("a != b", BinaryOp::Ne),
            ("a < b", BinaryOp::Lt),
            ("a <= b", BinaryOp::Le),
            ("a > b", BinaryOp::Gt),
            ("a >= b", BinaryOp::Ge),
        ] {
            match parse(src).unwrap() {
                Expr::Binary { op: parsed, .. } => assert_eq!(parsed, op, "{src}"),
                other => panic!("{src}: got {other:?}"),
            }
        }
    }

    #[test]
    fn trailing_tokens_rejected() {
        assert!(parse("a b").is_err());
    }

    #[test]
    fn malformed_rejected() {
        assert!(parse("").is_err());
        assert!(parse("a.").is_err());
        assert!(parse("a[x]").is_err());
        assert!(parse("a[-1]").is_err());
        assert!(parse("(a").is_err());
        assert!(parse(r#""unterminated"#).is_err());
        assert!(parse("a = b").is_err());
    }

    #[test]
    fn error_offsets_are_relative() {
        let err = parse("a ?").unwrap_err();
        assert_eq!(err.rel, 2);
    }
}
