//! Compiler error type carrying source positions.

use tim_source::TemplateSource;

/// A syntax error produced while compiling a template.
///
/// Positions are 1-indexed line/column pairs resolved against the source's
/// precomputed line index.
#[derive(Debug, thiserror::Error)]
#[error("syntax error at {line}:{col}: {message}")]
pub struct CompileError {
    /// What went wrong.
    pub message: String,
    /// 1-indexed line of the offending construct.
    pub line: u32,
    /// 1-indexed column of the offending construct.
    pub col: u32,
}

impl CompileError {
    /// Creates an error at the given byte offset of the source.
    pub fn at(source: &TemplateSource, offset: usize, message: impl Into<String>) -> Self {
        let (line, col) = source.line_col(offset as u32);
        Self {
            message: message.into(),
            line,
            col,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_resolution() {
        let source = TemplateSource::new("t", "t.tim", "line one\n  {% endif %}".to_string());
        let err = CompileError::at(&source, 11, "unmatched {% endif %}");
        assert_eq!(err.line, 2);
        assert_eq!(err.col, 3);
        assert_eq!(
            err.to_string(),
            "syntax error at 2:3: unmatched {% endif %}"
        );
    }
}
