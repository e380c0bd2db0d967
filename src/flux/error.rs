use std::fmt;

use serde::Serialize;

/// Byte range into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// 1-based line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// A syntax error in Flux source, with its location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyntaxError {
    pub message: String,
    pub span: Span,
    pub kind: ErrorKind,
    pub start: Position,
    pub end: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Lexer,
    Parser,
}

impl SyntaxError {
    pub fn lexer(message: impl Into<String>, span: Span) -> Self {
        Self::new(message, span, ErrorKind::Lexer)
    }

    pub fn parser(message: impl Into<String>, span: Span) -> Self {
        Self::new(message, span, ErrorKind::Parser)
    }

    fn new(message: impl Into<String>, span: Span, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            span,
            kind,
            start: Position::default(),
            end: Position::default(),
        }
    }

    /// Resolve the byte span into line/column positions.
    pub(crate) fn locate(&mut self, source: &str) {
        self.start = offset_to_position(source, self.span.start);
        self.end = offset_to_position(source, self.span.end);
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error @{}:{}-{}:{}: {}",
            self.start.line, self.start.column, self.end.line, self.end.column, self.message,
        )
    }
}

impl std::error::Error for SyntaxError {}

fn offset_to_position(source: &str, offset: usize) -> Position {
    let mut line = 1;
    let mut column = 1;
    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    Position { line, column }
}
