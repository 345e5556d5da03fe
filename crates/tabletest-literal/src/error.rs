use pest::error::LineColLocation;
use thiserror::Error;

/// Errors raised while reading fixture text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LiteralError {
    // ── Grammar errors ────────────────────────────────────

    #[error("parse error at {line}:{column}: {message}")]
    Grammar { line: usize, column: usize, message: String },

    #[error("row at line {line} has {found} cells, header has {expected}")]
    RowWidth { line: usize, expected: usize, found: usize },

    // ── Document layout ───────────────────────────────────

    #[error("test documentation has no blank line separating GIVEN from WHEN")]
    MissingWhen,

    #[error("WHEN section contains no statements")]
    EmptyWhen,
}

impl LiteralError {
    /// Line the error points at, when it has one.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Grammar { line, .. } | Self::RowWidth { line, .. } => Some(*line),
            Self::MissingWhen | Self::EmptyWhen => None,
        }
    }
}

impl From<pest::error::Error<crate::parser::Rule>> for LiteralError {
    fn from(e: pest::error::Error<crate::parser::Rule>) -> Self {
        let (line, column) = match e.line_col {
            LineColLocation::Pos(pos)         => pos,
            LineColLocation::Span(start, _)   => start,
        };
        Self::Grammar { line, column, message: e.variant.message().into_owned() }
    }
}
