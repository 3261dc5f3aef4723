//! Structural errors surfaced by the parser.
//!
//! Semantic failure (a type mismatch, division by zero, an unknown built-in) is
//! represented *within* the value lattice as `Value::Error`, never as a `Result::Err` —
//! see `src/value.rs` and `src/eval.rs`. `ParseError` is the one channel that actually
//! raises, because malformed source text has no sensible Value to hand back.

use std::fmt;

use crate::parser::Rule;

/// A parse failure, with the source position pest reported and a human-readable
/// description of what was expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error at {}:{}: {}", self.line, self.column, self.message)
    }
}

impl std::error::Error for ParseError {}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        let (line, column) = match err.line_col {
            pest::error::LineColLocation::Pos((l, c)) => (l, c),
            pest::error::LineColLocation::Span((l, c), _) => (l, c),
        };
        ParseError {
            message: err.variant.message().to_string(),
            line,
            column,
        }
    }
}
