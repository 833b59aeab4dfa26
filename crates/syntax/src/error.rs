//! Parse error type

use thiserror::Error;

use crate::span::Position;

/// A syntax error with the location it was detected at.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
    /// What went wrong
    pub message: String,
    /// Where it went wrong
    pub position: Position,
}

impl ParseError {
    /// Create a parse error at `position`
    pub fn new(message: impl Into<String>, position: Position) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

/// Result type for lexing and parsing
pub type ParseResult<T> = Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_message_only() {
        let err = ParseError::new("expected ':'", Position::new("a.cue", 1, 4));
        assert_eq!(err.to_string(), "expected ':'");
        assert_eq!(err.position.to_string(), "a.cue:1:4");
    }
}
