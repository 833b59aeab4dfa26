//! Evaluation errors

use serde::{Deserialize, Serialize};
use stx_syntax::{ParseError, Position};
use thiserror::Error;

/// What kind of failure an [`EvalError`] describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum EvalErrorKind {
    /// The instance could not be read or parsed
    Load,
    /// Two values could not be unified
    Conflict,
    /// A value is not concrete enough to export
    Incomplete,
    /// A reference or selector does not resolve
    Reference,
    /// A field depends on itself
    Cycle,
    /// A language feature outside the supported subset
    Unsupported,
    /// Values or references nest deeper than the evaluator allows
    TooDeep,
}

impl EvalErrorKind {
    /// Machine-readable error code for programmatic handling.
    pub fn code(self) -> &'static str {
        match self {
            Self::Load => "EVAL_LOAD",
            Self::Conflict => "EVAL_CONFLICT",
            Self::Incomplete => "EVAL_INCOMPLETE",
            Self::Reference => "EVAL_REFERENCE",
            Self::Cycle => "EVAL_CYCLE",
            Self::Unsupported => "EVAL_UNSUPPORTED",
            Self::TooDeep => "EVAL_TOO_DEEP",
        }
    }
}

/// An evaluation failure with the source position it refers to.
///
/// `Display` renders the message only; callers decide how to show the
/// position (see the engine's diagnostic sink).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EvalError {
    /// Failure category
    pub kind: EvalErrorKind,
    /// Human-readable message, prefixed with the field path where known
    pub message: String,
    /// Source position, when the failure can be tied to one
    pub position: Option<Position>,
}

impl EvalError {
    /// Create an error of the given kind
    pub fn new(kind: EvalErrorKind, message: impl Into<String>, position: Option<Position>) -> Self {
        Self {
            kind,
            message: message.into(),
            position,
        }
    }

    /// Load or parse failure
    pub fn load(message: impl Into<String>, position: Option<Position>) -> Self {
        Self::new(EvalErrorKind::Load, message, position)
    }

    /// Unification conflict
    pub fn conflict(message: impl Into<String>, position: Option<Position>) -> Self {
        Self::new(EvalErrorKind::Conflict, message, position)
    }

    /// Value not concrete at export
    pub fn incomplete(message: impl Into<String>, position: Option<Position>) -> Self {
        Self::new(EvalErrorKind::Incomplete, message, position)
    }

    /// Unresolved reference or selector
    pub fn reference(message: impl Into<String>, position: Option<Position>) -> Self {
        Self::new(EvalErrorKind::Reference, message, position)
    }

    /// Reference cycle
    pub fn cycle(message: impl Into<String>, position: Option<Position>) -> Self {
        Self::new(EvalErrorKind::Cycle, message, position)
    }

    /// Unsupported language feature
    pub fn unsupported(message: impl Into<String>, position: Option<Position>) -> Self {
        Self::new(EvalErrorKind::Unsupported, message, position)
    }

    /// Nesting limit exceeded
    pub fn too_deep(message: impl Into<String>, position: Option<Position>) -> Self {
        Self::new(EvalErrorKind::TooDeep, message, position)
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

impl From<ParseError> for EvalError {
    fn from(err: ParseError) -> Self {
        Self::load(err.message, Some(err.position))
    }
}

/// Result type for evaluation
pub type EvalResult<T> = Result<T, EvalError>;
