//! Engine error types.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use stx_eval::EvalError;
use stx_syntax::{ParseError, Position};

use crate::state::InstanceState;

/// A problem found while discovering or reading an instance.
///
/// Load errors never abort discovery. They are attached to the instance and
/// reported when the instance is evaluated.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum LoadError {
    /// A file or directory could not be read.
    #[error("{}: {source}", .path.display())]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying error, shared so instances stay cloneable.
        #[source]
        source: Arc<io::Error>,
    },

    /// A file of the instance does not parse.
    #[error("{0}")]
    Parse(#[from] ParseError),

    /// A directory argument holds no file of the requested package.
    #[error("no CUE files for package {package:?} in {}", .dir.display())]
    NoFiles {
        /// Directory that was searched.
        dir: PathBuf,
        /// Requested package.
        package: String,
    },

    /// An argument names nothing on disk.
    #[error("cannot find package {arg:?}")]
    NotFound {
        /// Argument as given.
        arg: String,
    },

    /// A file argument declares another package.
    #[error("{} declares package {}, expected {expected:?}", .path.display(), describe_package(.found.as_deref()))]
    PackageMismatch {
        /// File that was read.
        path: PathBuf,
        /// Requested package.
        expected: String,
        /// Declared package, if any.
        found: Option<String>,
    },

    /// A recursive pattern matched no directory with the requested package.
    #[error("pattern {pattern:?} matched no packages named {package:?}")]
    NoMatch {
        /// Pattern as given.
        pattern: String,
        /// Requested package.
        package: String,
    },
}

fn describe_package(package: Option<&str>) -> String {
    package.map_or_else(|| "none".to_string(), |p| format!("{p:?}"))
}

impl LoadError {
    /// Wrap an I/O failure on `path`.
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source: Arc::new(source),
        }
    }

    /// Source position the error refers to, if any.
    pub fn position(&self) -> Option<&Position> {
        match self {
            Self::Parse(err) => Some(&err.position),
            _ => None,
        }
    }

    /// Machine-readable error code for programmatic handling.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io { .. } => "LOAD_IO",
            Self::Parse(_) => "LOAD_PARSE",
            Self::NoFiles { .. } => "LOAD_NO_FILES",
            Self::NotFound { .. } => "LOAD_NOT_FOUND",
            Self::PackageMismatch { .. } => "LOAD_PACKAGE_MISMATCH",
            Self::NoMatch { .. } => "LOAD_NO_MATCH",
        }
    }
}

impl From<&LoadError> for EvalError {
    fn from(err: &LoadError) -> Self {
        Self::load(err.to_string(), err.position().cloned())
    }
}

/// Errors from the scheduling layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// An instance was moved between states in an order the lifecycle forbids.
    #[error("invalid transition for {display_path}: {from} -> {to}")]
    InvalidTransition {
        /// Instance concerned.
        display_path: String,
        /// Current state.
        from: InstanceState,
        /// Requested state.
        to: InstanceState,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_converts_with_position() {
        let err = LoadError::from(ParseError::new(
            "expected ':', found '}'",
            Position::new("b/b.cue", 2, 7),
        ));
        let eval = EvalError::from(&err);
        assert_eq!(eval.message, "expected ':', found '}'");
        assert_eq!(
            eval.position.map(|p| p.to_string()).as_deref(),
            Some("b/b.cue:2:7")
        );
    }

    #[test]
    fn io_error_display_names_path() {
        let err = LoadError::io(
            "a/x.cue",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "a/x.cue: denied");
        assert!(err.position().is_none());
        assert_eq!(err.code(), "LOAD_IO");
    }

    #[test]
    fn package_mismatch_display() {
        let err = LoadError::PackageMismatch {
            path: "x.cue".into(),
            expected: "cfn".into(),
            found: Some("other".into()),
        };
        assert_eq!(err.to_string(), "x.cue declares package \"other\", expected \"cfn\"");

        let err = LoadError::PackageMismatch {
            path: "y.cue".into(),
            expected: "cfn".into(),
            found: None,
        };
        assert_eq!(err.to_string(), "y.cue declares package none, expected \"cfn\"");
    }

    #[test]
    fn invalid_transition_display() {
        let err = EngineError::InvalidTransition {
            display_path: "./a".into(),
            from: InstanceState::Succeeded,
            to: InstanceState::Evaluating,
        };
        assert_eq!(err.to_string(), "invalid transition for ./a: succeeded -> evaluating");
    }
}
