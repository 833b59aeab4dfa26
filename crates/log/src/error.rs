//! Logging setup errors

/// Result alias for logging setup
pub type LogResult<T> = Result<T, LogError>;

/// Errors raised while building the logger
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum LogError {
    /// The level directive does not parse
    #[error("invalid log filter {0}")]
    Filter(String),

    /// A global subscriber is already installed
    #[error("logger already initialized: {0}")]
    Init(String),
}

impl LogError {
    /// Machine-readable error code for programmatic handling.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Filter(_) => "LOG_FILTER",
            Self::Init(_) => "LOG_INIT",
        }
    }
}
