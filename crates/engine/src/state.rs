//! Instance lifecycle.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Where an instance is in the pipeline.
///
/// ```text
/// Loaded ──► Excluded
///    │
///    ▼
/// Evaluating ──► Succeeded | Failed | Aborted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
    /// Discovered, waiting for the filter.
    Loaded,
    /// Matched the exclusion pattern; never evaluated.
    Excluded,
    /// Evaluation task scheduled or running.
    Evaluating,
    /// Evaluated and handed to the handler.
    Succeeded,
    /// Evaluation returned an error; one diagnostic was reported.
    Failed,
    /// The task panicked.
    Aborted,
}

impl InstanceState {
    /// Returns `true` if the instance has reached a final state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Excluded | Self::Succeeded | Self::Failed | Self::Aborted
        )
    }

    /// Returns `true` if the instance ended in a failure state.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Aborted)
    }

    /// Move to `to`, rejecting transitions the lifecycle does not allow.
    pub fn transition(&mut self, display_path: &str, to: Self) -> Result<(), EngineError> {
        if can_transition(*self, to) {
            *self = to;
            Ok(())
        } else {
            Err(EngineError::InvalidTransition {
                display_path: display_path.to_string(),
                from: *self,
                to,
            })
        }
    }
}

/// Returns `true` if moving from `from` to `to` is valid.
#[must_use]
pub fn can_transition(from: InstanceState, to: InstanceState) -> bool {
    matches!(
        (from, to),
        (InstanceState::Loaded, InstanceState::Excluded)
            | (InstanceState::Loaded, InstanceState::Evaluating)
            | (InstanceState::Evaluating, InstanceState::Succeeded)
            | (InstanceState::Evaluating, InstanceState::Failed)
            | (InstanceState::Evaluating, InstanceState::Aborted)
    )
}

impl std::fmt::Display for InstanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loaded => write!(f, "loaded"),
            Self::Excluded => write!(f, "excluded"),
            Self::Evaluating => write!(f, "evaluating"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}
