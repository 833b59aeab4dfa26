//! Exclusion of instances by display path.

use regex::Regex;

use crate::diagnostic::{Diagnostic, DiagnosticSink};

/// Compiled exclusion pattern.
///
/// A pattern that does not compile disables filtering for the whole run
/// after one warning.
#[derive(Debug, Clone, Default)]
pub struct ExcludeFilter {
    pattern: Option<Regex>,
}

impl ExcludeFilter {
    /// Filter that excludes nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Compile `pattern`. `None` or an empty string disables filtering.
    pub fn compile(pattern: Option<&str>, sink: &dyn DiagnosticSink) -> Self {
        let Some(source) = pattern.filter(|p| !p.is_empty()) else {
            return Self::none();
        };
        match Regex::new(source) {
            Ok(regex) => Self {
                pattern: Some(regex),
            },
            Err(err) => {
                tracing::warn!(pattern = source, error = %err, "exclude pattern rejected, filtering disabled");
                sink.report(Diagnostic::FilterRejected {
                    pattern: source.to_string(),
                    message: err.to_string(),
                });
                Self::none()
            }
        }
    }

    /// Whether a pattern is in effect.
    pub fn is_active(&self) -> bool {
        self.pattern.is_some()
    }

    /// Source text of the pattern in effect.
    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_ref().map(Regex::as_str)
    }

    /// Whether the pattern matches anywhere in `display_path`.
    pub fn is_excluded(&self, display_path: &str) -> bool {
        self.pattern
            .as_ref()
            .is_some_and(|regex| regex.is_match(display_path))
    }
}
