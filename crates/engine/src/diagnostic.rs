//! Diagnostic reporting.
//!
//! Failures that belong to the user (an instance that does not evaluate, an
//! exclusion pattern that does not compile) are reported through a
//! [`DiagnosticSink`] passed in by the caller. Sinks are shared between
//! evaluation tasks and must serialize their own writes.

use std::fmt;
use std::io::{self, Write};

use colored::Colorize;
use parking_lot::Mutex;
use stx_eval::EvalError;

/// Something worth telling the user about.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Diagnostic {
    /// An instance failed to evaluate.
    EvaluationFailed {
        /// Instance that failed.
        display_path: String,
        /// Why it failed.
        error: EvalError,
    },
    /// The exclusion pattern did not compile; nothing is filtered.
    FilterRejected {
        /// Pattern as given.
        pattern: String,
        /// Compiler message.
        message: String,
    },
}

impl Diagnostic {
    /// Returns `true` for diagnostics that do not fail an instance.
    #[must_use]
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::FilterRejected { .. })
    }

    /// Display path of the instance concerned, if any.
    pub fn display_path(&self) -> Option<&str> {
        match self {
            Self::EvaluationFailed { display_path, .. } => Some(display_path),
            Self::FilterRejected { .. } => None,
        }
    }
}

/// `<message> <position>` for failures, `-` standing in for a missing position.
impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EvaluationFailed { error, .. } => match &error.position {
                Some(position) => write!(f, "{} {position}", error.message),
                None => write!(f, "{} -", error.message),
            },
            Self::FilterRejected { pattern, message } => {
                write!(f, "invalid exclude pattern {pattern:?}: {message}")
            }
        }
    }
}

/// Receiver of diagnostics, shared by all evaluation tasks.
pub trait DiagnosticSink: Send + Sync {
    /// Record one diagnostic.
    fn report(&self, diagnostic: Diagnostic);
}

/// Writes one line per diagnostic, optionally in red.
pub struct WriterSink<W> {
    writer: Mutex<W>,
    color: bool,
}

impl<W: Write + Send> WriterSink<W> {
    /// Create a sink writing plain lines to `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            color: false,
        }
    }

    /// Enable or disable red output.
    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl WriterSink<io::Stdout> {
    /// Sink on standard output, where the rendered documents go as well.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> DiagnosticSink for WriterSink<W> {
    fn report(&self, diagnostic: Diagnostic) {
        let line = diagnostic.to_string();
        let mut writer = self.writer.lock();
        let written = if self.color {
            writeln!(writer, "{}", line.red())
        } else {
            writeln!(writer, "{line}")
        };
        if let Err(err) = written.and_then(|()| writer.flush()) {
            tracing::warn!(error = %err, "failed to write diagnostic");
        }
    }
}

impl<W> fmt::Debug for WriterSink<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterSink")
            .field("color", &self.color)
            .finish_non_exhaustive()
    }
}

/// Keeps diagnostics in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().clone()
    }

    /// Displayed form of everything reported so far.
    pub fn lines(&self) -> Vec<String> {
        self.diagnostics.lock().iter().map(ToString::to_string).collect()
    }

    /// Number of diagnostics reported.
    pub fn len(&self) -> usize {
        self.diagnostics.lock().len()
    }

    /// Whether nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.diagnostics.lock().is_empty()
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, diagnostic: Diagnostic) {
        self.diagnostics.lock().push(diagnostic);
    }
}
