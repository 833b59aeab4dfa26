//! Logger builder implementation

use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, Format};
use crate::error::{LogError, LogResult};

/// Logger builder
#[derive(Debug)]
pub struct LoggerBuilder {
    config: Config,
}

/// Guard that keeps the root span entered
///
/// Events emitted on the thread that built the logger are recorded inside
/// the `stx` span until the guard is dropped.
#[derive(Debug)]
pub struct LoggerGuard {
    _root_span: Option<tracing::span::EnteredSpan>,
}

impl LoggerBuilder {
    /// Create builder from config
    #[must_use]
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Parse the filter directive without installing anything
    pub fn filter(&self) -> LogResult<EnvFilter> {
        EnvFilter::try_new(&self.config.level)
            .map_err(|e| LogError::Filter(format!("{:?}: {e}", self.config.level)))
    }

    /// Build and install the global subscriber
    ///
    /// Output goes to stderr so stdout stays reserved for rendered documents.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Filter string cannot be parsed
    /// - A global subscriber is already installed
    pub fn build(self) -> LogResult<LoggerGuard> {
        let filter = self.filter()?;
        let colors = self.config.colors;
        let registry = Registry::default().with(filter);

        let installed = match self.config.format {
            Format::Compact => registry
                .with(
                    fmt::layer()
                        .compact()
                        .with_ansi(colors)
                        .with_target(false)
                        .with_writer(std::io::stderr),
                )
                .try_init(),
            Format::Pretty => registry
                .with(fmt::layer().pretty().with_ansi(colors).with_writer(std::io::stderr))
                .try_init(),
            Format::Json => registry
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init(),
        };
        installed.map_err(|e| LogError::Init(e.to_string()))?;

        let root = tracing::info_span!("stx", version = env!("CARGO_PKG_VERSION"));
        tracing::debug!(level = %self.config.level, format = %self.config.format, "logger initialized");
        Ok(LoggerGuard {
            _root_span: Some(root.entered()),
        })
    }
}
