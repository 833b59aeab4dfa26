//! Logger configuration

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Environment variable holding the filter directive
pub const LEVEL_VAR: &str = "STX_LOG";
/// Fallback filter variable
pub const FALLBACK_LEVEL_VAR: &str = "RUST_LOG";
/// Environment variable selecting the output format
pub const FORMAT_VAR: &str = "STX_LOG_FORMAT";

/// Output format
///
/// Names match case-insensitively wherever they are read; unknown names
/// mean [`Format::Compact`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// One line per event
    #[default]
    Compact,
    /// Multi-line, human oriented
    Pretty,
    /// Newline-delimited JSON
    Json,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format {other:?}")),
        }
    }
}

impl<'de> Deserialize<'de> for Format {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(name.parse().unwrap_or_default())
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Compact => "compact",
            Self::Pretty => "pretty",
            Self::Json => "json",
        })
    }
}

/// Logger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `EnvFilter` directive, e.g. `warn` or `stx_engine=debug`
    pub level: String,
    /// Output format
    pub format: Format,
    /// ANSI colors
    pub colors: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: Format::Compact,
            colors: true,
        }
    }
}

impl Config {
    /// Create configuration from environment variables
    ///
    /// `STX_LOG` wins over `RUST_LOG`; `STX_LOG_FORMAT` picks the format.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with a custom variable source
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(level) = lookup(LEVEL_VAR).or_else(|| lookup(FALLBACK_LEVEL_VAR)) {
            config.level = level;
        }

        if let Some(format) = lookup(FORMAT_VAR) {
            // Unknown names fall back to compact, like an unset variable.
            config.format = format.parse().unwrap_or_default();
        }

        config
    }

    /// Verbose, pretty output for local debugging
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            format: Format::Pretty,
            colors: true,
        }
    }

    /// Set the filter directive
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Set the output format
    #[must_use]
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Enable or disable colors
    #[must_use]
    pub fn with_colors(mut self, colors: bool) -> Self {
        self.colors = colors;
        self
    }
}
