//! Layered configuration: defaults → `stx.toml` → `STX_*` env → flags

use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format as _, Serialized, Toml};
use serde::{Deserialize, Serialize};
use stx_engine::DEFAULT_PACKAGE;

use crate::cli::GlobalArgs;

/// Configuration file looked up in the working directory
pub const CONFIG_FILE: &str = "stx.toml";

/// Prefix of the environment variables read into [`StxConfig`]
pub const ENV_PREFIX: &str = "STX_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StxConfig {
    pub package: String,
    pub exclude: Option<String>,
    pub concurrency: Option<usize>,
    pub log_level: Option<String>,
    pub log_format: Option<stx_log::Format>,
    pub color: bool,
}

impl Default for StxConfig {
    fn default() -> Self {
        Self {
            package: DEFAULT_PACKAGE.to_string(),
            exclude: None,
            concurrency: None,
            log_level: None,
            log_format: None,
            color: true,
        }
    }
}

/// Values given on the command line; unset flags leave lower layers alone.
#[derive(Debug, Default, Serialize)]
struct FlagOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    package: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exclude: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    concurrency: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<bool>,
}

impl From<&GlobalArgs> for FlagOverrides {
    fn from(args: &GlobalArgs) -> Self {
        Self {
            package: args.package.clone(),
            exclude: args.exclude.clone(),
            concurrency: args.concurrency,
            log_level: args.log_level.clone(),
            color: args.no_color.then_some(false),
        }
    }
}

impl StxConfig {
    /// Defaults, then `dir/stx.toml`, then `STX_*` variables
    pub fn figment(dir: &Path) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(dir.join(CONFIG_FILE)))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// Resolve the configuration for the working directory and `args`
    pub fn load(args: &GlobalArgs) -> Result<Self, figment::Error> {
        Self::load_from(Path::new("."), args)
    }

    pub fn load_from(dir: &Path, args: &GlobalArgs) -> Result<Self, figment::Error> {
        Self::figment(dir)
            .merge(Serialized::defaults(FlagOverrides::from(args)))
            .extract()
    }

    /// Logger settings: `STX_LOG`/`RUST_LOG` apply unless a level is configured here
    pub fn log_config(&self) -> stx_log::Config {
        let mut config = stx_log::Config::from_env().with_colors(self.color);
        if let Some(level) = &self.log_level {
            config.level.clone_from(level);
        }
        if let Some(format) = self.log_format {
            config.format = format;
        }
        config
    }
}
