#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # stx-log
//!
//! Installs the `tracing` subscriber used by the stx binary.
//!
//! - [`Config`] carries the filter directive, [`Format`] and color choice
//! - [`Config::from_env`] reads `STX_LOG` (then `RUST_LOG`) and `STX_LOG_FORMAT`
//! - [`LoggerBuilder`] installs an `EnvFilter` plus a fmt or JSON layer on stderr
//!
//! ```no_run
//! let _guard = stx_log::init(stx_log::Config::from_env()).expect("logger");
//! tracing::info!("ready");
//! ```

pub mod builder;
pub mod config;
pub mod error;

pub use builder::{LoggerBuilder, LoggerGuard};
pub use config::{Config, Format};
pub use error::{LogError, LogResult};

/// Build and install a logger from `config`
pub fn init(config: Config) -> LogResult<LoggerGuard> {
    LoggerBuilder::from_config(config).build()
}
