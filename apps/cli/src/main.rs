//! stx: load, evaluate and print stack configurations

mod cli;
mod commands;
mod config;
mod render;
mod stacks;

use anyhow::Context;
use clap::Parser;

use crate::cli::Cli;
use crate::config::StxConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = StxConfig::load(&cli.global).context("failed to load configuration")?;
    if !config.color {
        colored::control::set_override(false);
    }
    let _guard = stx_log::init(config.log_config()).context("failed to initialize logging")?;
    tracing::debug!(?config, "configuration loaded");

    // Evaluation failures are reported inline and do not change the exit status.
    let report = commands::run(cli.command, &config).await;
    tracing::debug!(
        total = report.total(),
        failed = report.failed(),
        aborted = report.aborted(),
        "command finished"
    );
    Ok(())
}
