pub mod print;

use stx_engine::ProcessReport;

use crate::cli::Command;
use crate::config::StxConfig;

pub async fn run(command: Command, config: &StxConfig) -> ProcessReport {
    match command {
        Command::Print(args) => print::run(args, config).await,
    }
}
