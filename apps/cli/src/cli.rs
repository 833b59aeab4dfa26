//! Command-line arguments

use clap::{Args, Parser, Subcommand};

/// Load, evaluate and print stack configurations
#[derive(Debug, Parser)]
#[command(name = "stx", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Flags shared by every subcommand; each overrides `stx.toml` and `STX_*`
#[derive(Debug, Default, Args)]
pub struct GlobalArgs {
    /// Skip instances whose display path matches this regular expression
    #[arg(long, global = true, value_name = "REGEX")]
    pub exclude: Option<String>,

    /// Package clause files must declare [default: cfn]
    #[arg(long, global = true, value_name = "NAME")]
    pub package: Option<String>,

    /// Maximum number of instances evaluated at once (0 means unbounded)
    #[arg(long, global = true, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Log filter directive, e.g. `debug` or `stx_engine=trace`
    #[arg(long, global = true, value_name = "FILTER")]
    pub log_level: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the stacks of each instance as YAML
    Print(PrintArgs),
}

#[derive(Debug, Default, Args)]
pub struct PrintArgs {
    /// Only print errors
    #[arg(long, conflicts_with = "hide_errors")]
    pub only_errors: bool,

    /// Hide errors
    #[arg(long)]
    pub hide_errors: bool,

    /// Dot-notation path to print inside each stack, e.g. Template.Resources
    #[arg(short, long, value_name = "DOT.PATH")]
    pub path: Option<String>,

    /// Directories, `dir/...` patterns or .cue files [default: ./...]
    #[arg(value_name = "ARGS")]
    pub args: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "stx", "print", "--exclude", "c$", "-p", "Template.Outputs", "./a", "./b",
        ])
        .unwrap();
        assert_eq!(cli.global.exclude.as_deref(), Some("c$"));
        let Command::Print(print) = cli.command;
        assert_eq!(print.path.as_deref(), Some("Template.Outputs"));
        assert_eq!(print.args, vec!["./a", "./b"]);
    }

    #[test]
    fn only_errors_conflicts_with_hide_errors() {
        let err = Cli::try_parse_from(["stx", "print", "--only-errors", "--hide-errors"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }
}
