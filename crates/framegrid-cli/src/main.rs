//! framegrid command-line tool.

use std::io::{self, IsTerminal};

use clap::Parser;
use framegrid_cli::config::Settings;
use framegrid_cli::logging::{init_logging, LogConfig, LogFormat};

mod cli;
mod commands;

use crate::cli::{Cli, Command, LogFormatArg};
use crate::commands::{run_edit, run_extract, run_grid, run_show};

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging(&log_config_from_cli(&cli)) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }

    let exit_code = match run(&cli) {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let settings = Settings::new(&cli.store_dir, &cli.api_url)?;
    match &cli.command {
        Command::Extract(args) => run_extract(&settings, args),
        Command::Edit(args) => run_edit(&settings, args),
        Command::Show(args) => run_show(&settings, args),
        Command::Grid(args) => run_grid(&settings, args),
    }
}

/// Explicit -v/-q flags win over `RUST_LOG`.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        use_env_filter: !cli.verbosity.is_present(),
        format: match cli.log_format {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        },
        with_ansi: io::stderr().is_terminal(),
    }
}
