//! docsmith CLI - Harvest product documentation into one markdown file
//!
//! Command implementations live in separate modules; [`run`] wires argument
//! parsing, logging, configuration and error reporting together.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use docsmith_core::Config;

mod cli;
mod commands;
pub mod error;
mod output;
mod utils;

use crate::cli::{Cli, Commands};
use crate::error::{CliError, exit_code_from_error};
use crate::utils::initialize_logging;

/// Execute the docsmith CLI with the current process arguments.
///
/// Failures are reported on the way out (structured JSON or colored text,
/// depending on the command's output format) and mapped to an exit code.
pub async fn run() -> ExitCode {
    // Convert Broken pipe panics into a clean exit
    std::panic::set_hook(Box::new(|info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe") || msg.contains("broken pipe") {
            std::process::exit(0);
        }
        eprintln!("{msg}");
    }));

    let cli = Cli::parse();
    if let Err(err) = initialize_logging(&cli) {
        eprintln!("Failed to initialize logging: {err}");
        return ExitCode::FAILURE;
    }

    let format = cli.output_format();
    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::render_error(&err, format);
            ExitCode::from(exit_code_from_error(&err))
        },
    }
}

async fn execute(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).map_err(CliError::usage)?;

    match cli.command {
        Commands::Generate(args) => commands::generate::execute(&args, config, cli.quiet).await,
        Commands::Sources { format } => commands::sources::execute(&config, format),
        Commands::Extract { target, extractor } => {
            commands::extract::execute(&target, &extractor, &config).await
        },
    }
}
