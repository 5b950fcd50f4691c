//! Logging initialization and configuration.
//!
//! Sets up the tracing subscriber on stderr and color control based on CLI
//! flags and environment variables.

use anyhow::Result;
use colored::control as color_control;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::cli::{Cli, LogFormat, OutputFormat};

/// Level selected by the global flags.
pub const fn level_for(cli: &Cli) -> Level {
    if cli.verbose || cli.debug {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::WARN
    }
}

/// Initialize the logging subsystem based on CLI flags.
///
/// `RUST_LOG` overrides the flag-derived level when set.
///
/// # Errors
///
/// Returns an error if the global tracing subscriber cannot be set.
pub fn initialize_logging(cli: &Cli) -> Result<()> {
    let level = level_for(cli);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr);

    match cli.log_format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish())?,
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
    }

    // Machine output and NO_COLOR both disable ANSI colors.
    let env_no_color = std::env::var_os("NO_COLOR").is_some();
    if cli.no_color || env_no_color || cli.output_format() == OutputFormat::Json {
        color_control::set_override(false);
    }
    Ok(())
}
