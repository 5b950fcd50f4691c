//! Output rendering for command results and errors.

pub mod progress;

use std::io::{self, Write};

use anyhow::Result;
use colored::Colorize;
use docsmith_core::{Error as CoreError, ErrorReport};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error;

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

/// Report a failed command.
///
/// JSON mode writes the structured [`ErrorReport`] to stdout; text mode writes
/// a colored message to stderr, plus known products and suggestions for an
/// unknown product.
pub fn render_error(err: &anyhow::Error, format: OutputFormat) {
    let report = error::report(err);
    match format {
        OutputFormat::Json => {
            if print_json(&report).is_err() {
                eprintln!("{}", text_error(&report));
            }
        },
        OutputFormat::Text => {
            eprintln!("{}", text_error(&report));
            if let Some(CoreError::InvalidSource {
                known,
                suggestions,
                ..
            }) = error::core_error(err)
            {
                if !suggestions.is_empty() {
                    eprintln!("  Did you mean: {}?", suggestions.join(", ").bold());
                }
                eprintln!("  Known products: {}", known.join(", "));
            }
        },
    }
}

fn text_error(report: &ErrorReport) -> String {
    let mut line = format!("{} [{}] {}", "error:".red().bold(), report.code, report.message);
    if let Some(url) = &report.source_url {
        line.push_str(&format!(" ({url})"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsmith_core::ErrorCode;

    #[test]
    fn test_text_error_includes_code_and_url() {
        colored::control::set_override(false);
        let report = ErrorReport {
            code: ErrorCode::FetchError,
            message: "Failed to fetch".into(),
            source_url: Some("https://docs.acme.dev".into()),
        };
        assert_eq!(
            text_error(&report),
            "error: [FETCH_ERROR] Failed to fetch (https://docs.acme.dev)"
        );
    }
}
