//! # CLI Structure and Argument Parsing
//!
//! Command-line interface for `docsmith`, built with `clap` derive macros.
//!
//! ## Usage Patterns
//!
//! ```bash
//! # Generate a document and write it to ./docs
//! docsmith generate stripe --requirements "Customer management endpoints"
//!
//! # Print the markdown instead of writing a file
//! docsmith generate openai -r "Chat completions" --stdout
//!
//! # Known products and their URLs
//! docsmith sources --format json
//!
//! # Apply an extractor config to a page
//! docsmith extract https://docs.stripe.com/api/customers --extractor customers.toml
//! ```
//!
//! ## Output Formats
//!
//! - **text**: Human-readable output (default)
//! - **json**: Machine-readable JSON; errors become `{code, message, sourceUrl?}`

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Main CLI structure for the `docsmith` command.
#[derive(Parser, Clone, Debug)]
#[command(name = "docsmith")]
#[command(version)]
#[command(about = "docsmith - Harvest product documentation into one markdown file", long_about = None)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, env = "DOCSMITH_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Alias for --verbose
    #[arg(long, global = true, hide = true)]
    pub debug: bool,

    /// Suppress informational messages (only show errors)
    #[arg(short = 'q', long, global = true, conflicts_with_all = ["verbose", "debug"])]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Log line format on stderr
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Available subcommands.
#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Generate a documentation file for a product
    Generate(GenerateArgs),

    /// List known products and their documentation URLs
    Sources {
        /// Output format
        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Apply an extractor config to a URL or a local HTML file
    Extract {
        /// URL (http/https) or path to an HTML file
        target: String,

        /// Extractor config (TOML or JSON)
        #[arg(short = 'c', long = "extractor", value_name = "FILE")]
        extractor: PathBuf,
    },
}

/// Arguments for `docsmith generate`.
#[derive(clap::Args, Clone, Debug)]
pub struct GenerateArgs {
    /// Product id or alias (see `docsmith sources`)
    pub product: String,

    /// What the document should focus on
    #[arg(short = 'r', long)]
    pub requirements: String,

    /// Directory the document is written to
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Print the document instead of writing a file
    #[arg(long)]
    pub stdout: bool,

    /// Output format for the result summary and errors
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Renderer used to fetch pages
    #[arg(long, value_enum, default_value_t = RendererKind::Http)]
    pub renderer: RendererKind,

    /// Maximum pages fetched at once (1-50)
    #[arg(long)]
    pub concurrency: Option<usize>,
}

/// Output format for command results.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON
    Json,
}

/// Renderer backends.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RendererKind {
    /// Plain HTTP fetch
    Http,
    /// Firecrawl CLI (renders JavaScript)
    Firecrawl,
}

/// Log output format.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact text lines
    Text,
    /// One JSON object per line
    Json,
}

impl Cli {
    /// Output format of the selected command.
    pub const fn output_format(&self) -> OutputFormat {
        match &self.command {
            Commands::Generate(args) => args.format,
            Commands::Sources { format } => *format,
            Commands::Extract { .. } => OutputFormat::Json,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_generate_args() {
        let cli = Cli::try_parse_from([
            "docsmith",
            "generate",
            "stripe",
            "-r",
            "Customers",
            "--concurrency",
            "3",
            "--format",
            "json",
        ])
        .unwrap();
        match cli.command {
            Commands::Generate(args) => {
                assert_eq!(args.product, "stripe");
                assert_eq!(args.requirements, "Customers");
                assert_eq!(args.concurrency, Some(3));
                assert_eq!(args.renderer, RendererKind::Http);
                assert!(!args.stdout);
            },
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_generate_requires_requirements() {
        assert!(Cli::try_parse_from(["docsmith", "generate", "stripe"]).is_err());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["docsmith", "-q", "-v", "sources"]).is_err());
    }

    #[test]
    fn test_extract_output_is_json() {
        let cli =
            Cli::try_parse_from(["docsmith", "extract", "page.html", "--extractor", "x.toml"])
                .unwrap();
        assert_eq!(cli.output_format(), OutputFormat::Json);
    }
}
