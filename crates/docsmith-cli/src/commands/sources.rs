//! `docsmith sources`: list the product table.

use anyhow::Result;
use colored::Colorize;
use docsmith_core::{Config, SourceResolver};

use crate::cli::OutputFormat;
use crate::output::print_json;

/// List built-in and configured products.
pub fn execute(config: &Config, format: OutputFormat) -> Result<()> {
    let resolver = SourceResolver::new().with_overrides(&config.products)?;
    let mut entries = resolver.entries().to_vec();
    entries.sort_by(|a, b| a.id.cmp(&b.id));

    match format {
        OutputFormat::Json => print_json(&entries),
        OutputFormat::Text => {
            for entry in &entries {
                println!("{}", entry.to_string().bold());
                if !entry.aliases.is_empty() {
                    println!("  aliases: {}", entry.aliases.join(", ").dimmed());
                }
                for url in &entry.urls {
                    println!("  {url}");
                }
            }
            Ok(())
        },
    }
}
