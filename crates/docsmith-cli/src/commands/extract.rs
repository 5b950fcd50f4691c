//! `docsmith extract`: apply an extractor config to one page.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use docsmith_core::{
    Config, Error as CoreError, Extractor, ExtractorConfig, Fetcher, HttpRenderer, RawContent,
};
use tracing::debug;

use crate::error::CliError;
use crate::output::print_json;

/// Run the extractor in `extractor_path` against `target` and print the
/// record as JSON.
pub async fn execute(target: &str, extractor_path: &Path, config: &Config) -> Result<()> {
    let extractor_config = load_extractor(extractor_path)?;
    let extractor = Extractor::compile(&extractor_config)?;
    let html = load_target(target, config).await?;
    debug!(bytes = html.len(), "Loaded extraction target");

    let value = extractor.extract_html(&html);
    print_json(&value)
}

/// Parse an extractor config; `.json` files are JSON, everything else TOML.
pub fn load_extractor(path: &Path) -> Result<ExtractorConfig> {
    let source = std::fs::read_to_string(path).map_err(|e| {
        CliError::not_found(anyhow::anyhow!(
            "Cannot read extractor config {}: {e}",
            path.display()
        ))
    })?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let config = if is_json {
        ExtractorConfig::from_json_str(&source)
    } else {
        ExtractorConfig::from_toml_str(&source)
    };
    config.with_context(|| format!("Invalid extractor config {}", path.display()))
}

async fn load_target(target: &str, config: &Config) -> Result<String> {
    if target.starts_with("http://") || target.starts_with("https://") {
        let options = config.fetch_options();
        let renderer = Arc::new(HttpRenderer::new(&options, &config.fetch.user_agent)?);
        let fetcher = Fetcher::new(renderer, config.retry_policy());
        let page = fetcher.fetch(target, &options).await?;
        return match page.content {
            RawContent::Html(html) => Ok(html),
            RawContent::Structured(_) => Err(CoreError::Processing(format!(
                "'{target}' returned structured content, not HTML"
            ))
            .into()),
        };
    }

    std::fs::read_to_string(target).map_err(|e| {
        CliError::not_found(anyhow::anyhow!("Cannot read {target}: {e}")).into()
    })
}
