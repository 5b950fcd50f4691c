//! `docsmith generate`: run the pipeline for one product.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use docsmith_core::assemble::persist;
use docsmith_core::{
    Config, DocumentationOrchestrator, FirecrawlCli, FirecrawlRenderer, HttpRenderer,
    MarkdownDocument, Renderer, SourceRequest,
};
use serde::Serialize;
use tracing::info;

use crate::cli::{GenerateArgs, OutputFormat, RendererKind};
use crate::output::print_json;
use crate::output::progress::ProgressDisplay;

/// One section in the result summary.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionSummary {
    /// Section title.
    pub title: String,
    /// Source URL.
    pub url: String,
    /// Last-updated marker, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

/// Machine-readable result of `generate`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateSummary {
    /// Product id.
    pub product: String,
    /// Generation timestamp.
    pub generated_at: String,
    /// Written file, unless `--stdout` was used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Every resolved URL.
    pub sources: Vec<String>,
    /// Sections in document order.
    pub sections: Vec<SectionSummary>,
    /// Resolved URLs that produced no section.
    pub dropped: Vec<String>,
    /// Document text, only with `--stdout`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
}

impl GenerateSummary {
    /// Summarize `document`.
    pub fn new(document: &MarkdownDocument, path: Option<&Path>, with_markdown: bool) -> Self {
        let metadata = &document.metadata;
        let dropped = metadata
            .sources
            .iter()
            .filter(|url| !document.sections.iter().any(|s| &s.url == *url))
            .cloned()
            .collect();
        Self {
            product: metadata.product.clone(),
            generated_at: metadata.generated_at_iso(),
            path: path.map(|p| p.display().to_string()),
            sources: metadata.sources.clone(),
            sections: document
                .sections
                .iter()
                .map(|s| SectionSummary {
                    title: s.title.clone(),
                    url: s.url.clone(),
                    last_updated: s.last_updated.clone(),
                })
                .collect(),
            dropped,
            markdown: with_markdown.then(|| document.markdown.clone()),
        }
    }
}

/// Apply command-line overrides on top of the loaded configuration.
pub fn apply_overrides(config: &mut Config, args: &GenerateArgs) {
    if let Some(dir) = &args.output_dir {
        config.output.dir.clone_from(dir);
    }
    if let Some(concurrency) = args.concurrency {
        config.harvest.concurrency = concurrency;
    }
}

async fn build_renderer(kind: RendererKind, config: &Config) -> Result<Arc<dyn Renderer>> {
    Ok(match kind {
        RendererKind::Http => Arc::new(HttpRenderer::new(
            &config.fetch_options(),
            &config.fetch.user_agent,
        )?),
        RendererKind::Firecrawl => {
            let cli = FirecrawlCli::detect().await?;
            info!(path = cli.path(), version = %cli.version(), "Using Firecrawl CLI");
            Arc::new(FirecrawlRenderer::new(cli))
        },
    })
}

/// Generate, then persist or print the document.
pub async fn execute(args: &GenerateArgs, mut config: Config, quiet: bool) -> Result<()> {
    apply_overrides(&mut config, args);
    let request = SourceRequest::from_inbound(&args.product, &args.requirements)?;
    let renderer = build_renderer(args.renderer, &config).await?;

    let progress = ProgressDisplay::pages(quiet || args.format == OutputFormat::Json);
    let orchestrator = DocumentationOrchestrator::from_config(&config, renderer)?
        .with_progress(ProgressDisplay::callback(&progress));

    let outcome = orchestrator.generate(&request).await;
    progress.finish_and_clear();
    let document = outcome?;

    let path = if args.stdout {
        None
    } else {
        Some(persist(&document, &config.output.dir)?)
    };

    match args.format {
        OutputFormat::Json => {
            print_json(&GenerateSummary::new(&document, path.as_deref(), args.stdout))
        },
        OutputFormat::Text => {
            if args.stdout {
                print!("{document}");
            } else {
                print_text_summary(&GenerateSummary::new(&document, path.as_deref(), false));
            }
            Ok(())
        },
    }
}

fn print_text_summary(summary: &GenerateSummary) {
    println!(
        "{} Generated {} documentation ({}/{} sources)",
        "✓".green(),
        summary.product.bold(),
        summary.sections.len(),
        summary.sources.len()
    );
    if let Some(path) = &summary.path {
        println!("  {path}");
    }
    for url in &summary.dropped {
        println!("  {} skipped {url}", "!".yellow());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use docsmith_core::{DocumentMetadata, DocumentationSource, MarkdownAssembler};
    use std::path::PathBuf;

    fn document() -> MarkdownDocument {
        let metadata = DocumentMetadata::new(
            "acme",
            Some("Widgets"),
            vec!["https://a.dev/1".into(), "https://a.dev/2".into()],
        );
        let sections = vec![DocumentationSource {
            url: "https://a.dev/2".into(),
            title: "Two".into(),
            content: "Body".into(),
            last_updated: None,
        }];
        MarkdownAssembler::assemble(metadata, sections)
    }

    #[test]
    fn test_summary_lists_dropped_sources() {
        let summary = GenerateSummary::new(&document(), Some(Path::new("/tmp/x.md")), false);
        assert_eq!(summary.dropped, vec!["https://a.dev/1"]);
        assert_eq!(summary.sections.len(), 1);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["path"], "/tmp/x.md");
        assert!(json.get("markdown").is_none());
        assert!(json.get("generatedAt").is_some());
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        let args = GenerateArgs {
            product: "acme".into(),
            requirements: "Widgets".into(),
            output_dir: Some(PathBuf::from("/tmp/out")),
            stdout: false,
            format: OutputFormat::Text,
            renderer: RendererKind::Http,
            concurrency: Some(9),
        };
        apply_overrides(&mut config, &args);
        assert_eq!(config.output.dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.harvest.concurrency, 9);
    }
}
