//! # docsmith-core
//!
//! Core pipeline for docsmith: turns a product name into one markdown
//! document harvested from that product's documentation pages.
//!
//! ## Architecture
//!
//! A request flows through five components:
//!
//! - **Source Resolver** ([`registry`]): product id → ordered URL list
//! - **Fetch layer** ([`fetcher`], [`firecrawl`]): URL → rendered page, with
//!   bounded retries behind the [`Renderer`] capability
//! - **Extractor Engine** ([`extract`]): declarative selector trees → records
//! - **Content Normalizer** ([`normalize`]): rendered page → markdown fragment,
//!   through ordered fallback tiers
//! - **Markdown Assembler** ([`assemble`]): fragments → final document with
//!   front matter and a table of contents
//!
//! The [`orchestrator`] wires them together and runs the per-URL chains
//! concurrently.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use docsmith_core::{Config, DocumentationOrchestrator, HttpRenderer, SourceRequest};
//!
//! # async fn run() -> docsmith_core::Result<()> {
//! let config = Config::load(None)?;
//! let renderer = Arc::new(HttpRenderer::new(&config.fetch_options(), &config.fetch.user_agent)?);
//! let orchestrator = DocumentationOrchestrator::from_config(&config, renderer)?;
//!
//! let request = SourceRequest::from_inbound("stripe", "Customer management")?;
//! let document = orchestrator.generate(&request).await?;
//! let path = docsmith_core::assemble::persist(&document, &config.output.dir)?;
//! println!("Wrote {}", path.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`]. Every error maps onto a public
//! [`ErrorCode`] and can be turned into a serializable [`ErrorReport`]:
//!
//! ```rust
//! use docsmith_core::{Error, ErrorCode};
//!
//! let err = Error::NoContent { url: None };
//! assert_eq!(err.code(), ErrorCode::NoContent);
//! assert_eq!(err.report().code.as_str(), "NO_CONTENT");
//! ```

/// Markdown assembly, front matter and persistence
pub mod assemble;
/// Configuration loading and environment overrides
pub mod config;
/// Error types and result aliases
pub mod error;
/// Declarative DOM extraction
pub mod extract;
/// Renderer boundary, HTTP renderer and retry policy
pub mod fetcher;
/// Firecrawl CLI renderer
pub mod firecrawl;
/// Rendered page to markdown fragment
pub mod normalize;
/// Request pipeline
pub mod orchestrator;
/// Built-in product table and resolution
pub mod registry;
/// Core data types
pub mod types;

// Re-export commonly used types
pub use assemble::{FrontMatter, MarkdownAssembler, anchor, parse_front_matter};
pub use config::Config;
pub use error::{Error, ErrorCode, ErrorReport, Result};
pub use extract::{ExtractedRecord, ExtractedValue, Extractor, ExtractorConfig, Transform};
pub use fetcher::{Fetcher, HttpRenderer, Renderer, RetryPolicy};
pub use firecrawl::{FirecrawlCli, FirecrawlRenderer};
pub use normalize::Normalizer;
pub use orchestrator::{
    DocumentationOrchestrator, FailedSource, HarvestResults, PipelineState, ProgressCallback,
};
pub use registry::{ProductEntry, SourceResolver};
pub use types::*;
