//! Firecrawl CLI renderer.
//!
//! Pages whose content only appears after client-side rendering can be
//! fetched through the Firecrawl CLI instead of plain HTTP. The CLI is
//! detected once per request and driven as a subprocess for every URL.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use docsmith_core::firecrawl::{FirecrawlCli, FirecrawlRenderer};
//!
//! # async fn example() -> docsmith_core::Result<()> {
//! let cli = FirecrawlCli::detect().await?;
//! println!("Firecrawl {} at {}", cli.version(), cli.path());
//! let renderer = FirecrawlRenderer::new(cli);
//! # let _ = renderer;
//! # Ok(())
//! # }
//! ```

pub mod detect;
pub mod scrape;

pub use detect::FirecrawlCli;
pub use scrape::{FirecrawlRenderer, ScrapeOptions, ScrapeResult};

/// Oldest Firecrawl CLI release whose `scrape --json` output is understood.
pub const MIN_VERSION: semver::Version = semver::Version::new(1, 1, 0);
