//! Documentation pipeline orchestration.
//!
//! Drives one generation request through
//! `Idle → ResolvingSources → Harvesting → Assembling → Done`, with `Failed`
//! reachable from any stage.
//!
//! Harvesting fans out over the resolved URLs: each URL runs its own
//! fetch → normalize chain, bounded by the configured concurrency. A failure
//! in one chain drops that URL and never touches its siblings. Results are
//! joined before assembly and re-ordered by resolution order, so completion
//! order never leaks into the document.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docsmith_core::{Config, DocumentationOrchestrator, HttpRenderer, SourceRequest};
//!
//! # async fn example() -> docsmith_core::Result<()> {
//! let config = Config::default();
//! let renderer = Arc::new(HttpRenderer::new(&config.fetch_options(), &config.fetch.user_agent)?);
//! let orchestrator = DocumentationOrchestrator::from_config(&config, renderer)?
//!     .with_progress(|done, total| println!("{done}/{total}"));
//!
//! let request = SourceRequest::new("stripe")?.with_requirements("Customer endpoints");
//! let document = orchestrator.generate(&request).await?;
//! println!("{document}");
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::assemble::MarkdownAssembler;
use crate::config::{Config, MAX_CONCURRENCY, MIN_CONCURRENCY};
use crate::error::ErrorCode;
use crate::fetcher::{Fetcher, Renderer};
use crate::normalize::Normalizer;
use crate::registry::SourceResolver;
use crate::types::{
    DocumentMetadata, DocumentationSource, FetchOptions, MarkdownDocument, SourceRequest,
};
use crate::{Error, Result};

/// Stage of a generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// Nothing started yet.
    Idle,
    /// Looking up the product's URLs.
    ResolvingSources,
    /// Fetching and normalizing every URL.
    Harvesting,
    /// Building the final document.
    Assembling,
    /// Document produced.
    Done,
    /// Request failed; terminal.
    Failed,
}

impl PipelineState {
    /// Lower-case name used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ResolvingSources => "resolving_sources",
            Self::Harvesting => "harvesting",
            Self::Assembling => "assembling",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Whether no further transition can happen.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Called with `(completed, total)` after each URL finishes, success or not.
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Called on every state transition.
pub type StateObserver = Arc<dyn Fn(PipelineState) + Send + Sync>;

/// A URL dropped during harvesting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedSource {
    /// URL that was dropped.
    pub url: String,
    /// Public error code of the failure.
    pub code: ErrorCode,
    /// Error message.
    pub message: String,
}

impl FailedSource {
    fn new(url: &str, err: &Error) -> Self {
        Self {
            url: url.to_string(),
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// Outcome of the harvesting stage.
#[derive(Debug, Clone, Default)]
pub struct HarvestResults {
    /// Sections that survived, in resolution order.
    pub sections: Vec<DocumentationSource>,
    /// URLs that were dropped, in resolution order.
    pub failed: Vec<FailedSource>,
}

impl HarvestResults {
    /// Number of URLs processed.
    pub fn total(&self) -> usize {
        self.sections.len() + self.failed.len()
    }

    /// Share of URLs that produced a section, in percent.
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            (self.sections.len() as f64 / total as f64) * 100.0
        }
    }
}

/// Runs generation requests end to end.
///
/// Holds no per-request mutable state; one orchestrator can serve many
/// requests.
pub struct DocumentationOrchestrator<R: Renderer + ?Sized> {
    resolver: SourceResolver,
    fetcher: Fetcher<R>,
    normalizer: Arc<Normalizer>,
    fetch_options: FetchOptions,
    concurrency: usize,
    source_timeout: Duration,
    progress_callback: Option<ProgressCallback>,
    state_observer: Option<StateObserver>,
}

impl<R: Renderer + ?Sized> DocumentationOrchestrator<R> {
    /// Default concurrency level.
    const DEFAULT_CONCURRENCY: usize = 5;

    /// Default bound on one URL's chain.
    const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(120);

    /// Assemble an orchestrator from its collaborators with default limits.
    pub fn new(resolver: SourceResolver, fetcher: Fetcher<R>, normalizer: Normalizer) -> Self {
        Self {
            resolver,
            fetcher,
            normalizer: Arc::new(normalizer),
            fetch_options: FetchOptions::default(),
            concurrency: Self::DEFAULT_CONCURRENCY,
            source_timeout: Self::DEFAULT_SOURCE_TIMEOUT,
            progress_callback: None,
            state_observer: None,
        }
    }

    /// Build everything from `config` around `renderer`.
    ///
    /// The product table in `config` is merged over the built-in one.
    pub fn from_config(config: &Config, renderer: Arc<R>) -> Result<Self> {
        let resolver = SourceResolver::new().with_overrides(&config.products)?;
        let fetcher = Fetcher::new(renderer, config.retry_policy());
        let normalizer = Normalizer::new(config.normalize.clone())?;
        Ok(Self::new(resolver, fetcher, normalizer)
            .with_fetch_options(config.fetch_options())
            .with_concurrency(config.harvest.effective_concurrency())
            .with_source_timeout(Duration::from_secs(config.harvest.per_source_timeout_secs)))
    }

    /// Options passed to the renderer for every URL.
    #[must_use]
    pub fn with_fetch_options(mut self, options: FetchOptions) -> Self {
        self.fetch_options = options;
        self
    }

    /// Maximum URLs in flight, clamped to `1..=50`.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY);
        self
    }

    /// Upper bound on one URL's chain, retries included.
    #[must_use]
    pub const fn with_source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = timeout;
        self
    }

    /// Set progress callback.
    ///
    /// The callback receives `(completed, total)` after each URL is processed.
    #[must_use]
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    /// Observe state transitions.
    #[must_use]
    pub fn with_state_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(PipelineState) + Send + Sync + 'static,
    {
        self.state_observer = Some(Arc::new(observer));
        self
    }

    /// Current concurrency level.
    pub const fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// The resolver in use.
    pub const fn resolver(&self) -> &SourceResolver {
        &self.resolver
    }

    fn transition(&self, state: PipelineState) {
        debug!(state = %state, "Pipeline transition");
        if let Some(observer) = &self.state_observer {
            observer(state);
        }
    }

    fn fail(&self, err: Error) -> Error {
        self.transition(PipelineState::Failed);
        err
    }

    /// Produce the document for `request`.
    ///
    /// Fails with [`Error::InvalidSource`] before any network call when the
    /// product is unknown, and with [`Error::NoContent`] (no URL) when every
    /// source was dropped.
    #[instrument(skip(self, request), fields(product = %request.product_id()))]
    pub async fn generate(&self, request: &SourceRequest) -> Result<MarkdownDocument> {
        self.transition(PipelineState::ResolvingSources);
        let urls = self
            .resolver
            .resolve(request.product_id())
            .map_err(|err| self.fail(err))?;
        info!("Resolved {} source(s)", urls.len());

        self.transition(PipelineState::Harvesting);
        let results = self.harvest(&urls).await;
        if results.sections.is_empty() {
            warn!(failed = results.failed.len(), "Every source was dropped");
            return Err(self.fail(Error::NoContent { url: None }));
        }
        info!(
            harvested = results.sections.len(),
            dropped = results.failed.len(),
            "Harvest complete"
        );

        self.transition(PipelineState::Assembling);
        let metadata =
            DocumentMetadata::new(request.product_id(), request.requirements(), urls);
        let document = MarkdownAssembler::assemble(metadata, results.sections);

        self.transition(PipelineState::Done);
        Ok(document)
    }

    /// Fetch and normalize every URL concurrently.
    ///
    /// Never fails: per-URL errors are logged and reported in
    /// [`HarvestResults::failed`]. The renderer is released once all URLs
    /// have finished.
    pub async fn harvest(&self, urls: &[String]) -> HarvestResults {
        if urls.is_empty() {
            return HarvestResults::default();
        }

        let total = urls.len();
        let completed = AtomicUsize::new(0);

        let mut outcomes: Vec<(usize, Result<DocumentationSource>)> =
            stream::iter(urls.iter().enumerate())
                .map(|(index, url)| {
                    let completed = &completed;
                    async move {
                        let outcome = self.harvest_one(url).await;

                        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                        if let Some(cb) = &self.progress_callback {
                            cb(done, total);
                        }

                        (index, outcome)
                    }
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

        self.fetcher.renderer().release().await;

        outcomes.sort_by_key(|(index, _)| *index);

        let mut results = HarvestResults::default();
        for (index, outcome) in outcomes {
            let url = &urls[index];
            match outcome {
                Ok(section) => results.sections.push(section),
                Err(err) => {
                    warn!(url = %url, code = %err.code(), error = %err, "Dropping source");
                    results.failed.push(FailedSource::new(url, &err));
                },
            }
        }
        results
    }

    async fn harvest_one(&self, url: &str) -> Result<DocumentationSource> {
        let chain = async {
            let page = self.fetcher.fetch(url, &self.fetch_options).await?;
            let section = self.normalizer.process(&page, url)?;
            info!(url, title = %section.title, "Harvested source");
            Ok(section)
        };

        tokio::time::timeout(self.source_timeout, chain)
            .await
            .map_err(|_| {
                Error::Timeout(format!(
                    "'{url}' did not finish within {}s",
                    self.source_timeout.as_secs_f64()
                ))
            })?
    }
}
