//! Request-scoped data carried through the harvesting pipeline.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Title used when a page carries neither an `h1` nor a `<title>`.
pub const UNTITLED: &str = "Untitled Documentation";

/// Selector the default wait condition watches for readable text.
pub const DEFAULT_READY_SELECTOR: &str = "main, article, .documentation-content";

/// A single generation request.
///
/// Both fields are trimmed on construction; the product id is required,
/// requirements are optional at the library level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRequest {
    product_id: String,
    requirements: Option<String>,
}

impl SourceRequest {
    /// Create a request for `product_id` without requirements.
    pub fn new(product_id: &str) -> Result<Self> {
        let product_id = product_id.trim();
        if product_id.is_empty() {
            return Err(Error::InvalidInput("Product name is required".into()));
        }
        Ok(Self {
            product_id: product_id.to_string(),
            requirements: None,
        })
    }

    /// Validate an inbound request, where both fields must be non-empty.
    pub fn from_inbound(product_name: &str, requirements: &str) -> Result<Self> {
        let request = Self::new(product_name)?;
        if requirements.trim().is_empty() {
            return Err(Error::InvalidInput(
                "Documentation requirements are required".into(),
            ));
        }
        Ok(request.with_requirements(requirements))
    }

    /// Attach free-text requirements. Blank text clears them.
    #[must_use]
    pub fn with_requirements(mut self, requirements: &str) -> Self {
        let trimmed = requirements.trim();
        self.requirements = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    /// Product identifier as the caller supplied it, trimmed.
    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    /// Requirements text, if any.
    pub fn requirements(&self) -> Option<&str> {
        self.requirements.as_deref()
    }
}

/// One successfully processed source URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentationSource {
    /// URL the content was harvested from.
    pub url: String,
    /// Section title.
    pub title: String,
    /// Normalized markdown fragment.
    pub content: String,
    /// Last-modified timestamp when the page or response carried one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

/// Metadata written to the document's front matter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    /// Product id as requested.
    pub product: String,
    /// Time the document was generated.
    pub generated_at: DateTime<Utc>,
    /// Free-text requirements echoed from the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
    /// Every resolved URL in resolution order, whether or not it succeeded.
    pub sources: Vec<String>,
}

impl DocumentMetadata {
    /// Metadata stamped with the current time.
    pub fn new(product: &str, requirements: Option<&str>, sources: Vec<String>) -> Self {
        Self {
            product: product.to_string(),
            generated_at: Utc::now(),
            requirements: requirements.map(str::to_string),
            sources,
        }
    }

    /// `generatedAt` in ISO-8601 with millisecond precision and a `Z` suffix.
    pub fn generated_at_iso(&self) -> String {
        self.generated_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// The assembled artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownDocument {
    /// Front matter metadata.
    pub metadata: DocumentMetadata,
    /// Sections in resolution order, failed sources omitted.
    pub sections: Vec<DocumentationSource>,
    /// Rendered markdown text.
    pub markdown: String,
}

impl std::fmt::Display for MarkdownDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.markdown)
    }
}

/// What a renderer hands back for a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawContent {
    /// A full HTML document.
    Html(String),
    /// An object the renderer already extracted inline.
    Structured(serde_json::Value),
}

/// Readiness condition a renderer honours before returning a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WaitCondition {
    /// Return as soon as the page is loaded.
    None,
    /// Wait a fixed amount of time after load.
    Delay {
        /// Delay in milliseconds.
        millis: u64,
    },
    /// Wait until the selector's text grows past `min_text_len`, up to `timeout_ms`.
    Selector {
        /// Selector whose text content is measured.
        selector: String,
        /// Minimum number of characters.
        #[serde(default = "default_min_text_len")]
        min_text_len: usize,
        /// Upper bound on the wait.
        #[serde(default = "default_wait_timeout_ms")]
        timeout_ms: u64,
    },
}

const fn default_min_text_len() -> usize {
    100
}

const fn default_wait_timeout_ms() -> u64 {
    30_000
}

impl Default for WaitCondition {
    fn default() -> Self {
        Self::Selector {
            selector: DEFAULT_READY_SELECTOR.to_string(),
            min_text_len: default_min_text_len(),
            timeout_ms: default_wait_timeout_ms(),
        }
    }
}

/// Per-fetch options passed through to the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Extra request headers.
    pub headers: BTreeMap<String, String>,
    /// Readiness condition.
    pub wait: WaitCondition,
    /// Timeout for a single render.
    pub timeout: Duration,
    /// Maximum number of redirects to follow.
    pub max_redirects: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            headers: BTreeMap::new(),
            wait: WaitCondition::default(),
            timeout: Duration::from_secs(30),
            max_redirects: 5,
        }
    }
}

/// A rendered page as returned by a [`Renderer`](crate::Renderer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// Final URL after redirects.
    pub url: String,
    /// HTTP status, when the renderer knows it.
    pub status: Option<u16>,
    /// Page content.
    pub content: RawContent,
    /// `Last-Modified` response header, if any.
    pub last_modified: Option<String>,
}

impl RenderedPage {
    /// A 200 HTML page.
    pub fn html(url: &str, html: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            status: Some(200),
            content: RawContent::Html(html.into()),
            last_modified: None,
        }
    }

    /// A page whose content the renderer already extracted.
    pub fn structured(url: &str, value: serde_json::Value) -> Self {
        Self {
            url: url.to_string(),
            status: Some(200),
            content: RawContent::Structured(value),
            last_modified: None,
        }
    }
}
