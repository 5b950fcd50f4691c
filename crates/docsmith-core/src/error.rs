//! Error types and handling for docsmith-core operations.
//!
//! A single [`Error`] enum covers every failure in the harvesting pipeline.
//! Each variant maps onto one of the public [`ErrorCode`]s that callers see,
//! and carries enough context (source URL, HTTP status) for the orchestrator
//! to decide whether a failure is local to one source or fatal to the whole
//! request.
//!
//! ## Error Categories
//!
//! - **Input errors**: missing product or requirements (`INVALID_INPUT`)
//! - **Resolution errors**: unknown product (`INVALID_SOURCE`)
//! - **Fetch errors**: HTTP, network, renderer failures (`FETCH_ERROR`)
//! - **Content errors**: nothing usable extracted (`NO_CONTENT`)
//! - **Normalization errors**: parse, extraction, processing failures
//!
//! ## Recovery Hints
//!
//! ```rust
//! use docsmith_core::Error;
//!
//! let transient = Error::Fetch {
//!     url: "https://example.com/docs".to_string(),
//!     reason: "HTTP 503 Service Unavailable".to_string(),
//!     status: Some(503),
//! };
//! assert!(transient.is_recoverable());
//!
//! let missing = Error::Fetch {
//!     url: "https://example.com/gone".to_string(),
//!     reason: "not found".to_string(),
//!     status: Some(404),
//! };
//! assert!(!missing.is_recoverable());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The main error type for docsmith-core operations.
///
/// All public functions in docsmith-core return `Result<T, Error>`. Per-source
/// variants ([`Error::Fetch`], [`Error::NoContent`] with a URL, and the
/// normalization variants) are recovered by the orchestrator; the rest
/// surface to the caller.
#[derive(Error, Debug)]
pub enum Error {
    /// Required request fields are missing or blank after trimming.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The requested product has no configured documentation sources.
    ///
    /// Carries the full set of known product ids so the caller can show them,
    /// plus fuzzy-matched suggestions for near misses.
    #[error(
        "No documentation sources found for '{product}' (known products: {})",
        .known.join(", ")
    )]
    InvalidSource {
        /// Product id as the caller supplied it.
        product: String,
        /// Every product id the resolver knows about, sorted.
        known: Vec<String>,
        /// Known ids that look close to the requested one, best first.
        suggestions: Vec<String>,
    },

    /// Fetching a source URL failed.
    ///
    /// `status` is the HTTP status when the failure came from a response;
    /// `None` for connection errors, timeouts and renderer failures.
    #[error("Failed to fetch '{url}': {reason}")]
    Fetch {
        /// URL that failed.
        url: String,
        /// Human-readable cause.
        reason: String,
        /// HTTP status code, if a response was received.
        status: Option<u16>,
    },

    /// No usable content could be extracted.
    ///
    /// With a URL this is a per-source failure; without one it means every
    /// source of the request failed.
    #[error("{}", no_content_message(.url.as_deref()))]
    NoContent {
        /// Source the extraction ran against, if the failure is per-source.
        url: Option<String>,
    },

    /// Raw content could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// An extractor configuration could not be applied.
    ///
    /// Raised when a selector in the configuration is not valid CSS; the
    /// extraction itself never fails on absent data.
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Content was fetched and parsed but could not be turned into markdown.
    #[error("Processing error: {0}")]
    Processing(String),

    /// I/O operation failed (persistence, config files, subprocesses).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Low-level HTTP client failure.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Configuration is invalid or inaccessible.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Operation exceeded its time budget.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Firecrawl CLI is not installed or not in PATH.
    #[error("Firecrawl CLI not installed. Install with: npm install -g firecrawl")]
    FirecrawlNotInstalled,

    /// Firecrawl CLI ran but exited unsuccessfully.
    #[error("Firecrawl command failed: {0}")]
    FirecrawlCommandFailed(String),
}

fn no_content_message(url: Option<&str>) -> String {
    url.map_or_else(
        || "Failed to generate documentation from any source".to_string(),
        |url| format!("No content could be extracted from '{url}'"),
    )
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Public error codes exposed to callers of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Missing required request fields.
    InvalidInput,
    /// Unknown product.
    InvalidSource,
    /// Network or HTTP failure.
    FetchError,
    /// Raw content could not be parsed.
    ParseError,
    /// Nothing usable was extracted.
    NoContent,
    /// Extractor configuration could not be applied.
    ExtractionError,
    /// Anything else that went wrong while processing content.
    ProcessingError,
}

impl ErrorCode {
    /// Wire representation of the code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::InvalidSource => "INVALID_SOURCE",
            Self::FetchError => "FETCH_ERROR",
            Self::ParseError => "PARSE_ERROR",
            Self::NoContent => "NO_CONTENT",
            Self::ExtractionError => "EXTRACTION_ERROR",
            Self::ProcessingError => "PROCESSING_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Map the error onto its public [`ErrorCode`].
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidInput(_) => ErrorCode::InvalidInput,
            Self::InvalidSource { .. } => ErrorCode::InvalidSource,
            Self::Fetch { .. }
            | Self::Network(_)
            | Self::Timeout(_)
            | Self::FirecrawlNotInstalled
            | Self::FirecrawlCommandFailed(_) => ErrorCode::FetchError,
            Self::NoContent { .. } => ErrorCode::NoContent,
            Self::Parse(_) | Self::Serialization(_) => ErrorCode::ParseError,
            Self::Extraction(_) => ErrorCode::ExtractionError,
            Self::Processing(_) | Self::Io(_) | Self::Config(_) => ErrorCode::ProcessingError,
        }
    }

    /// Source URL the error is attributed to, if any.
    #[must_use]
    pub fn source_url(&self) -> Option<&str> {
        match self {
            Self::Fetch { url, .. } => Some(url),
            Self::NoContent { url } => url.as_deref(),
            _ => None,
        }
    }

    /// Check if the error might be recoverable through retry logic.
    ///
    /// Connection failures, timeouts and transient HTTP statuses (5xx, 408,
    /// 429) are recoverable. A 404 is a permanent miss and a 403 is treated
    /// as a deliberate refusal, so neither is retried.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Fetch { status, .. } => match status {
                None => true,
                Some(code) => *code >= 500 || *code == 408 || *code == 429,
            },
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout(_) | Self::FirecrawlCommandFailed(_) => true,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }

    /// Get the error category as a string identifier for logging.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "input",
            Self::InvalidSource { .. } => "source",
            Self::Fetch { .. } | Self::Network(_) => "network",
            Self::NoContent { .. } => "content",
            Self::Parse(_) => "parse",
            Self::Extraction(_) => "extraction",
            Self::Processing(_) => "processing",
            Self::Io(_) => "io",
            Self::Config(_) => "config",
            Self::Serialization(_) => "serialization",
            Self::Timeout(_) => "timeout",
            Self::FirecrawlNotInstalled | Self::FirecrawlCommandFailed(_) => "firecrawl",
        }
    }

    /// Build the structured report handed to callers.
    #[must_use]
    pub fn report(&self) -> ErrorReport {
        ErrorReport::from(self)
    }
}

/// Structured error returned across the outbound boundary.
///
/// Serializes as `{"code": "...", "message": "...", "sourceUrl": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    /// Public error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Source URL the failure is attributed to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl From<&Error> for ErrorReport {
    fn from(err: &Error) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
            source_url: err.source_url().map(str::to_string),
        }
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
