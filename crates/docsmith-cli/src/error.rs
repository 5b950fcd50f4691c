//! Exit statuses for `docsmith`.
//!
//! Each failure maps to a fixed process status so scripts can branch on it
//! without parsing messages:
//!
//! | Status | Kind | Raised for |
//! |--------|------|------------|
//! | 0 | | success |
//! | 1 | `Internal` | bugs and anything unclassified |
//! | 2 | `Usage` | bad arguments, blank input, unreadable config |
//! | 3 | `NotFound` | unknown product, missing file or executable |
//! | 4 | `NoContent` | every source was dropped |
//! | 5 | `Network` | a fetch failed |
//! | 6 | `Timeout` | a fetch or scrape ran out of time |
//! | 7 | `Content` | a page or extractor could not be parsed |
//!
//! ```bash
//! docsmith generate acme -r "Widgets"
//! case $? in
//!     0) echo "Generated" ;;
//!     3) echo "Unknown product" ;;
//!     4) echo "Every source failed" ;;
//! esac
//! ```

use std::fmt;

use docsmith_core::{Error as CoreError, ErrorCode, ErrorReport};

/// Failure kind, one per exit status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// Status 1.
    Internal,
    /// Status 2.
    Usage,
    /// Status 3.
    NotFound,
    /// Status 4.
    NoContent,
    /// Status 5.
    Network,
    /// Status 6.
    Timeout,
    /// Status 7.
    Content,
}

impl FailureKind {
    /// Process exit status.
    #[must_use]
    pub const fn status(self) -> u8 {
        match self {
            Self::Internal => 1,
            Self::Usage => 2,
            Self::NotFound => 3,
            Self::NoContent => 4,
            Self::Network => 5,
            Self::Timeout => 6,
            Self::Content => 7,
        }
    }

    /// Kind for a pipeline error.
    ///
    /// Timeouts, configuration problems and a missing Firecrawl binary get
    /// their own kinds; everything else follows the error code.
    #[must_use]
    pub const fn of(err: &CoreError) -> Self {
        match err {
            CoreError::Timeout(_) => Self::Timeout,
            CoreError::Config(_) => Self::Usage,
            CoreError::FirecrawlNotInstalled => Self::NotFound,
            _ => match err.code() {
                ErrorCode::InvalidInput => Self::Usage,
                ErrorCode::InvalidSource => Self::NotFound,
                ErrorCode::NoContent => Self::NoContent,
                ErrorCode::FetchError => Self::Network,
                ErrorCode::ParseError | ErrorCode::ExtractionError => Self::Content,
                ErrorCode::ProcessingError => Self::Internal,
            },
        }
    }
}

/// An error raised by the CLI layer itself, tagged with its exit kind.
#[derive(Debug)]
pub struct CliError {
    /// Exit kind.
    pub kind: FailureKind,
    /// Wrapped error.
    pub inner: anyhow::Error,
}

impl CliError {
    /// Bad arguments or configuration.
    pub fn usage(inner: impl Into<anyhow::Error>) -> Self {
        Self {
            kind: FailureKind::Usage,
            inner: inner.into(),
        }
    }

    /// A file or resource named on the command line does not exist.
    pub fn not_found(inner: impl Into<anyhow::Error>) -> Self {
        Self {
            kind: FailureKind::NotFound,
            inner: inner.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

fn kind_of(err: &anyhow::Error) -> FailureKind {
    err.downcast_ref::<CliError>().map_or_else(
        || core_error(err).map_or(FailureKind::Internal, FailureKind::of),
        |cli| cli.kind,
    )
}

/// Exit status for `err`: a [`CliError`] tag first, then the first pipeline
/// error in the chain, then 1.
#[must_use]
pub fn exit_code_from_error(err: &anyhow::Error) -> u8 {
    kind_of(err).status()
}

/// First pipeline error in the chain.
pub fn core_error(err: &anyhow::Error) -> Option<&CoreError> {
    err.chain().find_map(|cause| cause.downcast_ref::<CoreError>())
}

/// `{code, message, sourceUrl?}` report for `err`.
///
/// Pipeline errors keep their own code and URL; added context is folded
/// into the message. CLI-level usage errors report `INVALID_INPUT` and the
/// rest `PROCESSING_ERROR`.
pub fn report(err: &anyhow::Error) -> ErrorReport {
    if let Some(core) = core_error(err) {
        let mut report = core.report();
        if err.to_string() != core.to_string() {
            report.message = format!("{err:#}");
        }
        return report;
    }
    ErrorReport {
        code: if kind_of(err) == FailureKind::Usage {
            ErrorCode::InvalidInput
        } else {
            ErrorCode::ProcessingError
        },
        message: format!("{err:#}"),
        source_url: None,
    }
}
