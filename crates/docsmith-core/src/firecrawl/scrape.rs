//! Scraping through the Firecrawl CLI.
//!
//! `firecrawl scrape <url> -f rawHtml --json` returns the rendered HTML of a
//! page after its scripts ran. When a build of the CLI only returns markdown,
//! the markdown is handed on as structured content instead.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::process::Command;
use tracing::instrument;

use super::FirecrawlCli;
use crate::fetcher::{Renderer, status_error};
use crate::types::{FetchOptions, RawContent, RenderedPage, WaitCondition};
use crate::{Error, Result};

/// Options for one scrape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeOptions {
    /// Bound on the whole subprocess run. Defaults to 60 seconds.
    pub timeout: Option<Duration>,
    /// Milliseconds Firecrawl waits after load before capturing the page.
    pub wait_for_ms: Option<u64>,
}

impl ScrapeOptions {
    /// Options with no timeout override and no wait.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the subprocess run.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the post-load wait.
    #[must_use]
    pub const fn with_wait_for(mut self, millis: u64) -> Self {
        self.wait_for_ms = Some(millis);
        self
    }

    /// Derive scrape options from pipeline fetch options.
    pub fn from_fetch_options(options: &FetchOptions) -> Self {
        let wait_for_ms = match &options.wait {
            WaitCondition::Delay { millis } => Some(*millis),
            WaitCondition::Selector { timeout_ms, .. } => {
                let cap = u64::try_from(options.timeout.as_millis()).unwrap_or(u64::MAX);
                Some((*timeout_ms).min(cap / 2))
            },
            WaitCondition::None => None,
        };
        Self {
            timeout: Some(options.timeout),
            wait_for_ms,
        }
    }
}

/// JSON printed by `firecrawl scrape --json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeResult {
    /// Unprocessed page HTML.
    #[serde(default)]
    pub raw_html: Option<String>,
    /// Cleaned page HTML.
    #[serde(default)]
    pub html: Option<String>,
    /// Markdown rendition of the page.
    #[serde(default)]
    pub markdown: Option<String>,
    /// Page title.
    #[serde(default)]
    pub title: Option<String>,
    /// URL that was scraped.
    #[serde(default)]
    pub url: Option<String>,
    /// HTTP status of the page.
    #[serde(default)]
    pub status_code: Option<u16>,
}

const SCRAPE_TIMEOUT: Duration = Duration::from_secs(60);

impl FirecrawlCli {
    /// Scrape `url` and return the raw CLI result.
    #[instrument(level = "debug", skip(self, options), fields(url = %url))]
    pub async fn scrape(&self, url: &str, options: &ScrapeOptions) -> Result<ScrapeResult> {
        let timeout = options.timeout.unwrap_or(SCRAPE_TIMEOUT);

        let wait_for = options.wait_for_ms.map(|ms| ms.to_string());
        let mut args = vec!["scrape", url, "-f", "rawHtml", "--json"];
        if let Some(wait_for) = &wait_for {
            args.push("--wait-for");
            args.push(wait_for);
        }

        tracing::debug!(path = %self.path(), ?args, "Running firecrawl scrape");

        let output = tokio::time::timeout(timeout, self.run(&args))
            .await
            .map_err(|_| {
                Error::Timeout(format!(
                    "Firecrawl scrape of {url} timed out after {}s",
                    timeout.as_secs()
                ))
            })??;

        serde_json::from_slice(&output.stdout).map_err(|e| {
            tracing::warn!(
                error = %e,
                stderr = %String::from_utf8_lossy(&output.stderr),
                "Unreadable scrape output"
            );
            Error::Parse(format!("Failed to parse firecrawl scrape output: {e}"))
        })
    }

    async fn run(&self, args: &[&str]) -> Result<std::process::Output> {
        let output = Command::new(self.path())
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(Error::Io)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(
                exit_code = ?output.status.code(),
                stderr = %stderr,
                "firecrawl exited with an error"
            );
            return Err(Error::FirecrawlCommandFailed(stderr.trim().to_string()));
        }

        Ok(output)
    }
}

/// Renderer that drives the Firecrawl CLI.
#[derive(Debug, Clone)]
pub struct FirecrawlRenderer {
    cli: FirecrawlCli,
}

impl FirecrawlRenderer {
    /// Wrap a detected CLI.
    pub const fn new(cli: FirecrawlCli) -> Self {
        Self { cli }
    }
}

/// Turn a scrape result into a rendered page.
///
/// HTML wins over markdown; markdown-only results become structured content
/// with `title` and `content` keys.
pub fn page_from_result(url: &str, result: ScrapeResult) -> Result<RenderedPage> {
    if let Some(code) = result.status_code {
        if let Ok(status) = StatusCode::from_u16(code) {
            if !status.is_success() {
                return Err(status_error(url, status));
            }
        }
    }

    let final_url = result.url.clone().unwrap_or_else(|| url.to_string());
    let present = |field: Option<String>| field.filter(|s| !s.trim().is_empty());
    let content = match (
        present(result.raw_html),
        present(result.html),
        present(result.markdown),
    ) {
        (Some(html), _, _) | (None, Some(html), _) => RawContent::Html(html),
        (None, None, Some(markdown)) => RawContent::Structured(json!({
            "title": result.title,
            "content": markdown,
        })),
        (None, None, None) => return Err(Error::NoContent { url: Some(url.to_string()) }),
    };

    Ok(RenderedPage {
        url: final_url,
        status: result.status_code,
        content,
        last_modified: None,
    })
}

#[async_trait]
impl Renderer for FirecrawlRenderer {
    #[instrument(skip(self, options), fields(url = %url))]
    async fn render(&self, url: &str, options: &FetchOptions) -> Result<RenderedPage> {
        let result = self
            .cli
            .scrape(url, &ScrapeOptions::from_fetch_options(options))
            .await?;
        page_from_result(url, result)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    const URL: &str = "https://example.com/docs";

    #[test]
    fn test_scrape_options_builder_chain() {
        let opts = ScrapeOptions::new()
            .with_timeout(Duration::from_secs(45))
            .with_wait_for(500);
        assert_eq!(opts.timeout, Some(Duration::from_secs(45)));
        assert_eq!(opts.wait_for_ms, Some(500));
    }

    #[test]
    fn test_scrape_options_follow_wait_condition() {
        let mut fetch = FetchOptions {
            wait: WaitCondition::Delay { millis: 250 },
            ..FetchOptions::default()
        };
        assert_eq!(ScrapeOptions::from_fetch_options(&fetch).wait_for_ms, Some(250));

        fetch.wait = WaitCondition::None;
        let opts = ScrapeOptions::from_fetch_options(&fetch);
        assert_eq!(opts.wait_for_ms, None);
        assert_eq!(opts.timeout, Some(Duration::from_secs(30)));

        fetch.wait = WaitCondition::default();
        assert_eq!(ScrapeOptions::from_fetch_options(&fetch).wait_for_ms, Some(15_000));
    }

    #[test]
    fn test_scrape_result_deserialize() {
        let json = r#"{"rawHtml": "<main>x</main>", "url": "https://example.com/docs", "statusCode": 200}"#;
        let result: ScrapeResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.raw_html.as_deref(), Some("<main>x</main>"));
        assert_eq!(result.status_code, Some(200));
        assert!(result.markdown.is_none());
    }

    #[test]
    fn test_page_prefers_html() {
        let result = ScrapeResult {
            raw_html: Some("<main>raw</main>".into()),
            markdown: Some("# md".into()),
            ..ScrapeResult::default()
        };
        let page = page_from_result(URL, result).unwrap();
        assert_eq!(page.content, RawContent::Html("<main>raw</main>".into()));
        assert_eq!(page.url, URL);
    }

    #[test]
    fn test_blank_raw_html_falls_back_to_html() {
        let result = ScrapeResult {
            raw_html: Some("  ".into()),
            html: Some("<main>clean</main>".into()),
            markdown: Some("# md".into()),
            ..ScrapeResult::default()
        };
        let page = page_from_result(URL, result).unwrap();
        assert_eq!(page.content, RawContent::Html("<main>clean</main>".into()));
    }

    #[test]
    fn test_markdown_only_becomes_structured() {
        let result = ScrapeResult {
            markdown: Some("# Title\n\nBody".into()),
            title: Some("Title".into()),
            ..ScrapeResult::default()
        };
        match page_from_result(URL, result).unwrap().content {
            RawContent::Structured(value) => {
                assert_eq!(value["title"], "Title");
                assert_eq!(value["content"], "# Title\n\nBody");
            },
            other => panic!("expected structured content, got {other:?}"),
        }
    }

    #[test]
    fn test_error_status_maps_to_fetch_error() {
        let result = ScrapeResult {
            raw_html: Some("<p>nope</p>".into()),
            status_code: Some(404),
            ..ScrapeResult::default()
        };
        match page_from_result(URL, result) {
            Err(Error::Fetch { reason, status, .. }) => {
                assert_eq!(reason, "not found");
                assert_eq!(status, Some(404));
            },
            other => panic!("expected fetch error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_result_is_no_content() {
        let err = page_from_result(URL, ScrapeResult::default()).unwrap_err();
        assert_eq!(err.source_url(), Some(URL));
    }
}
