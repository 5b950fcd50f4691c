//! Fetch layer: renderer boundary, HTTP renderer and retry policy.
//!
//! A [`Renderer`] turns a URL into a [`RenderedPage`]. The [`Fetcher`] wraps
//! one renderer with bounded retries: recoverable failures (connection
//! errors, timeouts, 5xx, 408, 429) are retried after `base × attempt`;
//! 404 and 403 fail immediately.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::LAST_MODIFIED;
use reqwest::{Client, StatusCode, redirect};
use scraper::{Html, Selector};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::types::{FetchOptions, RawContent, RenderedPage, WaitCondition};
use crate::{Error, Result};

/// Capability that renders a URL into raw content.
///
/// A renderer instance is scoped to one generation request: the orchestrator
/// acquires it up front and calls [`Renderer::release`] once every fetch for
/// the request has completed.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Render `url` honouring `options`.
    async fn render(&self, url: &str, options: &FetchOptions) -> Result<RenderedPage>;

    /// Release any resources held for the request.
    async fn release(&self) {}
}

/// Plain HTTP renderer backed by `reqwest`.
///
/// Returns the response body as HTML. Pages that need a browser to produce
/// their content should go through a different renderer.
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    /// Build a renderer whose redirect cap comes from `options`.
    pub fn new(options: &FetchOptions, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(options.timeout)
            .redirect(redirect::Policy::limited(options.max_redirects))
            .user_agent(user_agent)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(Error::Network)?;
        Ok(Self { client })
    }

    fn request_error(url: &str, err: &reqwest::Error) -> Error {
        let reason = if err.is_timeout() {
            "request timed out".to_string()
        } else if err.is_redirect() {
            "too many redirects".to_string()
        } else {
            err.to_string()
        };
        Error::Fetch {
            url: url.to_string(),
            reason,
            status: err.status().map(|s| s.as_u16()),
        }
    }
}

/// Map a non-success HTTP status onto a fetch error.
pub fn status_error(url: &str, status: StatusCode) -> Error {
    let reason = match status {
        StatusCode::NOT_FOUND => "not found".to_string(),
        StatusCode::FORBIDDEN => "access denied".to_string(),
        other => format!("HTTP {other}"),
    };
    Error::Fetch {
        url: url.to_string(),
        reason,
        status: Some(status.as_u16()),
    }
}

impl HttpRenderer {
    async fn get(&self, url: &str, options: &FetchOptions) -> Result<RenderedPage> {
        let mut request = self.client.get(url).timeout(options.timeout);
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| Self::request_error(url, &e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(url, status));
        }

        let final_url = response.url().to_string();
        let last_modified = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|e| Self::request_error(url, &e))?;

        info!("Fetched {} bytes from {}", body.len(), url);
        Ok(RenderedPage {
            url: final_url,
            status: Some(status.as_u16()),
            content: RawContent::Html(body),
            last_modified,
        })
    }

    /// Re-request `url` until `selector` holds enough text or `timeout_ms`
    /// has passed. The last page is returned either way.
    async fn get_when_ready(
        &self,
        url: &str,
        options: &FetchOptions,
        selector: &str,
        min_text_len: usize,
        timeout_ms: u64,
    ) -> Result<RenderedPage> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        let mut polls = 1_u32;
        loop {
            let page = self.get(url, options).await?;
            let ready = matches!(
                &page.content,
                RawContent::Html(body) if content_ready(body, selector, min_text_len)
            );
            let now = Instant::now();
            if ready || now >= deadline {
                if !ready {
                    debug!(url, selector, polls, "Content not ready before wait timeout");
                }
                return Ok(page);
            }
            tokio::time::sleep(READY_POLL_INTERVAL.min(deadline - now)).await;
            polls += 1;
        }
    }
}

/// Pause between readiness polls of the HTTP renderer.
pub const READY_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[async_trait]
impl Renderer for HttpRenderer {
    async fn render(&self, url: &str, options: &FetchOptions) -> Result<RenderedPage> {
        match &options.wait {
            WaitCondition::None => self.get(url, options).await,
            WaitCondition::Delay { millis } => {
                let page = self.get(url, options).await?;
                tokio::time::sleep(Duration::from_millis(*millis)).await;
                Ok(page)
            },
            WaitCondition::Selector {
                selector,
                min_text_len,
                timeout_ms,
            } => {
                self.get_when_ready(url, options, selector, *min_text_len, *timeout_ms)
                    .await
            },
        }
    }
}

/// Whether `selector`'s text in `html` exceeds `min_text_len` characters.
///
/// An unparsable selector never blocks.
pub fn content_ready(html: &str, selector: &str, min_text_len: usize) -> bool {
    let Ok(selector) = Selector::parse(selector) else {
        return true;
    };
    let document = Html::parse_document(html);
    document.select(&selector).any(|element| {
        element.text().map(|t| t.trim().chars().count()).sum::<usize>() > min_text_len
    })
}

/// Attempt budget and linear backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// Policy with `max_attempts` total attempts (at least one).
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Total attempts, including the first.
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after the 1-based `attempt` failed.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000))
    }
}

/// Renderer plus retry policy.
///
/// Each call to [`Fetcher::fetch`] is independent; the fetcher holds no
/// mutable state.
pub struct Fetcher<R: ?Sized> {
    renderer: Arc<R>,
    policy: RetryPolicy,
}

impl<R: ?Sized> Clone for Fetcher<R> {
    fn clone(&self) -> Self {
        Self {
            renderer: Arc::clone(&self.renderer),
            policy: self.policy,
        }
    }
}

impl<R: Renderer + ?Sized> Fetcher<R> {
    /// Wrap `renderer` with `policy`.
    pub const fn new(renderer: Arc<R>, policy: RetryPolicy) -> Self {
        Self { renderer, policy }
    }

    /// The underlying renderer.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// The active retry policy.
    pub const fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Render `url`, retrying recoverable failures.
    ///
    /// The returned error is always an [`Error::Fetch`] carrying `url`.
    #[instrument(skip(self, options), fields(url = %url))]
    pub async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<RenderedPage> {
        let mut attempt = 1;
        loop {
            match self.renderer.render(url, options).await {
                Ok(page) => {
                    if attempt > 1 {
                        info!(attempt, "Fetched {} after retry", url);
                    }
                    return Ok(page);
                },
                Err(err) if err.is_recoverable() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Fetch attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                },
                Err(err) => {
                    debug!(attempt, error = %err, "Giving up on {}", url);
                    return Err(exhausted(url, err, attempt));
                },
            }
        }
    }
}

fn exhausted(url: &str, err: Error, attempts: u32) -> Error {
    let suffix = if attempts > 1 {
        format!(" (after {attempts} attempts)")
    } else {
        String::new()
    };
    match err {
        Error::Fetch { reason, status, .. } => Error::Fetch {
            url: url.to_string(),
            reason: format!("{reason}{suffix}"),
            status,
        },
        other => Error::Fetch {
            url: url.to_string(),
            reason: format!("{other}{suffix}"),
            status: None,
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1))
    }

    fn test_options() -> FetchOptions {
        FetchOptions {
            wait: WaitCondition::None,
            timeout: Duration::from_secs(5),
            ..FetchOptions::default()
        }
    }

    fn http_fetcher() -> Fetcher<HttpRenderer> {
        let renderer = HttpRenderer::new(&test_options(), "docsmith-test").unwrap();
        Fetcher::new(Arc::new(renderer), fast_policy())
    }

    struct ScriptedRenderer {
        responses: Mutex<VecDeque<Result<RenderedPage>>>,
        calls: AtomicUsize,
    }

    impl ScriptedRenderer {
        fn new(responses: Vec<Result<RenderedPage>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Renderer for ScriptedRenderer {
        async fn render(&self, url: &str, _options: &FetchOptions) -> Result<RenderedPage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(RenderedPage::html(url, "<p>fallback</p>")))
        }
    }

    fn fetch_err(status: Option<u16>) -> Result<RenderedPage> {
        Err(Error::Fetch {
            url: "https://example.com".into(),
            reason: "boom".into(),
            status,
        })
    }

    #[test]
    fn test_retry_delay_grows_linearly() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(3000));
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts(), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let renderer = Arc::new(ScriptedRenderer::new(vec![
            fetch_err(None),
            fetch_err(Some(503)),
            Ok(RenderedPage::html("https://example.com", "<p>ok</p>")),
        ]));
        let fetcher = Fetcher::new(Arc::clone(&renderer), fast_policy());

        let page = fetcher
            .fetch("https://example.com", &test_options())
            .await
            .unwrap();
        assert_eq!(page.content, RawContent::Html("<p>ok</p>".into()));
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_404_is_not_retried() {
        let renderer = Arc::new(ScriptedRenderer::new(vec![fetch_err(Some(404))]));
        let fetcher = Fetcher::new(Arc::clone(&renderer), fast_policy());

        let err = fetcher
            .fetch("https://example.com/missing", &test_options())
            .await
            .unwrap_err();
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(err.source_url(), Some("https://example.com/missing"));
    }

    #[tokio::test]
    async fn test_non_fetch_errors_are_wrapped_with_url() {
        let renderer = Arc::new(ScriptedRenderer::new(vec![
            Err(Error::Timeout("render".into())),
            Err(Error::Timeout("render".into())),
            Err(Error::Timeout("render".into())),
        ]));
        let fetcher = Fetcher::new(Arc::clone(&renderer), fast_policy());

        match fetcher.fetch("https://example.com/slow", &test_options()).await {
            Err(Error::Fetch { url, reason, status }) => {
                assert_eq!(url, "https://example.com/slow");
                assert!(reason.contains("after 3 attempts"), "{reason}");
                assert_eq!(status, None);
            },
            other => panic!("expected fetch error, got {other:?}"),
        }
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_http_renderer_returns_body_and_last_modified() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/docs"))
            .and(header("x-docs-key", "abc"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<main><h1>Docs</h1></main>")
                    .insert_header("Last-Modified", "Wed, 21 Oct 2015 07:28:00 GMT"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut options = test_options();
        options.headers.insert("x-docs-key".into(), "abc".into());
        let renderer = HttpRenderer::new(&options, "docsmith-test")?;
        let url = format!("{}/docs", server.uri());
        let page = renderer.render(&url, &options).await?;

        assert_eq!(page.status, Some(200));
        assert_eq!(
            page.last_modified.as_deref(),
            Some("Wed, 21 Oct 2015 07:28:00 GMT")
        );
        assert!(matches!(page.content, RawContent::Html(ref body) if body.contains("<h1>Docs</h1>")));
        Ok(())
    }

    #[tokio::test]
    async fn test_http_404_short_circuits() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/gone", server.uri());
        match http_fetcher().fetch(&url, &test_options()).await {
            Err(Error::Fetch { reason, status, .. }) => {
                assert_eq!(reason, "not found");
                assert_eq!(status, Some(404));
            },
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_403_is_access_denied_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/private"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/private", server.uri());
        match http_fetcher().fetch(&url, &test_options()).await {
            Err(Error::Fetch { reason, status, .. }) => {
                assert_eq!(reason, "access denied");
                assert_eq!(status, Some(403));
            },
            other => panic!("expected access denied, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_5xx_is_retried_until_exhausted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let url = format!("{}/flaky", server.uri());
        let err = http_fetcher().fetch(&url, &test_options()).await.unwrap_err();
        assert!(matches!(err, Error::Fetch { status: Some(503), .. }));
    }

    #[tokio::test]
    async fn test_http_5xx_then_success() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/recovering"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/recovering"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>back</p>"))
            .mount(&server)
            .await;

        let url = format!("{}/recovering", server.uri());
        let page = http_fetcher().fetch(&url, &test_options()).await?;
        assert_eq!(page.content, RawContent::Html("<p>back</p>".into()));
        Ok(())
    }

    #[tokio::test]
    async fn test_http_timeout_is_fetch_error() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("slow")
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let options = FetchOptions {
            timeout: Duration::from_millis(100),
            ..test_options()
        };
        let renderer = HttpRenderer::new(&options, "docsmith-test")?;
        let fetcher = Fetcher::new(Arc::new(renderer), RetryPolicy::new(1, Duration::ZERO));

        let url = format!("{}/slow", server.uri());
        match fetcher.fetch(&url, &options).await {
            Err(Error::Fetch { reason, status, .. }) => {
                assert_eq!(reason, "request timed out");
                assert_eq!(status, None);
            },
            other => panic!("expected timeout, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_http_renderer_polls_until_content_ready() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/app"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<main>Loading</main>"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/app"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<main>The reference content has rendered.</main>"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let options = FetchOptions {
            wait: WaitCondition::Selector {
                selector: "main".into(),
                min_text_len: 20,
                timeout_ms: 5_000,
            },
            ..test_options()
        };
        let renderer = HttpRenderer::new(&options, "docsmith-test")?;
        let page = renderer
            .render(&format!("{}/app", server.uri()), &options)
            .await?;
        assert!(matches!(page.content, RawContent::Html(ref body) if body.contains("has rendered")));
        Ok(())
    }

    #[tokio::test]
    async fn test_http_renderer_returns_last_page_after_wait_timeout() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/app"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<main>Loading</main>"))
            .mount(&server)
            .await;

        let options = FetchOptions {
            wait: WaitCondition::Selector {
                selector: "main".into(),
                min_text_len: 20,
                timeout_ms: 700,
            },
            ..test_options()
        };
        let renderer = HttpRenderer::new(&options, "docsmith-test")?;
        let page = renderer
            .render(&format!("{}/app", server.uri()), &options)
            .await?;
        assert!(matches!(page.content, RawContent::Html(ref body) if body.contains("Loading")));

        let requests = server.received_requests().await.unwrap_or_default();
        assert!(requests.len() >= 2, "polled {} times", requests.len());
        Ok(())
    }

    #[test]
    fn test_content_ready_measures_selector_text() {
        let long = format!("<main>{}</main>", "word ".repeat(40));
        assert!(content_ready(&long, "main, article", 100));
        assert!(!content_ready("<main>short</main>", "main", 100));
        assert!(!content_ready("<div>no main here</div>", "main", 0));
        assert!(content_ready("<div></div>", "[[invalid", 100));
    }
}
