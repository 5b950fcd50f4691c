//! End-to-end pipeline scenarios against in-memory and mock-HTTP renderers.
#![allow(clippy::unwrap_used, clippy::panic, missing_docs)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use docsmith_core::config::{NormalizeConfig, ProductConfig};
use docsmith_core::{
    Config, DocumentationOrchestrator, Error, ErrorCode, FetchOptions, Fetcher, HttpRenderer,
    Normalizer, RawContent, RenderedPage, Renderer, Result, RetryPolicy, SourceRequest,
    SourceResolver, parse_front_matter,
};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CUSTOMERS: &str = "https://docs.stripe.com/api/customers";
const PAYMENT_INTENTS: &str = "https://docs.stripe.com/api/payment_intents";

/// Serves fixed responses per URL and counts every render call.
#[derive(Default)]
struct StaticRenderer {
    responses: HashMap<String, std::result::Result<RawContent, u16>>,
    calls: AtomicUsize,
}

impl StaticRenderer {
    fn structured(mut self, url: &str, value: serde_json::Value) -> Self {
        self.responses
            .insert(url.to_string(), Ok(RawContent::Structured(value)));
        self
    }

    fn status(mut self, url: &str, status: u16) -> Self {
        self.responses.insert(url.to_string(), Err(status));
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Renderer for StaticRenderer {
    async fn render(&self, url: &str, _options: &FetchOptions) -> Result<RenderedPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.responses.get(url) {
            Some(Ok(RawContent::Structured(value))) => {
                Ok(RenderedPage::structured(url, value.clone()))
            },
            Some(Ok(RawContent::Html(html))) => Ok(RenderedPage::html(url, html.clone())),
            Some(Err(status)) => Err(Error::Fetch {
                url: url.to_string(),
                reason: format!("HTTP {status}"),
                status: Some(*status),
            }),
            None => Err(Error::Fetch {
                url: url.to_string(),
                reason: "not found".into(),
                status: Some(404),
            }),
        }
    }
}

fn customers_payload() -> serde_json::Value {
    json!({
        "title": "Customers",
        "description": "Customer objects let you perform recurring charges and track multiple charges for the same customer.",
        "endpoints": [{
            "method": "POST",
            "path": "/v1/customers",
            "description": "Creates a new customer object.",
            "parameters": [
                {"name": "email", "type": "string", "required": false, "description": "Customer's email address."}
            ]
        }]
    })
}

fn payment_intents_payload() -> serde_json::Value {
    json!({
        "title": "Payment Intents",
        "lastUpdated": "2024-02-01",
        "headings": ["Overview"],
        "content": ["A PaymentIntent guides you through the process of collecting a payment from your customer, tracking every state change."]
    })
}

fn orchestrator(renderer: Arc<StaticRenderer>) -> DocumentationOrchestrator<StaticRenderer> {
    DocumentationOrchestrator::new(
        SourceResolver::new(),
        Fetcher::new(renderer, RetryPolicy::new(3, Duration::ZERO)),
        Normalizer::new(NormalizeConfig::default()).unwrap(),
    )
}

fn stripe_request() -> SourceRequest {
    SourceRequest::from_inbound("stripe", "Customer and payment endpoints").unwrap()
}

#[tokio::test]
async fn both_sources_succeed() {
    let renderer = Arc::new(
        StaticRenderer::default()
            .structured(CUSTOMERS, customers_payload())
            .structured(PAYMENT_INTENTS, payment_intents_payload()),
    );
    let document = orchestrator(Arc::clone(&renderer))
        .generate(&stripe_request())
        .await
        .unwrap();

    assert_eq!(document.sections.len(), 2);
    assert_eq!(document.markdown.matches("\n## Customers\n").count(), 1);
    assert_eq!(document.markdown.matches("\n## Payment Intents\n").count(), 1);
    assert!(document.markdown.contains("1. [Customers](#customers)"));
    assert!(document.markdown.contains("2. [Payment Intents](#payment-intents)"));
    assert!(!document.markdown.contains("\n3. ["));
    assert!(document.markdown.contains("### POST /v1/customers"));
    assert!(document.markdown.contains("| Last Updated: 2024-02-01"));

    let front = parse_front_matter(&document.markdown).unwrap();
    assert_eq!(front.product, "stripe");
    assert_eq!(front.sources, vec![CUSTOMERS, PAYMENT_INTENTS]);
    assert_eq!(front.requirements.as_deref(), Some("Customer and payment endpoints"));
    assert_eq!(renderer.calls(), 2);
}

#[tokio::test]
async fn first_source_missing_second_succeeds() {
    let renderer = Arc::new(
        StaticRenderer::default()
            .status(CUSTOMERS, 404)
            .structured(PAYMENT_INTENTS, payment_intents_payload()),
    );
    let document = orchestrator(Arc::clone(&renderer))
        .generate(&stripe_request())
        .await
        .unwrap();

    assert_eq!(document.sections.len(), 1);
    assert_eq!(document.sections[0].url, PAYMENT_INTENTS);
    assert!(document.markdown.contains("1. [Payment Intents](#payment-intents)"));
    assert!(!document.markdown.contains("## Customers"));

    // Dropped sources still appear in the front matter.
    let front = parse_front_matter(&document.markdown).unwrap();
    assert_eq!(front.sources, vec![CUSTOMERS, PAYMENT_INTENTS]);

    // 404 is not retried.
    assert_eq!(renderer.calls(), 2);
}

#[tokio::test]
async fn both_sources_fail() {
    let renderer = Arc::new(
        StaticRenderer::default()
            .status(CUSTOMERS, 404)
            .status(PAYMENT_INTENTS, 403),
    );
    let err = orchestrator(renderer)
        .generate(&stripe_request())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NoContent { url: None }));
    let report = err.report();
    assert_eq!(report.code, ErrorCode::NoContent);
    assert!(report.source_url.is_none());
}

#[tokio::test]
async fn unknown_product_makes_no_calls() {
    let renderer = Arc::new(StaticRenderer::default());
    let request = SourceRequest::new("unknown-product").unwrap();
    let err = orchestrator(Arc::clone(&renderer))
        .generate(&request)
        .await
        .unwrap_err();

    match err {
        Error::InvalidSource { product, known, .. } => {
            assert_eq!(product, "unknown-product");
            assert!(known.contains(&"stripe".to_string()));
        },
        other => panic!("expected InvalidSource, got {other:?}"),
    }
    assert_eq!(renderer.calls(), 0);
}

#[tokio::test]
async fn blank_request_fields_are_invalid_input() {
    let err = SourceRequest::from_inbound("  ", "anything").unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidInput);
    let err = SourceRequest::from_inbound("stripe", "\n\t").unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidInput);
}

#[test]
fn heuristic_fallback_without_content_root() {
    let html = r"<html><body>
        <div class='wrapper'><div>Contacts API</div>
        <div>Contacts store information about the individuals your business interacts with.</div>
        <div>GET /crm/v3/objects/contacts</div>
        <div>Read a page of contacts, controlling which properties come back.</div>
        <div>Parameters</div>
        <div>limit - the maximum number of results to display per page.</div></div>
    </body></html>";
    let normalizer = Normalizer::new(NormalizeConfig::default()).unwrap();
    let markdown = normalizer
        .normalize(&RawContent::Html(html.to_string()), "https://developers.example.com")
        .unwrap();

    assert!(markdown.contains("### GET /crm/v3/objects/contacts"));
    assert!(markdown.contains("#### Parameters"));
    assert!(markdown.contains("Contacts store information"));
}

#[tokio::test]
async fn http_pipeline_against_mock_server() {
    let server = MockServer::start().await;
    let body = "<html><head><title>Widgets</title></head><body><main>\
        <h1>Widgets</h1>\
        <p>Widgets are the core resource of the Acme API. Every widget belongs to exactly \
        one workspace and can be listed, created and archived.</p>\
        <pre><code class=\"language-bash\">curl https://api.acme.dev/v1/widgets</code></pre>\
        </main></body></html>";
    Mock::given(method("GET"))
        .and(path("/widgets"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .insert_header("last-modified", "Tue, 05 Mar 2024 10:00:00 GMT")
                .set_body_string(body),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = Config::default();
    config.fetch.base_delay_ms = 0;
    config.products = BTreeMap::from([(
        "acme".to_string(),
        ProductConfig {
            name: Some("Acme".into()),
            aliases: vec![],
            urls: vec![format!("{}/gone", server.uri()), format!("{}/widgets", server.uri())],
        },
    )]);

    let renderer =
        Arc::new(HttpRenderer::new(&config.fetch_options(), &config.fetch.user_agent).unwrap());
    let orchestrator = DocumentationOrchestrator::from_config(&config, renderer).unwrap();
    let document = orchestrator
        .generate(&SourceRequest::new("acme").unwrap())
        .await
        .unwrap();

    assert_eq!(document.sections.len(), 1);
    let section = &document.sections[0];
    assert_eq!(section.title, "Widgets");
    assert_eq!(
        section.last_updated.as_deref(),
        Some("Tue, 05 Mar 2024 10:00:00 GMT")
    );
    assert!(section.content.contains("```bash\ncurl https://api.acme.dev/v1/widgets\n```"));
    assert_eq!(document.metadata.sources.len(), 2);
}
