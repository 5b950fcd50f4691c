//! Turning raw page content into a markdown fragment.
//!
//! HTML goes through three tiers and the first that applies is used:
//!
//! 1. **Endpoints**: blocks matching an endpoint marker are extracted with the
//!    [`extract`](crate::extract) engine and rendered as method/path headings,
//!    parameter tables and example code. Applies whenever a marker matched.
//! 2. **Blocks**: headings, paragraphs, lists, tables, code and callouts under
//!    the content root, with loose text flattened into paragraphs. Applies
//!    when the recognized shapes alone reach the minimum content length.
//! 3. **Heuristic**: the content root's plain text, split at HTTP-method and
//!    section tokens.
//!
//! The chosen fragment must reach the minimum content length or the source
//! fails with [`Error::NoContent`].
//!
//! Before any tier runs, denylisted elements (scripts, navigation, cookie
//! banners, ...) are removed and a content root is chosen from the configured
//! candidates. Structured content from the renderer skips the tiers and is
//! rendered directly.

mod blocks;
mod clean;
mod endpoints;
mod heuristic;
pub mod markdown;

use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::debug;

pub use clean::clean_text;
pub use endpoints::{EndpointView, ParameterView, endpoint_config};

use crate::config::NormalizeConfig;
use crate::extract::Extractor;
use crate::types::{DocumentationSource, RawContent, RenderedPage, UNTITLED};
use crate::{Error, Result};

/// Fragment plus the page metadata found alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPage {
    /// Page title.
    pub title: String,
    /// Markdown fragment.
    pub markdown: String,
    /// Last-modified timestamp found in the page.
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    Endpoints,
    Blocks,
    Heuristic,
}

impl Tier {
    const fn name(self) -> &'static str {
        match self {
            Self::Endpoints => "endpoints",
            Self::Blocks => "blocks",
            Self::Heuristic => "heuristic",
        }
    }
}

struct PageSelectors {
    h1: Selector,
    title: Selector,
    body: Selector,
    last_updated: Vec<(Selector, &'static str)>,
}

impl PageSelectors {
    fn new() -> Result<Self> {
        let parse = |s: &str| {
            Selector::parse(s).map_err(|e| Error::Processing(format!("invalid selector '{s}': {e}")))
        };
        Ok(Self {
            h1: parse("h1")?,
            title: parse("title")?,
            body: parse("body")?,
            last_updated: vec![
                (parse("meta[name='last-modified']")?, "content"),
                (parse("meta[property='article:modified_time']")?, "content"),
                (parse("time[datetime]")?, "datetime"),
            ],
        })
    }
}

/// Normalizes raw content into markdown fragments.
///
/// Holds only compiled selectors, so one instance can be shared across
/// concurrent sources.
pub struct Normalizer {
    config: NormalizeConfig,
    content_roots: Vec<Selector>,
    endpoint_extractors: Vec<Extractor>,
    page: PageSelectors,
}

impl std::fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Normalizer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Normalizer {
    /// Compile the configured selector lists.
    ///
    /// Fails with [`Error::Extraction`] when a configured selector is not
    /// valid CSS.
    pub fn new(config: NormalizeConfig) -> Result<Self> {
        let content_roots = config
            .content_roots
            .iter()
            .map(|s| {
                Selector::parse(s)
                    .map_err(|e| Error::Extraction(format!("invalid content root '{s}': {e}")))
            })
            .collect::<Result<_>>()?;
        let endpoint_extractors = config
            .endpoint_markers
            .iter()
            .map(|marker| Extractor::compile(&endpoint_config(marker)))
            .collect::<Result<_>>()?;

        Ok(Self {
            config,
            content_roots,
            endpoint_extractors,
            page: PageSelectors::new()?,
        })
    }

    /// Active configuration.
    pub const fn config(&self) -> &NormalizeConfig {
        &self.config
    }

    /// Markdown fragment for `raw`.
    ///
    /// Fails with [`Error::NoContent`] carrying `source_url` when no tier
    /// yields at least `min_content_chars` characters.
    pub fn normalize(&self, raw: &RawContent, source_url: &str) -> Result<String> {
        self.normalize_page(raw, source_url).map(|page| page.markdown)
    }

    /// Markdown fragment plus title and last-updated metadata.
    pub fn normalize_page(&self, raw: &RawContent, source_url: &str) -> Result<NormalizedPage> {
        match raw {
            RawContent::Html(html) => self.normalize_html(html, source_url),
            RawContent::Structured(value) => self.normalize_structured(value, source_url),
        }
    }

    /// Normalize a rendered page into a section.
    ///
    /// The response's `Last-Modified` header fills in when the page itself
    /// carries no timestamp.
    pub fn process(&self, page: &RenderedPage, source_url: &str) -> Result<DocumentationSource> {
        let normalized = self.normalize_page(&page.content, source_url)?;
        Ok(DocumentationSource {
            url: source_url.to_string(),
            title: normalized.title,
            content: normalized.markdown,
            last_updated: normalized
                .last_updated
                .or_else(|| page.last_modified.clone()),
        })
    }

    fn normalize_html(&self, html: &str, source_url: &str) -> Result<NormalizedPage> {
        let mut document = Html::parse_document(html);
        let title = self.page_title(&document);
        let last_updated = self.page_last_updated(&document);

        let removed = clean::strip_denylisted(&mut document, &self.config);
        let root = self.content_root(&document);
        debug!(
            url = source_url,
            removed,
            root = root.value().name(),
            "Selected content root"
        );

        let (tier, fragment) = self.select_tier(root);
        let chars = markdown::visible_len(&fragment);
        debug!(url = source_url, tier = tier.name(), chars, "Normalizer tier result");
        if chars < self.config.min_content_chars {
            return Err(Error::NoContent {
                url: Some(source_url.to_string()),
            });
        }

        Ok(NormalizedPage {
            title,
            markdown: fragment,
            last_updated,
        })
    }

    fn normalize_structured(&self, value: &Value, source_url: &str) -> Result<NormalizedPage> {
        if !value.is_object() {
            return Err(Error::Parse(format!(
                "structured content for '{source_url}' is not an object"
            )));
        }

        let fragment = markdown::cleanup(&endpoints::render_structured(value));
        if markdown::visible_len(&fragment) < self.config.min_content_chars {
            return Err(Error::NoContent {
                url: Some(source_url.to_string()),
            });
        }

        Ok(NormalizedPage {
            title: endpoints::structured_title(value).unwrap_or_else(|| UNTITLED.to_string()),
            markdown: fragment,
            last_updated: endpoints::structured_last_updated(value),
        })
    }

    /// First tier that applies to `root`, with its cleaned fragment.
    ///
    /// Matched endpoint markers settle the page on the endpoint tier. Blocks
    /// are used once their recognized shapes reach the minimum length; the
    /// heuristic splitter takes everything else.
    fn select_tier(&self, root: ElementRef<'_>) -> (Tier, String) {
        let endpoints = self
            .endpoint_extractors
            .iter()
            .map(|extractor| endpoints::render_extracted(&extractor.extract(root)))
            .find(|fragment| !fragment.trim().is_empty());
        if let Some(fragment) = endpoints {
            return (Tier::Endpoints, markdown::cleanup(&fragment));
        }

        let blocks = blocks::render_blocks(root);
        if blocks.shaped_len >= self.config.min_content_chars {
            return (Tier::Blocks, markdown::cleanup(&blocks.markdown));
        }

        (
            Tier::Heuristic,
            markdown::cleanup(&heuristic::split(&clean::text_lines(root))),
        )
    }

    fn content_root<'a>(&self, document: &'a Html) -> ElementRef<'a> {
        self.content_roots
            .iter()
            .find_map(|selector| document.select(selector).next())
            .or_else(|| document.select(&self.page.body).next())
            .unwrap_or_else(|| document.root_element())
    }

    fn page_title(&self, document: &Html) -> String {
        [&self.page.h1, &self.page.title]
            .into_iter()
            .filter_map(|selector| document.select(selector).next())
            .map(|element| clean_text(&element.text().collect::<String>()))
            .find(|text| !text.is_empty())
            .unwrap_or_else(|| UNTITLED.to_string())
    }

    fn page_last_updated(&self, document: &Html) -> Option<String> {
        self.page.last_updated.iter().find_map(|(selector, attr)| {
            document
                .select(selector)
                .find_map(|element| element.value().attr(attr))
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        })
    }
}
