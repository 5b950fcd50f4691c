//! Configuration management for docsmith.
//!
//! Configuration is a single TOML file. Every section has defaults, so a
//! missing file (or a missing section) is never an error.
//!
//! ## Lookup order
//!
//! 1. An explicit path (`--config` / `DOCSMITH_CONFIG`)
//! 2. The platform config directory (`config.toml`)
//! 3. Built-in defaults
//!
//! `DOCSMITH_*` environment variables are applied on top of whatever was
//! loaded.
//!
//! ## Example
//!
//! ```toml
//! [fetch]
//! max_attempts = 5
//! wait = { kind = "delay", millis = 500 }
//!
//! [harvest]
//! concurrency = 8
//!
//! [products.acme]
//! name = "Acme API"
//! urls = ["https://docs.acme.dev/api/widgets"]
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::fetcher::RetryPolicy;
use crate::types::{FetchOptions, WaitCondition};
use crate::{Error, Result};

/// Lowest accepted harvest concurrency.
pub const MIN_CONCURRENCY: usize = 1;
/// Highest accepted harvest concurrency.
pub const MAX_CONCURRENCY: usize = 50;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Fetch and retry settings.
    pub fetch: FetchConfig,
    /// Fan-out settings.
    pub harvest: HarvestConfig,
    /// Normalizer selector lists and thresholds.
    pub normalize: NormalizeConfig,
    /// Output settings.
    pub output: OutputConfig,
    /// Product table entries, merged over the built-in table by id.
    pub products: BTreeMap<String, ProductConfig>,
}

/// `[fetch]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Attempts per URL, including the first.
    pub max_attempts: u32,
    /// Base inter-attempt delay; attempt `n` waits `base × n`.
    pub base_delay_ms: u64,
    /// Timeout for a single render.
    pub timeout_secs: u64,
    /// Redirect cap.
    pub max_redirects: usize,
    /// User agent for the HTTP renderer.
    pub user_agent: String,
    /// Extra request headers.
    pub headers: BTreeMap<String, String>,
    /// Readiness condition.
    pub wait: WaitCondition,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            timeout_secs: 30,
            max_redirects: 5,
            user_agent: format!("docsmith/{}", env!("CARGO_PKG_VERSION")),
            headers: BTreeMap::new(),
            wait: WaitCondition::default(),
        }
    }
}

/// `[harvest]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Maximum URLs processed at once.
    pub concurrency: usize,
    /// Upper bound on one URL's fetch, extract and normalize chain, retries
    /// included.
    pub per_source_timeout_secs: u64,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            per_source_timeout_secs: 120,
        }
    }
}

impl HarvestConfig {
    /// Concurrency clamped to `MIN_CONCURRENCY..=MAX_CONCURRENCY`.
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY)
    }
}

/// `[normalize]` section.
///
/// The selector lists are data: each tier of the normalizer reads them in
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Fragments with fewer characters than this count as a scraping failure.
    pub min_content_chars: usize,
    /// Content root candidates, first match wins.
    pub content_roots: Vec<String>,
    /// Tags removed outright.
    pub denylist_tags: Vec<String>,
    /// Elements whose class attribute contains any of these are removed.
    pub denylist_class_markers: Vec<String>,
    /// Selectors that mark an API endpoint block.
    pub endpoint_markers: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            min_content_chars: 100,
            content_roots: strings(&[
                "main",
                "article",
                "[role='main']",
                ".documentation-content",
                ".docs-content",
                ".api-content",
                ".api-reference",
                ".markdown-body",
                "#content",
                ".content",
            ]),
            denylist_tags: strings(&[
                "script", "style", "noscript", "template", "iframe", "svg", "nav", "header",
                "footer", "button", "form",
            ]),
            denylist_class_markers: strings(&[
                "cookie",
                "consent",
                "navigation",
                "navbar",
                "sidebar",
                "breadcrumb",
                "advert",
                "promo",
            ]),
            endpoint_markers: strings(&[
                "[data-endpoint]",
                "[data-testid='endpoint']",
                ".api-endpoint",
                ".endpoint",
                ".api-method",
            ]),
        }
    }
}

/// `[output]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory generated documents are written to.
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./docs"),
        }
    }
}

/// `[products.<id>]` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductConfig {
    /// Display name.
    pub name: Option<String>,
    /// Extra lookup keys.
    pub aliases: Vec<String>,
    /// Documentation URLs in crawl order.
    pub urls: Vec<String>,
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, the platform config file is
    /// used when present and defaults otherwise. Environment overrides are
    /// applied last.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_path(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_path(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env_overrides_with(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a configuration file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config {}: {e}", path.display())))
    }

    /// Write the configuration as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {e}")))?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;
        fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write config: {e}")))?;
        Ok(())
    }

    /// Platform config file location.
    ///
    /// - Linux: `~/.config/docsmith/config.toml`
    /// - macOS: `~/Library/Application Support/dev.outfitter.docsmith/config.toml`
    /// - Windows: `%APPDATA%\outfitter\docsmith\config\config.toml`
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "outfitter", "docsmith")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Apply `DOCSMITH_*` overrides read through `lookup`.
    pub fn apply_env_overrides_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("DOCSMITH_OUTPUT_DIR") {
            self.output.dir = PathBuf::from(dir);
        }
        if let Some(value) = lookup("DOCSMITH_MAX_ATTEMPTS") {
            self.fetch.max_attempts = parse_env("DOCSMITH_MAX_ATTEMPTS", &value)?;
        }
        if let Some(value) = lookup("DOCSMITH_CONCURRENCY") {
            self.harvest.concurrency = parse_env("DOCSMITH_CONCURRENCY", &value)?;
        }
        if let Some(value) = lookup("DOCSMITH_TIMEOUT_SECS") {
            self.fetch.timeout_secs = parse_env("DOCSMITH_TIMEOUT_SECS", &value)?;
        }
        Ok(())
    }

    /// Options handed to the renderer on every fetch.
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            headers: self.fetch.headers.clone(),
            wait: self.fetch.wait.clone(),
            timeout: Duration::from_secs(self.fetch.timeout_secs),
            max_redirects: self.fetch.max_redirects,
        }
    }

    /// Retry policy for the fetch layer.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.fetch.max_attempts,
            Duration::from_millis(self.fetch.base_delay_ms),
        )
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("Invalid value for {key}: '{value}'")))
}
