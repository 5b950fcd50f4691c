//! Product table and source resolution.
//!
//! Maps a product identifier to its ordered list of documentation URLs.
//! Lookups are case-insensitive and ignore surrounding whitespace; aliases
//! resolve to the same entry. Entries from the `[products]` config section
//! override built-ins with the same id.

use std::collections::BTreeMap;

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::ProductConfig;
use crate::{Error, Result};

const MAX_SUGGESTIONS: usize = 3;

/// A product and the pages that document it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductEntry {
    /// Canonical lowercase id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Alternate lookup keys.
    pub aliases: Vec<String>,
    /// Documentation URLs in crawl order.
    pub urls: Vec<String>,
}

impl ProductEntry {
    /// Create an entry with no aliases.
    pub fn new(id: &str, name: &str, urls: &[&str]) -> Self {
        Self {
            id: normalize_key(id),
            name: name.to_string(),
            aliases: Vec::new(),
            urls: urls.iter().map(|u| (*u).to_string()).collect(),
        }
    }

    /// Replace the alias list.
    #[must_use]
    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| normalize_key(a)).collect();
        self
    }

    fn matches(&self, key: &str) -> bool {
        self.id == key || self.aliases.iter().any(|a| a == key)
    }
}

impl std::fmt::Display for ProductEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

fn validate_url(product: &str, raw: &str) -> Result<()> {
    let parsed = Url::parse(raw)
        .map_err(|e| Error::Config(format!("Invalid URL '{raw}' for product '{product}': {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(Error::Config(format!(
            "Unsupported scheme '{scheme}' in '{raw}' for product '{product}'"
        ))),
    }
}

fn normalize_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn builtin_entries() -> Vec<ProductEntry> {
    vec![
        ProductEntry::new(
            "stripe",
            "Stripe",
            &[
                "https://docs.stripe.com/api/customers",
                "https://docs.stripe.com/api/payment_intents",
            ],
        ),
        ProductEntry::new(
            "hubspot",
            "HubSpot",
            &[
                "https://developers.hubspot.com/docs/api/overview",
                "https://developers.hubspot.com/docs/api/getting-started",
            ],
        )
        .with_aliases(&["hub-spot"]),
        ProductEntry::new(
            "openai",
            "OpenAI API",
            &[
                "https://platform.openai.com/docs/api-reference/chat",
                "https://platform.openai.com/docs/api-reference/embeddings",
            ],
        )
        .with_aliases(&["open-ai", "gpt"]),
        ProductEntry::new(
            "python",
            "Python Standard Library",
            &[
                "https://docs.python.org/3/library/datetime.html",
                "https://docs.python.org/3/library/json.html",
            ],
        )
        .with_aliases(&["py", "python3"]),
    ]
}

/// Resolves product ids to documentation URLs.
#[derive(Debug, Clone)]
pub struct SourceResolver {
    entries: Vec<ProductEntry>,
}

impl SourceResolver {
    /// Resolver over the built-in product table.
    pub fn new() -> Self {
        Self {
            entries: builtin_entries(),
        }
    }

    /// Resolver over exactly `entries`.
    pub fn from_entries(entries: Vec<ProductEntry>) -> Self {
        Self { entries }
    }

    /// Merge configured products over the current table.
    ///
    /// A configured id that already exists replaces that entry's URLs and,
    /// when given, its name; aliases are added. New ids are appended.
    ///
    /// Every configured URL must be an absolute `http` or `https` URL,
    /// otherwise [`Error::Config`] names the offending product.
    pub fn with_overrides(mut self, products: &BTreeMap<String, ProductConfig>) -> Result<Self> {
        for (id, product) in products {
            for raw in &product.urls {
                validate_url(id, raw)?;
            }
            let key = normalize_key(id);
            let aliases = product.aliases.iter().map(|a| normalize_key(a));
            if let Some(entry) = self.entries.iter_mut().find(|e| e.id == key) {
                entry.urls.clone_from(&product.urls);
                if let Some(name) = &product.name {
                    entry.name.clone_from(name);
                }
                for alias in aliases {
                    if !entry.aliases.contains(&alias) {
                        entry.aliases.push(alias);
                    }
                }
            } else {
                self.entries.push(ProductEntry {
                    name: product.name.clone().unwrap_or_else(|| id.clone()),
                    id: key,
                    aliases: aliases.collect(),
                    urls: product.urls.clone(),
                });
            }
        }
        Ok(self)
    }

    /// Ordered URL list for `product`.
    ///
    /// Fails with [`Error::InvalidSource`] when the product is unknown or has
    /// no URLs; the error lists every known id and close matches.
    pub fn resolve(&self, product: &str) -> Result<Vec<String>> {
        let key = normalize_key(product);
        match self.lookup(&key) {
            Some(entry) if !entry.urls.is_empty() => Ok(entry.urls.clone()),
            _ => Err(Error::InvalidSource {
                product: product.trim().to_string(),
                known: self.known_ids(),
                suggestions: self.suggest(&key),
            }),
        }
    }

    /// Entry for an id or alias.
    pub fn lookup(&self, product: &str) -> Option<&ProductEntry> {
        let key = normalize_key(product);
        self.entries.iter().find(|e| e.matches(&key))
    }

    /// Every known id, sorted.
    pub fn known_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.iter().map(|e| e.id.clone()).collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// All entries in table order.
    pub fn entries(&self) -> &[ProductEntry] {
        &self.entries
    }

    /// Ids whose id or aliases fuzzily match `query`, best first.
    pub fn suggest(&self, query: &str) -> Vec<String> {
        let query = normalize_key(query);
        if query.is_empty() {
            return Vec::new();
        }
        let matcher = SkimMatcherV2::default();

        let mut scored: Vec<(i64, &str)> = self
            .entries
            .iter()
            .filter_map(|entry| {
                std::iter::once(&entry.id)
                    .chain(entry.aliases.iter())
                    .filter_map(|key| matcher.fuzzy_match(key, &query))
                    .max()
                    .map(|score| (score, entry.id.as_str()))
            })
            .filter(|(score, _)| *score > 0)
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
        scored
            .into_iter()
            .take(MAX_SUGGESTIONS)
            .map(|(_, id)| id.to_string())
            .collect()
    }
}

impl Default for SourceResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_known_products_resolve_non_empty_and_stable() {
        let resolver = SourceResolver::new();
        for id in resolver.known_ids() {
            let first = resolver.resolve(&id).unwrap();
            let second = resolver.resolve(&id).unwrap();
            assert!(!first.is_empty(), "{id} resolved to no URLs");
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_resolution_is_case_insensitive_and_trimmed() {
        let resolver = SourceResolver::new();
        let urls = resolver.resolve("  HubSpot ").unwrap();
        assert_eq!(
            urls,
            vec![
                "https://developers.hubspot.com/docs/api/overview",
                "https://developers.hubspot.com/docs/api/getting-started",
            ]
        );
        assert_eq!(resolver.resolve("PY").unwrap(), resolver.resolve("python").unwrap());
    }

    #[test]
    fn test_unknown_product_lists_known_ids() {
        let resolver = SourceResolver::new();
        match resolver.resolve("unknown-product") {
            Err(Error::InvalidSource { product, known, .. }) => {
                assert_eq!(product, "unknown-product");
                assert_eq!(known, vec!["hubspot", "openai", "python", "stripe"]);
            },
            other => panic!("expected InvalidSource, got {other:?}"),
        }
    }

    #[test]
    fn test_near_miss_gets_suggestion() {
        let resolver = SourceResolver::new();
        match resolver.resolve("strpe") {
            Err(Error::InvalidSource { suggestions, .. }) => {
                assert_eq!(suggestions.first().map(String::as_str), Some("stripe"));
            },
            other => panic!("expected InvalidSource, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_url_list_is_invalid_source() {
        let resolver = SourceResolver::from_entries(vec![ProductEntry::new("empty", "Empty", &[])]);
        assert!(matches!(
            resolver.resolve("empty"),
            Err(Error::InvalidSource { .. })
        ));
    }

    #[test]
    fn test_config_overrides_and_additions() {
        let products = BTreeMap::from([
            (
                "Stripe".to_string(),
                ProductConfig {
                    name: None,
                    aliases: vec!["STRIPE-API".into()],
                    urls: vec!["http://localhost/one".into()],
                },
            ),
            (
                "acme".to_string(),
                ProductConfig {
                    name: Some("Acme".into()),
                    aliases: vec![],
                    urls: vec!["http://localhost/acme".into()],
                },
            ),
        ]);
        let resolver = SourceResolver::new().with_overrides(&products).unwrap();

        assert_eq!(resolver.resolve("stripe").unwrap(), vec!["http://localhost/one"]);
        assert_eq!(resolver.resolve("stripe-api").unwrap(), vec!["http://localhost/one"]);
        assert_eq!(resolver.lookup("stripe").unwrap().name, "Stripe");
        assert_eq!(resolver.resolve("acme").unwrap(), vec!["http://localhost/acme"]);
        assert!(resolver.known_ids().contains(&"acme".to_string()));
    }

    #[test]
    fn test_overrides_reject_bad_urls() {
        for bad in ["not a url", "ftp://docs.acme.dev/api", "/relative/path"] {
            let products = BTreeMap::from([(
                "acme".to_string(),
                ProductConfig {
                    urls: vec![bad.into()],
                    ..ProductConfig::default()
                },
            )]);
            let err = SourceResolver::new().with_overrides(&products).unwrap_err();
            assert!(matches!(err, Error::Config(ref msg) if msg.contains("acme")), "{bad}");
        }
    }
}
