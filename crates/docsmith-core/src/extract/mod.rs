//! Declarative extraction of records from a DOM subtree.
//!
//! An [`ExtractorConfig`] is a tree of CSS selectors. Leaves turn matched
//! elements into strings; nodes turn them into records whose fields are
//! resolved recursively against each matched element. Configurations are
//! plain data: they can be built in code or deserialized from TOML / JSON,
//! where a bare string stands for a text leaf.
//!
//! ```rust
//! use docsmith_core::extract::{ExtractorConfig, Extractor};
//!
//! let config = ExtractorConfig::node(".endpoint")
//!     .multiple()
//!     .field("method", ExtractorConfig::leaf(".method"))
//!     .field("path", ExtractorConfig::leaf(".path"));
//! let extractor = Extractor::compile(&config)?;
//!
//! let value = extractor.extract_html(
//!     r#"<div class="endpoint"><span class="method">GET</span><code class="path">/v1/a</code></div>"#,
//! );
//! assert_eq!(value.as_list().map(<[_]>::len), Some(1));
//! # Ok::<(), docsmith_core::Error>(())
//! ```

mod engine;
mod value;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use scraper::ElementRef;
use serde::Deserialize;

pub use engine::{Extractor, code_language, element_text, extract};
pub use value::{ExtractedRecord, ExtractedValue};

use crate::{Error, Result};

/// How a leaf turns a matched element into a string.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    /// Trimmed text content.
    Text,
    /// Inner HTML.
    Html,
    /// Outer HTML.
    OuterHtml,
    /// Value of the named attribute, empty when absent.
    Attr(String),
    /// Fenced code block; the language comes from a `language-*` / `lang-*`
    /// class, falling back to the given default.
    Fenced(String),
    /// Arbitrary function; only constructible from code.
    #[serde(skip)]
    Custom(TransformFn),
}

impl Transform {
    /// Wrap a closure as a transform.
    pub fn custom<F>(f: F) -> Self
    where
        F: for<'a> Fn(ElementRef<'a>) -> String + Send + Sync + 'static,
    {
        Self::Custom(TransformFn(Arc::new(f)))
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("Text"),
            Self::Html => f.write_str("Html"),
            Self::OuterHtml => f.write_str("OuterHtml"),
            Self::Attr(name) => f.debug_tuple("Attr").field(name).finish(),
            Self::Fenced(lang) => f.debug_tuple("Fenced").field(lang).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Shared element-to-string function.
#[derive(Clone)]
pub struct TransformFn(Arc<dyn for<'a> Fn(ElementRef<'a>) -> String + Send + Sync>);

impl TransformFn {
    fn call(&self, element: ElementRef<'_>) -> String {
        (self.0)(element)
    }
}

/// A leaf: selector plus optional transform.
#[derive(Debug, Clone)]
pub struct LeafConfig {
    /// CSS selector resolved against the current context.
    pub selector: String,
    /// Collect every match instead of the first.
    pub multiple: bool,
    /// Omit the field from the parent record when nothing matches.
    pub optional: bool,
    /// Transform applied to each match; trimmed text when `None`.
    pub transform: Option<Transform>,
}

/// A node: selector plus named child configurations.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// CSS selector resolved against the current context.
    pub selector: String,
    /// Build one record per match instead of for the first only.
    pub multiple: bool,
    /// Omit the field from the parent record when nothing matches.
    pub optional: bool,
    /// Child fields, resolved against each matched element.
    pub fields: BTreeMap<String, ExtractorConfig>,
}

/// Extraction tree: either a leaf or a node with fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawExtractorConfig")]
pub enum ExtractorConfig {
    /// Produces strings.
    Leaf(LeafConfig),
    /// Produces records.
    Node(NodeConfig),
}

impl ExtractorConfig {
    /// Text leaf for `selector`.
    pub fn leaf(selector: &str) -> Self {
        Self::Leaf(LeafConfig {
            selector: selector.to_string(),
            multiple: false,
            optional: false,
            transform: None,
        })
    }

    /// Node without fields for `selector`.
    pub fn node(selector: &str) -> Self {
        Self::Node(NodeConfig {
            selector: selector.to_string(),
            multiple: false,
            optional: false,
            fields: BTreeMap::new(),
        })
    }

    /// Match every element, not just the first.
    #[must_use]
    pub fn multiple(mut self) -> Self {
        match &mut self {
            Self::Leaf(leaf) => leaf.multiple = true,
            Self::Node(node) => node.multiple = true,
        }
        self
    }

    /// Mark the field as optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        match &mut self {
            Self::Leaf(leaf) => leaf.optional = true,
            Self::Node(node) => node.optional = true,
        }
        self
    }

    /// Add a child field. A leaf becomes a node and loses its transform.
    #[must_use]
    pub fn field(self, name: &str, child: Self) -> Self {
        let mut node = match self {
            Self::Node(node) => node,
            Self::Leaf(leaf) => NodeConfig {
                selector: leaf.selector,
                multiple: leaf.multiple,
                optional: leaf.optional,
                fields: BTreeMap::new(),
            },
        };
        node.fields.insert(name.to_string(), child);
        Self::Node(node)
    }

    /// Set the transform. A node becomes a leaf and loses its fields.
    #[must_use]
    pub fn transform(self, transform: Transform) -> Self {
        let (selector, multiple, optional) = match self {
            Self::Leaf(leaf) => (leaf.selector, leaf.multiple, leaf.optional),
            Self::Node(node) => (node.selector, node.multiple, node.optional),
        };
        Self::Leaf(LeafConfig {
            selector,
            multiple,
            optional,
            transform: Some(transform),
        })
    }

    /// Selector of this level.
    pub fn selector(&self) -> &str {
        match self {
            Self::Leaf(leaf) => &leaf.selector,
            Self::Node(node) => &node.selector,
        }
    }

    /// Parse a configuration from TOML.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| Error::Extraction(e.to_string()))
    }

    /// Parse a configuration from JSON.
    pub fn from_json_str(source: &str) -> Result<Self> {
        serde_json::from_str(source).map_err(|e| Error::Extraction(e.to_string()))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawExtractorConfig {
    Selector(String),
    Spec {
        selector: String,
        #[serde(default)]
        multiple: bool,
        #[serde(default)]
        optional: bool,
        #[serde(default)]
        transform: Option<Transform>,
        #[serde(default)]
        fields: Option<BTreeMap<String, ExtractorConfig>>,
    },
}

impl TryFrom<RawExtractorConfig> for ExtractorConfig {
    type Error = String;

    fn try_from(raw: RawExtractorConfig) -> std::result::Result<Self, Self::Error> {
        match raw {
            RawExtractorConfig::Selector(selector) => Ok(Self::leaf(&selector)),
            RawExtractorConfig::Spec {
                selector,
                transform: Some(_),
                fields: Some(_),
                ..
            } => Err(format!(
                "extractor for '{selector}' has both fields and a transform"
            )),
            RawExtractorConfig::Spec {
                selector,
                multiple,
                optional,
                transform,
                fields: None,
            } => Ok(Self::Leaf(LeafConfig {
                selector,
                multiple,
                optional,
                transform,
            })),
            RawExtractorConfig::Spec {
                selector,
                multiple,
                optional,
                fields: Some(fields),
                ..
            } => Ok(Self::Node(NodeConfig {
                selector,
                multiple,
                optional,
                fields,
            })),
        }
    }
}
