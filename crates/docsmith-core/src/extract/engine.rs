use scraper::{ElementRef, Html, Selector};

use super::{ExtractedRecord, ExtractedValue, ExtractorConfig, Transform};
use crate::{Error, Result};

/// A configuration with every selector parsed.
///
/// Compilation is the only fallible step; extraction itself never fails.
/// The same extractor applied to the same DOM always yields the same value.
#[derive(Debug, Clone)]
pub struct Extractor {
    root: Compiled,
}

#[derive(Debug, Clone)]
enum Compiled {
    Leaf {
        selector: Selector,
        multiple: bool,
        optional: bool,
        transform: Transform,
    },
    Node {
        selector: Selector,
        multiple: bool,
        optional: bool,
        fields: Vec<(String, Compiled)>,
    },
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| Error::Extraction(format!("invalid selector '{selector}': {e}")))
}

impl Compiled {
    fn compile(config: &ExtractorConfig) -> Result<Self> {
        Ok(match config {
            ExtractorConfig::Leaf(leaf) => Self::Leaf {
                selector: parse_selector(&leaf.selector)?,
                multiple: leaf.multiple,
                optional: leaf.optional,
                transform: leaf.transform.clone().unwrap_or(Transform::Text),
            },
            ExtractorConfig::Node(node) => Self::Node {
                selector: parse_selector(&node.selector)?,
                multiple: node.multiple,
                optional: node.optional,
                fields: node
                    .fields
                    .iter()
                    .map(|(name, child)| Ok((name.clone(), Self::compile(child)?)))
                    .collect::<Result<_>>()?,
            },
        })
    }

    /// `None` means "optional and absent": the parent omits the field.
    fn resolve(&self, context: ElementRef<'_>) -> Option<ExtractedValue> {
        let (selector, multiple, optional) = match self {
            Self::Leaf {
                selector,
                multiple,
                optional,
                ..
            }
            | Self::Node {
                selector,
                multiple,
                optional,
                ..
            } => (selector, *multiple, *optional),
        };

        if multiple {
            let items: Vec<ExtractedValue> = context
                .select(selector)
                .map(|element| self.apply(element))
                .collect();
            if items.is_empty() && optional {
                return None;
            }
            Some(ExtractedValue::List(items))
        } else {
            match context.select(selector).next() {
                Some(element) => Some(self.apply(element)),
                None if optional => None,
                None => Some(ExtractedValue::Null),
            }
        }
    }

    fn apply(&self, element: ElementRef<'_>) -> ExtractedValue {
        match self {
            Self::Leaf { transform, .. } => ExtractedValue::Text(apply_transform(transform, element)),
            Self::Node { fields, .. } => {
                let record: ExtractedRecord = fields
                    .iter()
                    .filter_map(|(name, child)| child.resolve(element).map(|v| (name.clone(), v)))
                    .collect();
                ExtractedValue::Record(record)
            },
        }
    }
}

impl Extractor {
    /// Parse every selector in `config`.
    pub fn compile(config: &ExtractorConfig) -> Result<Self> {
        Ok(Self {
            root: Compiled::compile(config)?,
        })
    }

    /// Apply to the subtree under `root`.
    ///
    /// Selectors match descendants of `root`. An optional top level that
    /// matches nothing yields [`ExtractedValue::Null`].
    pub fn extract(&self, root: ElementRef<'_>) -> ExtractedValue {
        self.root.resolve(root).unwrap_or(ExtractedValue::Null)
    }

    /// Parse `html` as a document and apply to it.
    pub fn extract_html(&self, html: &str) -> ExtractedValue {
        let document = Html::parse_document(html);
        self.extract(document.root_element())
    }
}

/// Compile `config` and apply it to `root` in one step.
pub fn extract(config: &ExtractorConfig, root: ElementRef<'_>) -> Result<ExtractedValue> {
    Ok(Extractor::compile(config)?.extract(root))
}

/// Text content of `element`, trimmed.
pub fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Language named by a `language-*` or `lang-*` class on `element` or its
/// first `code` descendant.
pub fn code_language(element: ElementRef<'_>) -> Option<String> {
    fn from_classes(element: ElementRef<'_>) -> Option<String> {
        element.value().classes().find_map(|class| {
            class
                .strip_prefix("language-")
                .or_else(|| class.strip_prefix("lang-"))
                .filter(|lang| !lang.is_empty())
                .map(str::to_string)
        })
    }

    from_classes(element).or_else(|| {
        let code = Selector::parse("code").ok()?;
        element.select(&code).next().and_then(from_classes)
    })
}

fn fenced(element: ElementRef<'_>, default_language: &str) -> String {
    let language = code_language(element).unwrap_or_else(|| default_language.to_string());
    let code: String = element.text().collect();
    let code = code.trim_matches('\n').trim_end();
    format!("```{language}\n{code}\n```")
}

fn apply_transform(transform: &Transform, element: ElementRef<'_>) -> String {
    match transform {
        Transform::Text => element_text(element),
        Transform::Html => element.inner_html(),
        Transform::OuterHtml => element.html(),
        Transform::Attr(name) => element.value().attr(name).unwrap_or_default().to_string(),
        Transform::Fenced(language) => fenced(element, language),
        Transform::Custom(f) => f.call(element),
    }
}
