//! API endpoint blocks and pre-extracted structured content.
//!
//! Both sources end up in [`EndpointView`] so an endpoint renders the same
//! way whether it came from the DOM or from a renderer's structured output:
//!
//! ```text
//! ### GET /v1/customers
//!
//! Returns a list of customers.
//!
//! | Name | Type | Required | Description |
//! |---|---|---|---|
//! | limit | integer | No | Page size. |
//!
//! ```json
//! { "object": "list" }
//! ```
//! ```

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use super::clean::clean_text;
use super::markdown;
use crate::extract::{ExtractedValue, ExtractorConfig, Transform};

const METHOD_SELECTOR: &str = "[data-method], .method, .http-method, .api-method-verb";
const PATH_SELECTOR: &str = "[data-path], .path, .endpoint-path, .api-path";
const HEADING_SELECTOR: &str = "h1, h2, h3, h4, h5";
const DESCRIPTION_SELECTOR: &str = ".endpoint-description, .description, .summary, p";
const PARAMETER_SELECTOR: &str = ".parameter, .param, [data-param], tbody tr";
const PARAM_NAME_SELECTOR: &str = ".param-name, .parameter-name, .name, td:nth-child(1)";
const PARAM_TYPE_SELECTOR: &str = ".param-type, .parameter-type, .type, td:nth-child(2)";
const PARAM_REQUIRED_SELECTOR: &str =
    ".param-required, .parameter-required, .required, td:nth-child(3)";
const PARAM_DESCRIPTION_SELECTOR: &str =
    ".param-description, .parameter-description, .description, td:nth-child(4)";

/// Default language for example code blocks.
pub const EXAMPLE_LANGUAGE: &str = "json";

fn method_path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"\b(GET|POST|PUT|PATCH|DELETE)\s+(/\S*)").expect("method regex is valid")
    })
}

/// Extractor configuration for endpoint blocks marked by `marker`.
pub fn endpoint_config(marker: &str) -> ExtractorConfig {
    let optional = |selector: &str| ExtractorConfig::leaf(selector).optional();
    ExtractorConfig::node(marker)
        .multiple()
        .field("method", optional(METHOD_SELECTOR))
        .field("path", optional(PATH_SELECTOR))
        .field("heading", optional(HEADING_SELECTOR))
        .field("description", optional(DESCRIPTION_SELECTOR))
        .field(
            "parameters",
            ExtractorConfig::node(PARAMETER_SELECTOR)
                .multiple()
                .optional()
                .field("name", optional(PARAM_NAME_SELECTOR))
                .field("type", optional(PARAM_TYPE_SELECTOR))
                .field("required", optional(PARAM_REQUIRED_SELECTOR))
                .field("description", optional(PARAM_DESCRIPTION_SELECTOR)),
        )
        .field(
            "examples",
            ExtractorConfig::leaf("pre")
                .multiple()
                .optional()
                .transform(Transform::Fenced(EXAMPLE_LANGUAGE.to_string())),
        )
}

/// One parameter row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterView {
    /// Parameter name.
    pub name: String,
    /// Declared type.
    pub type_name: String,
    /// Whether the parameter is required.
    pub required: bool,
    /// Description text.
    pub description: String,
}

/// An endpoint ready to render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointView {
    /// Upper-case HTTP method.
    pub method: String,
    /// Request path.
    pub path: String,
    /// Summary paragraph.
    pub description: Option<String>,
    /// Parameter rows.
    pub parameters: Vec<ParameterView>,
    /// Fenced example blocks.
    pub examples: Vec<String>,
}

/// Interpret a "required" cell. A non-empty cell that is not explicitly
/// negative means yes; an empty cell means no. `present` decides only when
/// there is no text at all.
fn parse_required(text: Option<&str>, present: bool) -> bool {
    match text.map(str::trim) {
        Some("") => false,
        Some(t) => {
            let t = t.to_ascii_lowercase();
            !(t == "no" || t == "false" || t == "optional" || t == "-")
        },
        None => present,
    }
}

fn split_method_path(text: &str) -> Option<(String, String)> {
    method_path_re()
        .captures(text)
        .map(|c| (c[1].to_string(), c[2].to_string()))
}

impl EndpointView {
    /// Build from an extracted endpoint record; `None` when neither a method
    /// nor a path can be found.
    pub fn from_extracted(record: &ExtractedValue) -> Option<Self> {
        let mut method = record.text("method").map(|m| clean_text(m).to_uppercase());
        let mut path = record.text("path").map(clean_text);

        if method.is_none() || path.is_none() {
            if let Some((m, p)) = record.text("heading").and_then(split_method_path) {
                method = method.or(Some(m));
                path = path.or(Some(p));
            }
        }
        let (method, path) = (method?, path?);

        let parameters = record
            .get("parameters")
            .and_then(ExtractedValue::as_list)
            .unwrap_or_default()
            .iter()
            .filter_map(|param| {
                let name = clean_text(param.text("name")?);
                (!name.is_empty()).then(|| ParameterView {
                    name,
                    type_name: param.text("type").map(clean_text).unwrap_or_default(),
                    required: parse_required(
                        param.get("required").and_then(ExtractedValue::as_str),
                        false,
                    ),
                    description: param.text("description").map(clean_text).unwrap_or_default(),
                })
            })
            .collect();

        let examples = record
            .get("examples")
            .and_then(ExtractedValue::as_list)
            .unwrap_or_default()
            .iter()
            .filter_map(ExtractedValue::as_str)
            .map(str::to_string)
            .collect();

        Some(Self {
            method,
            path,
            description: record
                .text("description")
                .map(clean_text)
                .filter(|d| !d.is_empty()),
            parameters,
            examples,
        })
    }

    /// Build from a structured endpoint object.
    pub fn from_json(value: &Value) -> Option<Self> {
        let method = json_text(value.get("method")).map(|m| m.to_uppercase());
        let path = json_text(value.get("path"));
        let (method, path) = match (method, path) {
            (Some(m), Some(p)) => (m, p),
            _ => split_method_path(&json_text(value.get("title"))?)?,
        };

        let parameters = json_items(value.get("parameters"))
            .filter_map(|param| {
                let name = json_text(param.get("name"))?;
                let required = match param.get("required") {
                    Some(Value::Bool(b)) => *b,
                    Some(other) => {
                        let text = json_text(Some(other)).unwrap_or_default();
                        parse_required(Some(&text), true)
                    },
                    None => false,
                };
                Some(ParameterView {
                    name,
                    type_name: json_text(param.get("type")).unwrap_or_default(),
                    required,
                    description: json_text(param.get("description")).unwrap_or_default(),
                })
            })
            .collect();

        let examples = json_items(value.get("examples"))
            .filter_map(|example| match example {
                Value::String(code) if !code.trim().is_empty() => {
                    Some(markdown::code_block(code, EXAMPLE_LANGUAGE))
                },
                Value::Null => None,
                other => serde_json::to_string_pretty(other)
                    .ok()
                    .map(|code| markdown::code_block(&code, EXAMPLE_LANGUAGE)),
            })
            .collect();

        Some(Self {
            method,
            path,
            description: json_text(value.get("description")),
            parameters,
            examples,
        })
    }

    /// Markdown for this endpoint.
    pub fn render(&self) -> String {
        let mut blocks = vec![format!("### {} {}", self.method, self.path)];
        if let Some(description) = &self.description {
            blocks.push(description.clone());
        }
        if !self.parameters.is_empty() {
            let headers = ["Name", "Type", "Required", "Description"].map(str::to_string);
            let rows: Vec<Vec<String>> = self
                .parameters
                .iter()
                .map(|p| {
                    vec![
                        p.name.clone(),
                        p.type_name.clone(),
                        if p.required { "Yes" } else { "No" }.to_string(),
                        p.description.clone(),
                    ]
                })
                .collect();
            blocks.push(markdown::table(&headers, &rows));
        }
        blocks.extend(self.examples.iter().cloned());
        blocks.join("\n\n")
    }
}

/// Render every endpoint found in an extracted list.
pub fn render_extracted(endpoints: &ExtractedValue) -> String {
    endpoints
        .as_list()
        .unwrap_or_default()
        .iter()
        .filter_map(EndpointView::from_extracted)
        .map(|endpoint| endpoint.render())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn json_text(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => clean_text(s),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn json_items(value: Option<&Value>) -> impl Iterator<Item = &Value> {
    value
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
}

/// Title carried by a structured object.
pub fn structured_title(value: &Value) -> Option<String> {
    json_text(value.get("title")).or_else(|| json_items(value.get("headings")).find_map(|h| json_text(Some(h))))
}

/// Last-updated timestamp carried by a structured object.
pub fn structured_last_updated(value: &Value) -> Option<String> {
    ["lastUpdated", "last_updated", "timestamp"]
        .iter()
        .find_map(|key| json_text(value.get(*key)))
}

/// Render a pre-extracted object.
///
/// A string `content` is taken as markdown. Otherwise headings and content
/// items are interleaved by position, followed by endpoints and functions.
pub fn render_structured(value: &Value) -> String {
    if let Some(Value::String(markdown_body)) = value.get("content") {
        return markdown_body.clone();
    }

    let mut blocks = Vec::new();
    if let Some(description) = json_text(value.get("description")) {
        blocks.push(description);
    }

    let headings: Vec<String> = json_items(value.get("headings"))
        .filter_map(|h| json_text(Some(h)))
        .collect();
    let content: Vec<String> = json_items(value.get("content"))
        .filter_map(|c| json_text(Some(c)))
        .collect();
    for i in 0..headings.len().max(content.len()) {
        if let Some(heading) = headings.get(i) {
            blocks.push(format!("### {heading}"));
        }
        if let Some(text) = content.get(i) {
            blocks.push(text.clone());
        }
    }

    blocks.extend(
        json_items(value.get("endpoints"))
            .filter_map(EndpointView::from_json)
            .map(|endpoint| endpoint.render()),
    );

    for function in json_items(value.get("functions")) {
        let Some(signature) = json_text(function.get("signature")) else {
            continue;
        };
        blocks.push(format!("#### `{signature}`"));
        if let Some(description) = json_text(function.get("description")) {
            blocks.push(description);
        }
        let rows: Vec<Vec<String>> = json_items(function.get("parameters"))
            .filter_map(|p| {
                Some(vec![
                    json_text(p.get("name"))?,
                    json_text(p.get("description")).unwrap_or_default(),
                ])
            })
            .collect();
        if !rows.is_empty() {
            let headers = ["Name", "Description"].map(str::to_string);
            blocks.push(markdown::table(&headers, &rows));
        }
    }

    blocks.join("\n\n")
}
