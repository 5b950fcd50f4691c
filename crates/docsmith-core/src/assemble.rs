//! Markdown assembler for generated documentation.
//!
//! Merges per-source fragments into one document with a fixed layout:
//!
//! ```markdown
//! ---
//! product: stripe
//! generatedAt: 2024-03-05T10:20:30.456Z
//! requirements: Customer management endpoints
//! sources:
//!   - https://docs.stripe.com/api/customers
//! ---
//!
//! # stripe Documentation
//!
//! ## Requirements
//!
//! Customer management endpoints
//!
//! ## Table of Contents
//!
//! 1. [Customers](#customers)
//!
//! ## Customers
//!
//! > Source: [https://docs.stripe.com/api/customers](https://docs.stripe.com/api/customers)
//!
//! ...fragment...
//!
//! ---
//! ```
//!
//! The `sources` list records every resolved URL in resolution order; the
//! sections only cover the sources that succeeded, in the same order.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::types::{DocumentMetadata, DocumentationSource, MarkdownDocument};
use crate::{Error, Result};

/// Assembles sections into a [`MarkdownDocument`].
pub struct MarkdownAssembler;

impl MarkdownAssembler {
    /// Build the final document. Pure formatting; cannot fail.
    pub fn assemble(
        metadata: DocumentMetadata,
        sections: Vec<DocumentationSource>,
    ) -> MarkdownDocument {
        let markdown = Self::render(&metadata, &sections);
        MarkdownDocument {
            metadata,
            sections,
            markdown,
        }
    }

    /// Render the document text.
    pub fn render(metadata: &DocumentMetadata, sections: &[DocumentationSource]) -> String {
        let mut out = front_matter(metadata);
        out.push('\n');
        let _ = writeln!(out, "# {} Documentation\n", metadata.product);

        if let Some(requirements) = &metadata.requirements {
            let _ = writeln!(out, "## Requirements\n\n{requirements}\n");
        }

        out.push_str("## Table of Contents\n\n");
        for (i, section) in sections.iter().enumerate() {
            let _ = writeln!(out, "{}. [{}](#{})", i + 1, section.title, anchor(&section.title));
        }
        out.push('\n');

        for section in sections {
            let _ = writeln!(out, "## {}\n", section.title);
            let _ = write!(out, "> Source: [{0}]({0})", section.url);
            if let Some(updated) = &section.last_updated {
                let _ = write!(out, " | Last Updated: {updated}");
            }
            out.push_str("\n\n");
            let content = section.content.trim();
            if !content.is_empty() {
                out.push_str(content);
                out.push_str("\n\n");
            }
            out.push_str("---\n\n");
        }

        let trimmed = out.trim_end().len();
        out.truncate(trimmed);
        out.push('\n');
        out
    }
}

/// Anchor for a section title: lower-cased, every run of characters outside
/// `[a-z0-9]` replaced by a single hyphen.
///
/// ```rust
/// assert_eq!(docsmith_core::assemble::anchor("GET /v3/threads"), "get-v3-threads");
/// ```
pub fn anchor(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut in_run = false;
    for c in title.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('-');
            in_run = true;
        }
    }
    out
}

fn needs_quotes(value: &str) -> bool {
    value.is_empty()
        || value != value.trim()
        || value.contains(": ")
        || value.contains(" #")
        || value.ends_with(':')
        || value.chars().any(char::is_control)
        || value.starts_with([
            '-', '?', ':', ',', '[', ']', '{', '}', '#', '&', '*', '!', '|', '>', '\'', '"', '%',
            '@', '`',
        ])
}

fn scalar(value: &str) -> String {
    if needs_quotes(value) {
        serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\""))
    } else {
        value.to_string()
    }
}

fn unscalar(raw: &str) -> Result<String> {
    if raw.starts_with('"') {
        serde_json::from_str(raw)
            .map_err(|e| Error::Parse(format!("invalid quoted front matter value {raw}: {e}")))
    } else {
        Ok(raw.to_string())
    }
}

/// YAML-style front matter block, including both `---` fences.
pub fn front_matter(metadata: &DocumentMetadata) -> String {
    let mut out = String::from("---\n");
    let _ = writeln!(out, "product: {}", scalar(&metadata.product));
    let _ = writeln!(out, "generatedAt: {}", metadata.generated_at_iso());
    if let Some(requirements) = &metadata.requirements {
        let _ = writeln!(out, "requirements: {}", scalar(requirements));
    }
    if metadata.sources.is_empty() {
        out.push_str("sources: []\n");
    } else {
        out.push_str("sources:\n");
        for source in &metadata.sources {
            let _ = writeln!(out, "  - {}", scalar(source));
        }
    }
    out.push_str("---\n");
    out
}

/// Front matter fields read back from a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontMatter {
    /// `product`.
    pub product: String,
    /// `generatedAt`, verbatim.
    pub generated_at: String,
    /// `requirements`, if present.
    pub requirements: Option<String>,
    /// `sources`, in order.
    pub sources: Vec<String>,
}

impl FrontMatter {
    /// `generatedAt` as a timestamp.
    pub fn generated_at(&self) -> Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.generated_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| Error::Parse(format!("invalid generatedAt '{}': {e}", self.generated_at)))
    }
}

/// Parse the front matter at the top of `document`.
pub fn parse_front_matter(document: &str) -> Result<FrontMatter> {
    let mut lines = document.lines();
    if lines.next() != Some("---") {
        return Err(Error::Parse("document does not start with front matter".into()));
    }

    let mut product = None;
    let mut generated_at = None;
    let mut requirements = None;
    let mut sources = Vec::new();
    let mut closed = false;

    for line in lines {
        if line == "---" {
            closed = true;
            break;
        }
        if let Some(item) = line.strip_prefix("  - ") {
            sources.push(unscalar(item)?);
            continue;
        }
        let Some((key, rest)) = line.split_once(':') else {
            return Err(Error::Parse(format!("malformed front matter line: {line}")));
        };
        let value = rest.strip_prefix(' ').unwrap_or(rest);
        match key {
            "product" => product = Some(unscalar(value)?),
            "generatedAt" => generated_at = Some(value.to_string()),
            "requirements" => requirements = Some(unscalar(value)?),
            "sources" => {},
            other => {
                return Err(Error::Parse(format!("unknown front matter key: {other}")));
            },
        }
    }

    if !closed {
        return Err(Error::Parse("unterminated front matter".into()));
    }

    Ok(FrontMatter {
        product: product.ok_or_else(|| Error::Parse("front matter missing product".into()))?,
        generated_at: generated_at
            .ok_or_else(|| Error::Parse("front matter missing generatedAt".into()))?,
        requirements,
        sources,
    })
}

/// `{product-slug}-docs-{timestamp}.md`, with `:` and `.` in the timestamp
/// replaced by `-`.
pub fn output_filename(metadata: &DocumentMetadata) -> String {
    let timestamp = metadata.generated_at_iso().replace([':', '.'], "-");
    format!("{}-docs-{timestamp}.md", anchor(&metadata.product))
}

/// Write `document` into `dir`, creating it if needed.
pub fn persist(document: &MarkdownDocument, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(output_filename(&document.metadata));
    fs::write(&path, &document.markdown)?;
    info!("Wrote {} bytes to {}", document.markdown.len(), path.display());
    Ok(path)
}
