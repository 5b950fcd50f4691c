//! Boilerplate removal and text cleanup.

use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node};

use crate::config::NormalizeConfig;

/// Elements that are never stripped even when their class matches a marker.
const PROTECTED_TAGS: &[&str] = &["html", "body", "main", "article"];

fn template_residue() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| Regex::new(r"\{\{.*?\}\}").expect("template regex is valid"))
}

fn is_denylisted(element: ElementRef<'_>, config: &NormalizeConfig) -> bool {
    let name = element.value().name();
    if PROTECTED_TAGS.contains(&name) {
        return false;
    }
    if config.denylist_tags.iter().any(|tag| tag.eq_ignore_ascii_case(name)) {
        return true;
    }
    if element.value().attr("hidden").is_some() {
        return true;
    }
    element.value().attr("class").is_some_and(|class| {
        let class = class.to_lowercase();
        config
            .denylist_class_markers
            .iter()
            .any(|marker| class.contains(&marker.to_lowercase()))
    })
}

/// Detach every denylisted element from the document tree.
///
/// Returns the number of subtrees removed.
pub fn strip_denylisted(document: &mut Html, config: &NormalizeConfig) -> usize {
    let doomed: Vec<_> = document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|element| is_denylisted(*element, config))
        .map(|element| element.id())
        .collect();

    for id in &doomed {
        if let Some(mut node) = document.tree.get_mut(*id) {
            node.detach();
        }
    }
    doomed.len()
}

/// Collapse whitespace and drop button labels and template residue.
pub fn clean_text(text: &str) -> String {
    let text = text.replace("Copy code", " ");
    let text = template_residue().replace_all(&text, " ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of `element` with inline `code` wrapped in backticks, cleaned.
pub fn inline_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    push_inline(element, &mut out);
    clean_text(&out)
}

fn push_inline(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    push_inline_element(child, out);
                }
            },
            _ => {},
        }
    }
}

/// Append the inline rendering of `element` to `out`, uncleaned.
pub fn push_inline_element(element: ElementRef<'_>, out: &mut String) {
    match element.value().name() {
        "code" => {
            let code = clean_text(&element.text().collect::<String>());
            if !code.is_empty() {
                out.push('`');
                out.push_str(&code);
                out.push('`');
            }
        },
        "br" => out.push(' '),
        _ => push_inline(element, out),
    }
}

/// Text nodes under `element`, one per line.
pub fn text_lines(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
