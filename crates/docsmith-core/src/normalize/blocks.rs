//! Generic block walker: headings, paragraphs, lists, tables, code, callouts.
//!
//! Text outside those shapes (bare text in a `div`, `dd`, `span` run, ...) is
//! flattened into plain paragraphs. Only the recognized shapes count towards
//! [`RenderedBlocks::shaped_len`], which decides whether this tier is used.

use scraper::{ElementRef, Node, Selector};

use super::clean::{clean_text, inline_text, push_inline_element};
use super::markdown;
use crate::extract::code_language;

const NOTE_CLASSES: &[&str] = &["note", "notification", "alert-info", "admonition-note"];
const WARNING_CLASSES: &[&str] = &["warning", "alert-warning", "admonition-warning", "caution"];

/// Elements that start a new block; anything else is inline.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "dd", "details", "dialog", "div", "dl",
    "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5",
    "h6", "head", "header", "hr", "html", "li", "main", "nav", "ol", "p", "pre", "section",
    "summary", "table", "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
];

/// Elements whose text is never content.
const SKIPPED_TAGS: &[&str] = &["head", "script", "style", "template", "noscript"];

/// Output of the block walker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedBlocks {
    /// Every block, flattened text included.
    pub markdown: String,
    /// Visible characters produced by recognized shapes alone.
    pub shaped_len: usize,
}

#[derive(Default)]
struct Blocks {
    items: Vec<String>,
    shaped_len: usize,
}

impl Blocks {
    fn push_shaped(&mut self, block: String) {
        if !block.trim().is_empty() {
            self.shaped_len += markdown::visible_len(&block);
            self.items.push(block);
        }
    }

    fn flush_loose(&mut self, run: &mut String) {
        let text = clean_text(run);
        run.clear();
        if !text.is_empty() {
            self.items.push(text);
        }
    }
}

/// Render the blocks under `root`.
pub fn render_blocks(root: ElementRef<'_>) -> RenderedBlocks {
    let mut blocks = Blocks::default();
    walk_mixed(root, &mut blocks);
    RenderedBlocks {
        markdown: blocks.items.join("\n\n"),
        shaped_len: blocks.shaped_len,
    }
}

fn is_block(element: ElementRef<'_>) -> bool {
    BLOCK_TAGS.contains(&element.value().name())
        || has_any_class(element, NOTE_CLASSES)
        || has_any_class(element, WARNING_CLASSES)
}

/// Walk a container: block children render on their own, runs of text and
/// inline children between them become one flattened paragraph each.
fn walk_mixed(element: ElementRef<'_>, blocks: &mut Blocks) {
    let mut run = String::new();
    for child in element.children() {
        match child.value() {
            Node::Text(text) => run.push_str(text),
            Node::Element(_) => {
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };
                if is_block(child) {
                    blocks.flush_loose(&mut run);
                    render_element(child, blocks);
                } else if !SKIPPED_TAGS.contains(&child.value().name()) {
                    push_inline_element(child, &mut run);
                }
            },
            _ => {},
        }
    }
    blocks.flush_loose(&mut run);
}

fn has_any_class(element: ElementRef<'_>, classes: &[&str]) -> bool {
    element
        .value()
        .classes()
        .any(|class| classes.iter().any(|c| class.eq_ignore_ascii_case(c)))
}

fn render_element(element: ElementRef<'_>, blocks: &mut Blocks) {
    if has_any_class(element, WARNING_CLASSES) {
        let text = inline_text(element);
        if !text.is_empty() {
            blocks.push_shaped(markdown::warning(&text));
        }
        return;
    }
    if has_any_class(element, NOTE_CLASSES) {
        let text = inline_text(element);
        if !text.is_empty() {
            blocks.push_shaped(markdown::note(&text));
        }
        return;
    }

    let name = element.value().name();
    match name {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = name[1..].parse::<usize>().unwrap_or(2);
            let text = inline_text(element);
            if !text.is_empty() {
                blocks.push_shaped(format!("{} {text}", "#".repeat(level)));
            }
        },
        "p" => blocks.push_shaped(inline_text(element)),
        "ul" | "ol" => blocks.push_shaped(render_list(element)),
        "table" => blocks.push_shaped(render_table(element)),
        "pre" => {
            let code: String = element.text().collect();
            if !code.trim().is_empty() {
                let language = code_language(element).unwrap_or_default();
                blocks.push_shaped(markdown::code_block(&code, &language));
            }
        },
        "blockquote" => {
            let text = inline_text(element);
            if !text.is_empty() {
                blocks.push_shaped(format!("> {text}"));
            }
        },
        "hr" => {},
        skipped if SKIPPED_TAGS.contains(&skipped) => {},
        _ => walk_mixed(element, blocks),
    }
}

fn render_list(list: ElementRef<'_>) -> String {
    list.children()
        .filter_map(ElementRef::wrap)
        .filter(|item| item.value().name() == "li")
        .map(inline_text)
        .filter(|text| !text.is_empty())
        .map(|text| format!("- {text}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_table(table: ElementRef<'_>) -> String {
    let (Ok(row_sel), Ok(cell_sel)) = (Selector::parse("tr"), Selector::parse("th, td")) else {
        return String::new();
    };

    let mut rows = table.select(&row_sel).map(|row| {
        row.select(&cell_sel)
            .map(|cell| clean_text(&cell.text().collect::<String>()))
            .collect::<Vec<_>>()
    });

    let Some(header) = rows.next() else {
        return String::new();
    };
    let body: Vec<Vec<String>> = rows.filter(|r| !r.is_empty()).collect();
    markdown::table(&header, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn render(html: &str) -> String {
        let document = Html::parse_document(html);
        markdown::cleanup(&render_blocks(document.root_element()).markdown)
    }

    #[test]
    fn test_common_shapes() {
        let out = render(
            r#"<main>
                <h2>Create a customer</h2>
                <p>Creates a new <code>Customer</code> object.</p>
                <ul><li>First</li><li>Second <b>bold</b></li></ul>
                <table>
                  <tr><th>Name</th><th>Type</th></tr>
                  <tr><td>email</td><td>string</td></tr>
                </table>
                <pre><code class="language-js">const c = await stripe.customers.create();</code></pre>
            </main>"#,
        );
        assert_eq!(
            out,
            "## Create a customer\n\n\
             Creates a new `Customer` object.\n\n\
             - First\n- Second bold\n\n\
             | Name | Type |\n|---|---|\n| email | string |\n\n\
             ```js\nconst c = await stripe.customers.create();\n```"
        );
    }

    #[test]
    fn test_callouts() {
        let out = render(
            r#"<div class="note">Keys are <code>secret</code>.</div>
               <div class="alert alert-warning">Rate limits apply.</div>"#,
        );
        assert_eq!(
            out,
            "> **Note:** Keys are `secret`.\n\n> ⚠️ **Warning:** Rate limits apply."
        );
    }

    #[test]
    fn test_loose_text_is_flattened() {
        let out = render(
            "<main><h2>Overview</h2><div>Pass the <code>limit</code> parameter \
             <em>to page</em>.<p>Shaped.</p>trailing words</div>\
             <dl><dt>TERM_X</dt><dd>definition text</dd></dl></main>",
        );
        assert_eq!(
            out,
            "## Overview\n\nPass the `limit` parameter to page.\n\nShaped.\n\n\
             trailing words\n\nTERM_X\n\ndefinition text"
        );
    }

    #[test]
    fn test_only_shapes_count_towards_shaped_len() {
        let document = Html::parse_document(
            "<main><div>loose prose only</div><span>and more</span></main>",
        );
        let rendered = render_blocks(document.root_element());
        assert_eq!(rendered.shaped_len, 0);
        assert_eq!(rendered.markdown, "loose prose only\n\nand more");

        let document = Html::parse_document("<main><h2>Title</h2><div>loose</div></main>");
        assert_eq!(render_blocks(document.root_element()).shaped_len, "## Title".len());
    }

    #[test]
    fn test_head_text_is_ignored() {
        let out = render(
            "<html><head><title>Page title</title></head><body><p>Body.</p></body></html>",
        );
        assert_eq!(out, "Body.");
    }

    #[test]
    fn test_nested_containers_are_walked() {
        let out = render("<section><div><div><h3>Deep</h3><p>Inside.</p></div></div></section>");
        assert_eq!(out, "### Deep\n\nInside.");
    }
}
