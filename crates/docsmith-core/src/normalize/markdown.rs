//! Markdown formatting primitives shared by the normalizer tiers.

use std::sync::OnceLock;

use regex::Regex;

/// Fenced code block. An empty `language` leaves the fence bare.
pub fn code_block(code: &str, language: &str) -> String {
    let code = code.trim_matches('\n').trim_end();
    format!("```{language}\n{code}\n```")
}

/// Pipe table with the first row as header.
///
/// Short rows are padded to the header width; pipes inside cells are escaped.
pub fn table(headers: &[String], rows: &[Vec<String>]) -> String {
    let width = headers
        .len()
        .max(rows.iter().map(Vec::len).max().unwrap_or(0));
    if width == 0 {
        return String::new();
    }

    let render_row = |cells: &[String]| {
        let mut line = String::from("|");
        for i in 0..width {
            let cell = cells.get(i).map_or("", String::as_str);
            line.push(' ');
            line.push_str(&escape_cell(cell));
            line.push_str(" |");
        }
        line
    };

    let mut out = render_row(headers);
    out.push_str("\n|");
    out.push_str(&"---|".repeat(width));
    for row in rows {
        out.push('\n');
        out.push_str(&render_row(row));
    }
    out
}

fn escape_cell(cell: &str) -> String {
    cell.replace('\n', " ").replace('|', "\\|")
}

/// Blockquoted note.
pub fn note(text: &str) -> String {
    format!("> **Note:** {text}")
}

/// Blockquoted warning.
pub fn warning(text: &str) -> String {
    format!("> ⚠️ **Warning:** {text}")
}

fn blank_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("blank-run regex is valid"))
}

/// Strip trailing whitespace per line and collapse 3+ newlines to 2.
pub fn cleanup(markdown: &str) -> String {
    let trimmed: Vec<&str> = markdown.lines().map(str::trim_end).collect();
    let joined = trimmed.join("\n");
    blank_runs().replace_all(&joined, "\n\n").trim().to_string()
}

/// Number of characters in a fragment, ignoring surrounding whitespace.
pub fn visible_len(markdown: &str) -> usize {
    markdown.trim().chars().count()
}
