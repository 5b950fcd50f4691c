//! Last-resort text splitter.
//!
//! Works on plain text: drops boilerplate lines, then cuts the remainder at
//! HTTP-method and section-name tokens, turning each cut into a heading.

use std::sync::OnceLock;

use regex::Regex;

use super::clean::clean_text;

/// Lines shorter than this are noise (stray labels, bullets, counters).
pub const MIN_LINE_CHARS: usize = 3;

fn boundary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(
            r"\b(?:(?P<method>GET|POST|PUT|PATCH|DELETE)\s+(?P<path>/\S*)|(?P<section>Properties|Parameters|Request Body|Response|Associations)\b)",
        )
        .expect("boundary regex is valid")
    })
}

fn boilerplate_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(\bwe use cookies\b|\b(accept|reject|manage)( all)? cookies\b|\bcookie (policy|settings|preferences)\b|\bfunction\s*\(|=>|\b(var|const|let)\s+\w+\s*=|\bwindow\.|\bdocument\.|\bgtag\(|\bdataLayer\b|^\s*[{}();]+\s*$)",
        )
        .expect("boilerplate regex is valid")
    })
}

fn keep_line(line: &str) -> bool {
    line.chars().count() >= MIN_LINE_CHARS && !boilerplate_re().is_match(line)
}

/// Clean raw text: one cleaned line per input line, boilerplate dropped.
pub fn clean_lines(text: &str) -> String {
    text.lines()
        .map(clean_text)
        .filter(|line| keep_line(line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn flush(heading: Option<String>, body: &str, blocks: &mut Vec<String>) {
    blocks.extend(heading);
    blocks.extend(
        body.lines()
            .map(str::trim)
            .filter(|line| keep_line(line))
            .map(str::to_string),
    );
}

/// Split cleaned text into markdown.
///
/// `GET /path` style tokens become `###` headings, section names become
/// `####` headings, and the text between them becomes paragraphs.
pub fn split(text: &str) -> String {
    let cleaned = clean_lines(text);
    let re = boundary_re();

    let mut blocks: Vec<String> = Vec::new();
    let mut cursor = 0;
    let mut pending_heading: Option<String> = None;

    for caps in re.captures_iter(&cleaned) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        flush(pending_heading.take(), &cleaned[cursor..whole.start()], &mut blocks);

        pending_heading = Some(match (caps.name("method"), caps.name("path"), caps.name("section")) {
            (Some(method), Some(path), _) => format!("### {} {}", method.as_str(), path.as_str()),
            (_, _, Some(section)) => format!("#### {}", section.as_str()),
            _ => continue,
        });
        cursor = whole.end();
    }
    flush(pending_heading.take(), &cleaned[cursor..], &mut blocks);

    blocks.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_on_methods_and_sections() {
        let text = "Contacts API\nManage contacts in the CRM.\nGET /crm/v3/objects/contacts Retrieve a page of contacts.\nParameters\nlimit The maximum number of results.\nResponse\nA paged list.";
        assert_eq!(
            split(text),
            "Contacts API\n\n\
             Manage contacts in the CRM.\n\n\
             ### GET /crm/v3/objects/contacts\n\n\
             Retrieve a page of contacts.\n\n\
             #### Parameters\n\n\
             limit The maximum number of results.\n\n\
             #### Response\n\n\
             A paged list."
        );
    }

    #[test]
    fn test_drops_boilerplate_and_short_lines() {
        let text = "We use cookies to improve your experience.\nconst x = window.foo;\nok\n{\nReal documentation line.";
        assert_eq!(split(text), "Real documentation line.");
    }

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(clean_lines("  spaced    out\t\ttext  "), "spaced out text");
    }

    #[test]
    fn test_plain_text_without_boundaries() {
        assert_eq!(split("Just one paragraph of text."), "Just one paragraph of text.");
        assert_eq!(split(""), "");
    }
}
