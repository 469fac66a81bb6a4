//! Plain-prose cleanup of LLM summaries.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Case-insensitive marker that starts the ideas section of a summary.
pub const IDEAS_MARKER: &str = "further exploration ideas";

static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("Invalid regex: bold"));
static UNDERLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"__(.+?)__").expect("Invalid regex: underline"));
static ITALIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*([^\s*][^*\n]*?)\*").expect("Invalid regex: italic"));
static CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]*)`").expect("Invalid regex: code"));

static HEADING_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^#+[ \t]*").expect("Invalid regex: heading"));
static LEADING_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(executive\s+summary|data\s+summary|summary)\s*[:\-]?\s*")
        .expect("Invalid regex: leading title")
});
static LIST_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[-*•]|\d+[.)])\s+").expect("Invalid regex: list item"));

/// Remove `**bold**`, `__underline__`, `*italic*` and `` `code` `` markers,
/// keeping the inner text.
pub fn strip_markdown_emphasis(text: &str) -> String {
    let text = BOLD.replace_all(text, "$1");
    let text = UNDERLINE.replace_all(&text, "$1");
    let text = ITALIC.replace_all(&text, "$1");
    CODE.replace_all(&text, "$1").into_owned()
}

/// A summary split into prose and the follow-up ideas list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SummarySections {
    pub summary: String,
    pub ideas: Vec<String>,
}

/// Split a summary at [`IDEAS_MARKER`].
///
/// Heading markers and a leading "Summary"-style title are dropped from the
/// prose; ideas are the list items that follow the marker.
pub fn split_summary(markdown: &str) -> SummarySections {
    let marker_at = markdown.to_ascii_lowercase().find(IDEAS_MARKER);
    let (head, tail) = match marker_at {
        Some(idx) => markdown.split_at(idx),
        None => (markdown, ""),
    };

    let summary = HEADING_MARKER.replace_all(head, "");
    let summary = LEADING_TITLE.replace(summary.trim(), "").into_owned();

    let ideas = tail
        .lines()
        .filter_map(|line| {
            let cleaned = HEADING_MARKER.replace(line, "");
            let cleaned = cleaned.trim();
            LIST_ITEM
                .find(cleaned)
                .map(|m| cleaned[m.end()..].to_string())
        })
        .collect();

    SummarySections { summary, ideas }
}
