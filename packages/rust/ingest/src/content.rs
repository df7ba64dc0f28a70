//! Content cleanup for webhook/table records.
//!
//! Upstream sources embed HTML fragments in their content fields. The
//! cleanup converts them to markdown text via `htmd`, with a plain-text
//! extraction fallback, so the stored content is display-ready.

use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;

/// Matches anything that looks like an HTML tag.
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[a-zA-Z][^>]*>").expect("tag regex"));

/// Matches whole `<script>`/`<style>` blocks, content included.
static SCRIPT_STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?si)<(?:script|style)\b[^>]*>.*?</(?:script|style)>").expect("script regex")
});

/// Matches runs of three or more newlines.
static MULTI_BLANK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("blank-line regex"));

/// Clean one raw content field into markdown-ish text.
///
/// Plain text passes through with whitespace normalization only. HTML
/// fragments are converted to markdown (scripts and styles dropped,
/// inline markup flattened to `**`/`*`/link syntax).
pub(crate) fn clean_content(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    if !TAG_RE.is_match(trimmed) {
        return collapse_blank_lines(trimmed);
    }

    let without_scripts = SCRIPT_STYLE_RE.replace_all(trimmed, "");

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "nav", "iframe", "noscript", "svg"])
        .build();

    match converter.convert(&without_scripts) {
        Ok(markdown) => collapse_blank_lines(markdown.trim()),
        Err(e) => {
            tracing::debug!(error = %e, "markdown conversion failed, extracting text");
            extract_text(&without_scripts)
        }
    }
}

/// Plain-text extraction fallback: parse the fragment and join text nodes.
fn extract_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let parts: Vec<&str> = fragment
        .root_element()
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();
    parts.join(" ")
}

/// Collapse runs of blank lines into a single paragraph break.
fn collapse_blank_lines(text: &str) -> String {
    MULTI_BLANK_RE.replace_all(text, "\n\n").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(clean_content("Just a sentence."), "Just a sentence.");
        assert_eq!(clean_content("  padded  "), "padded");
        assert_eq!(clean_content(""), "");
    }

    #[test]
    fn html_converted_to_markdown() {
        let html = "<p>A <strong>bold</strong> claim with a <a href=\"https://example.com\">link</a>.</p>";
        let cleaned = clean_content(html);
        assert!(cleaned.contains("**bold**"));
        assert!(cleaned.contains("[link](https://example.com)"));
        assert!(!cleaned.contains("<p>"));
    }

    #[test]
    fn scripts_and_styles_dropped() {
        let html = "<p>Visible.</p><script>alert('no');</script><style>p { color: red }</style>";
        let cleaned = clean_content(html);
        assert!(cleaned.contains("Visible."));
        assert!(!cleaned.contains("alert"));
        assert!(!cleaned.contains("color"));
    }

    #[test]
    fn blank_runs_collapsed() {
        let text = "Para one.\n\n\n\n\nPara two.";
        assert_eq!(clean_content(text), "Para one.\n\nPara two.");
    }

    #[test]
    fn extract_text_fallback_joins_nodes() {
        let text = extract_text("<div><p>One</p><p>Two</p></div>");
        assert_eq!(text, "One Two");
    }
}
