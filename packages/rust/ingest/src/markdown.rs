//! Captured-article markdown parser.
//!
//! Parses the capture format produced by the upstream feed workflow:
//! - First heading: `# Title`
//! - Labeled metadata lines: `**Source:**`, `**Author:**`, `**Published:**`,
//!   `**URL:**` (unknown labels are ignored)
//! - Body text between `---` rules
//! - Trailing capture footer (`*Captured from ...*`), stripped

use std::sync::LazyLock;

use regex::Regex;

use frontpage_shared::{FrontpageError, Result};

/// Parsed representation of one captured markdown document.
#[derive(Debug, Clone)]
pub struct CaptureDoc {
    /// The H1 title. Always non-blank.
    pub title: String,
    /// Raw `**URL:**` value, if present.
    pub url: Option<String>,
    /// Raw `**Published:**` value, if present.
    pub published: Option<String>,
    /// Raw `**Source:**` value, if present.
    pub source: Option<String>,
    /// Raw `**Author:**` value, if present.
    pub author: Option<String>,
    /// Body text with metadata, rules, and the capture footer removed.
    pub body: String,
}

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// Matches `# Title` at the start of a line.
static H1_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#\s+(\S.*)$").expect("H1 regex"));

/// Matches `**Label:** value` metadata lines.
static META_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*\*([A-Za-z ]+):\*\*\s*(.*?)\s*$").expect("metadata regex"));

/// Matches the trailing capture footer.
static FOOTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*Captured from .*\*$").expect("footer regex"));

/// Matches runs of three or more newlines.
static MULTI_BLANK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("blank-line regex"));

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse one captured markdown document.
///
/// A missing or whitespace-only title heading is a validation failure.
/// A wrong title would propagate all the way to the published artifact,
/// so there is no filename fallback here.
pub(crate) fn parse_capture(text: &str) -> Result<CaptureDoc> {
    let mut title: Option<String> = None;
    let mut url = None;
    let mut published = None;
    let mut source = None;
    let mut author = None;
    let mut body_lines: Vec<&str> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();

        if title.is_none() {
            if let Some(caps) = H1_RE.captures(trimmed) {
                title = Some(caps[1].trim().to_string());
                continue;
            }
        }

        if let Some(caps) = META_RE.captures(trimmed) {
            let value = caps[2].trim();
            if value.is_empty() {
                continue;
            }
            match caps[1].to_ascii_lowercase().as_str() {
                "url" => url = Some(value.to_string()),
                "published" => published = Some(value.to_string()),
                "source" => source = Some(value.to_string()),
                "author" => author = Some(value.to_string()),
                // Unknown labels (Feed, etc.) are ignored
                _ => {}
            }
            continue;
        }

        // Horizontal rules delimit the body; the footer closes the capture
        if trimmed == "---" || FOOTER_RE.is_match(trimmed) {
            continue;
        }

        // Everything else belongs to the body, headings included
        if title.is_some() {
            body_lines.push(line);
        }
    }

    let title = title
        .ok_or_else(|| FrontpageError::validation("markdown document has no title heading"))?;

    let body = MULTI_BLANK_RE
        .replace_all(body_lines.join("\n").trim(), "\n\n")
        .to_string();

    Ok(CaptureDoc {
        title,
        url,
        published,
        source,
        author,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"# AI Breakthrough in Protein Folding

**Source:** Example Wire
**Author:** Jane Doe
**Published:** 2024-01-15 10:30:00
**URL:** https://example.com/ai-breakthrough
**Feed:** https://example.com/feed

---

Researchers announced a new model that predicts protein structures
with record accuracy.

---
*Captured from the feed reader on 2024-01-15 11:00:00*
"#;

    #[test]
    fn parse_full_capture() {
        let doc = parse_capture(SAMPLE).unwrap();
        assert_eq!(doc.title, "AI Breakthrough in Protein Folding");
        assert_eq!(doc.url.as_deref(), Some("https://example.com/ai-breakthrough"));
        assert_eq!(doc.published.as_deref(), Some("2024-01-15 10:30:00"));
        assert_eq!(doc.source.as_deref(), Some("Example Wire"));
        assert_eq!(doc.author.as_deref(), Some("Jane Doe"));
        assert!(doc.body.starts_with("Researchers announced"));
        assert!(!doc.body.contains("Captured from"));
        assert!(!doc.body.contains("**URL:**"));
    }

    #[test]
    fn missing_title_fails() {
        let text = "**URL:** https://example.com/a\n\nSome body text.\n";
        let result = parse_capture(text);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("no title heading"));
    }

    #[test]
    fn whitespace_only_title_fails() {
        let text = "#   \n\n**URL:** https://example.com/a\n";
        assert!(parse_capture(text).is_err());
    }

    #[test]
    fn minimal_document() {
        let doc = parse_capture("# Just a Title\n").unwrap();
        assert_eq!(doc.title, "Just a Title");
        assert!(doc.url.is_none());
        assert!(doc.body.is_empty());
    }

    #[test]
    fn empty_metadata_value_ignored() {
        let doc = parse_capture("# Title\n\n**URL:**   \n\nBody.\n").unwrap();
        assert!(doc.url.is_none());
        assert_eq!(doc.body, "Body.");
    }

    #[test]
    fn body_keeps_subheadings() {
        let text = "# Title\n\n---\n\nIntro.\n\n## Details\n\nMore text.\n\n---\n";
        let doc = parse_capture(text).unwrap();
        assert!(doc.body.contains("## Details"));
        assert!(doc.body.contains("More text."));
    }

    #[test]
    fn blank_runs_collapsed() {
        let text = "# Title\n\n---\n\nPara one.\n\n\n\n\nPara two.\n\n---\n";
        let doc = parse_capture(text).unwrap();
        assert_eq!(doc.body, "Para one.\n\nPara two.");
    }
}
