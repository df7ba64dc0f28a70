//! Identity resolution: stable deduplication keys for articles.
//!
//! The identity of an article is its normalized URL when one is present and
//! valid, otherwise a normalized source filename, otherwise a title slug
//! plus capture date. Two records that resolve to the same identity are the
//! same logical article regardless of which source produced them.

use chrono::{DateTime, Utc};
use url::Url;

/// Maximum slug length in characters, matching the capture filename limit.
const MAX_SLUG_LEN: usize = 50;

/// Normalize a raw URL into an identity string.
///
/// Returns `None` when the value is not an absolute http(s) URL with a host,
/// which makes identity resolution fall back to filename/slug. Scheme and
/// host are lower-cased, default ports and trailing slashes dropped,
/// deny-listed tracking parameters removed, remaining query preserved in
/// input order, fragment dropped.
pub fn normalize_url(raw: &str, tracking_params: &[String]) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parsed = Url::parse(trimmed).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    let host = parsed.host_str()?;

    let mut normalized = format!("{}://{host}", parsed.scheme());
    if let Some(port) = parsed.port() {
        normalized.push(':');
        normalized.push_str(&port.to_string());
    }
    normalized.push_str(parsed.path().trim_end_matches('/'));

    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key, tracking_params))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if !kept.is_empty() {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(kept)
            .finish();
        normalized.push('?');
        normalized.push_str(&query);
    }

    Some(normalized)
}

/// Whether a query parameter name matches the tracking deny list.
/// Entries ending in `*` are prefix matches.
fn is_tracking_param(name: &str, tracking_params: &[String]) -> bool {
    let name = name.to_ascii_lowercase();
    tracking_params.iter().any(|entry| {
        let entry = entry.to_ascii_lowercase();
        match entry.strip_suffix('*') {
            Some(prefix) => name.starts_with(prefix),
            None => name == entry,
        }
    })
}

/// Identity for a record that came from a captured file: the file stem,
/// lower-cased. Capture filenames already embed the date, so same-day
/// same-title duplicates collapse correctly.
pub fn file_identity(file_name: &str) -> String {
    let stem = file_name
        .strip_suffix(".md")
        .or_else(|| file_name.strip_suffix(".MD"))
        .unwrap_or(file_name);
    stem.trim().to_lowercase()
}

/// Identity for a URL-less record: capture date plus a title slug.
/// Uniqueness is only guaranteed for same-day same-title duplicates,
/// which is the best available signal when the URL truly is absent.
pub fn slug_identity(title: &str, captured_at: DateTime<Utc>) -> String {
    format!("{}-{}", captured_at.format("%Y-%m-%d"), slug(title))
}

/// Lower-case, alphanumeric-and-dash slug of a title, truncated to the
/// capture filename limit.
pub fn slug(title: &str) -> String {
    let mut out = String::new();
    let mut last_dash = true;
    for ch in title.to_lowercase().chars() {
        if ch.is_alphanumeric() {
            out.push(ch);
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    let trimmed: String = out.trim_end_matches('-').chars().take(MAX_SLUG_LEN).collect();
    trimmed.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn deny_list() -> Vec<String> {
        ["utm_*", "fbclid", "gclid", "ref"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn url_scheme_and_host_lowercased() {
        let normalized = normalize_url("HTTPS://Example.COM/Path", &deny_list()).unwrap();
        assert_eq!(normalized, "https://example.com/Path");
    }

    #[test]
    fn url_trailing_slash_stripped() {
        let normalized = normalize_url("https://example.com/a/", &deny_list()).unwrap();
        assert_eq!(normalized, "https://example.com/a");

        let root = normalize_url("https://example.com/", &deny_list()).unwrap();
        assert_eq!(root, "https://example.com");
    }

    #[test]
    fn url_tracking_params_stripped() {
        let normalized = normalize_url(
            "https://example.com/a?utm_source=rss&utm_medium=feed&id=7",
            &deny_list(),
        )
        .unwrap();
        assert_eq!(normalized, "https://example.com/a?id=7");
    }

    #[test]
    fn url_all_params_tracking_drops_query() {
        let normalized =
            normalize_url("https://example.com/a?utm_source=rss&fbclid=xyz", &deny_list())
                .unwrap();
        assert_eq!(normalized, "https://example.com/a");
    }

    #[test]
    fn url_fragment_dropped() {
        let normalized =
            normalize_url("https://example.com/a#section-2", &deny_list()).unwrap();
        assert_eq!(normalized, "https://example.com/a");
    }

    #[test]
    fn url_default_port_dropped_explicit_kept() {
        let normalized = normalize_url("https://example.com:443/a", &deny_list()).unwrap();
        assert_eq!(normalized, "https://example.com/a");

        let explicit = normalize_url("https://example.com:8443/a", &deny_list()).unwrap();
        assert_eq!(explicit, "https://example.com:8443/a");
    }

    #[test]
    fn invalid_urls_rejected() {
        assert!(normalize_url("", &deny_list()).is_none());
        assert!(normalize_url("   ", &deny_list()).is_none());
        assert!(normalize_url("not a url", &deny_list()).is_none());
        assert!(normalize_url("ftp://example.com/file", &deny_list()).is_none());
        assert!(normalize_url("mailto:someone@example.com", &deny_list()).is_none());
        assert!(normalize_url("/relative/path", &deny_list()).is_none());
    }

    #[test]
    fn file_identity_strips_extension() {
        assert_eq!(
            file_identity("2024-01-15_AI-Breakthrough.md"),
            "2024-01-15_ai-breakthrough"
        );
        assert_eq!(file_identity("note"), "note");
    }

    #[test]
    fn slug_basic() {
        assert_eq!(slug("AI Breakthrough: Protein Folding!"), "ai-breakthrough-protein-folding");
        assert_eq!(slug("  spaced   out  "), "spaced-out");
    }

    #[test]
    fn slug_truncated() {
        let long = "word ".repeat(30);
        assert!(slug(&long).chars().count() <= MAX_SLUG_LEN);
        assert!(!slug(&long).ends_with('-'));
    }

    #[test]
    fn slug_identity_embeds_date() {
        let captured = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(
            slug_identity("AI Breakthrough", captured),
            "2024-01-15-ai-breakthrough"
        );
    }
}
