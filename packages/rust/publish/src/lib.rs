//! Site transformation: project the canonical collection into the
//! display-ready artifact consumed by the static front end.
//!
//! The projection is pure and deterministic: the same collection content
//! always produces a byte-identical artifact, independent of collection
//! order. Hero selection, bucket classification, and per-bucket caps all
//! happen here; the collection itself is never mutated.

mod notify;

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use frontpage_shared::{Article, BucketRule, Collection, ColumnPolicy, ProjectConfig};

pub use notify::notify_published;

// ---------------------------------------------------------------------------
// Artifact types
// ---------------------------------------------------------------------------

/// The published JSON document. Always fully shaped: an empty collection
/// projects to empty arrays, never a malformed or partial document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishArtifact {
    /// Collection `last_updated`, as epoch milliseconds.
    pub last_updated: i64,
    /// Featured articles, most recent first.
    pub heroes: Vec<HeroEntry>,
    /// Bucketed articles by bucket name.
    pub columns: BTreeMap<String, Vec<ColumnEntry>>,
}

/// Display projection of a hero article. All three title fields are kept
/// so the consumer can apply the precedence rule itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeroEntry {
    pub manual_title: Option<String>,
    pub generated_title: Option<String>,
    pub original_title: String,
    pub url: String,
    pub image: Option<String>,
    pub source: String,
    /// Epoch milliseconds.
    pub published_at: i64,
}

/// Display projection of a bucketed article. Same shape as a hero minus
/// the image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnEntry {
    pub manual_title: Option<String>,
    pub generated_title: Option<String>,
    pub original_title: String,
    pub url: String,
    pub source: String,
    /// Epoch milliseconds.
    pub published_at: i64,
}

impl HeroEntry {
    fn from_article(article: &Article) -> Self {
        Self {
            manual_title: article.manual_title.clone(),
            generated_title: article.generated_title.clone(),
            original_title: article.original_title.clone(),
            url: article.url.clone().unwrap_or_default(),
            image: article.cover_image.clone(),
            source: article.source.clone(),
            published_at: article.published_at.timestamp_millis(),
        }
    }
}

impl ColumnEntry {
    fn from_article(article: &Article) -> Self {
        Self {
            manual_title: article.manual_title.clone(),
            generated_title: article.generated_title.clone(),
            original_title: article.original_title.clone(),
            url: article.url.clone().unwrap_or_default(),
            source: article.source.clone(),
            published_at: article.published_at.timestamp_millis(),
        }
    }
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

/// Project the collection into the publish artifact.
///
/// Heroes: up to `max_heroes` articles flagged `is_hero`, ordered by
/// `published_at` descending with identity as the tie-break. Columns: the
/// remaining pool (per the configured policy) partitioned into buckets by
/// first-match-wins keyword rules, unmatched articles landing in the
/// default bucket, each bucket capped at `max_per_bucket`.
pub fn project(collection: &Collection, config: &ProjectConfig) -> PublishArtifact {
    let mut heroes: Vec<&Article> = collection.articles.iter().filter(|a| a.is_hero).collect();
    sort_recent_first(&mut heroes);
    heroes.truncate(collection.limits.max_heroes);

    let hero_ids: HashSet<&str> = heroes.iter().map(|a| a.identity.as_str()).collect();

    let mut pool: Vec<&Article> = collection
        .articles
        .iter()
        .filter(|a| !hero_ids.contains(a.identity.as_str()))
        .filter(|a| match config.column_policy {
            ColumnPolicy::AllNonHero => true,
            ColumnPolicy::FlaggedOnly => a.is_column,
        })
        .collect();
    sort_recent_first(&mut pool);

    // Every configured bucket appears in the artifact, empty or not
    let mut columns: BTreeMap<String, Vec<ColumnEntry>> = BTreeMap::new();
    for rule in &config.buckets {
        columns.insert(rule.name.clone(), Vec::new());
    }
    columns.insert(config.default_bucket.clone(), Vec::new());

    let mut overflow = 0usize;
    for article in pool {
        let bucket = classify(article, config);
        let entries = columns
            .entry(bucket.to_string())
            .or_default();
        if entries.len() < config.max_per_bucket {
            entries.push(ColumnEntry::from_article(article));
        } else {
            overflow += 1;
        }
    }
    if overflow > 0 {
        debug!(overflow, "articles dropped from the artifact by bucket caps");
    }

    let artifact = PublishArtifact {
        last_updated: collection.last_updated.timestamp_millis(),
        heroes: heroes.iter().map(|a| HeroEntry::from_article(a)).collect(),
        columns,
    };

    debug!(
        heroes = artifact.heroes.len(),
        buckets = artifact.columns.len(),
        "collection projected"
    );

    artifact
}

/// Classify one article into a bucket name. Total and deterministic:
/// the first rule in configured order with a matching keyword wins,
/// otherwise the default bucket.
fn classify<'a>(article: &Article, config: &'a ProjectConfig) -> &'a str {
    for rule in &config.buckets {
        if rule_matches(rule, article) {
            return &rule.name;
        }
    }
    &config.default_bucket
}

/// A rule matches when any keyword equals one of the article's tags or
/// appears in its source name, case-insensitively.
fn rule_matches(rule: &BucketRule, article: &Article) -> bool {
    let source = article.source.to_lowercase();
    rule.keywords.iter().any(|keyword| {
        let keyword = keyword.to_lowercase();
        article.tags.iter().any(|tag| tag.to_lowercase() == keyword)
            || (!source.is_empty() && source.contains(&keyword))
    })
}

/// Most recent first; equal timestamps break by identity ordering so the
/// output is deterministic.
fn sort_recent_first(articles: &mut [&Article]) {
    articles.sort_by(|a, b| {
        b.published_at
            .cmp(&a.published_at)
            .then_with(|| a.identity.cmp(&b.identity))
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
