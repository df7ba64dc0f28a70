//! Core domain types for Frontpage collections.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current schema version for the persisted collection document.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for reconciliation run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Article
// ---------------------------------------------------------------------------

/// One canonical article record in the collection.
///
/// `identity` is assigned once by the identity resolver and never changes.
/// `manual_title` and `generated_title` are protected fields: the merger
/// keeps the stored values verbatim on every automated rebuild, as are the
/// `is_hero`/`is_column` flags and `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Stable deduplication key, derived from the URL or a filename/slug.
    pub identity: String,
    /// Source-provided headline.
    pub original_title: String,
    /// Human override headline. Protected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_title: Option<String>,
    /// Enrichment-produced headline. Protected, lower display priority
    /// than the manual override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_title: Option<String>,
    /// Canonical source link, if one was present and valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Publication or feed name.
    #[serde(default)]
    pub source: String,
    /// Byline, defaulted to "Unknown".
    pub author: String,
    /// Source publication instant, or capture time when the source gave none.
    pub published_at: DateTime<Utc>,
    /// Tag set used for bucket classification.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Cleaned body or summary text.
    #[serde(default)]
    pub content: String,
    /// Cover image URL, for hero display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    /// Flagged for prominent display. Mutually exclusive with `is_column`.
    #[serde(default)]
    pub is_hero: bool,
    /// Flagged for standard categorized display. Mutually exclusive with
    /// `is_hero`.
    #[serde(default)]
    pub is_column: bool,
    /// SHA-256 fingerprint of the refreshable fields, computed at
    /// normalization. The merger classifies updated-vs-unchanged by
    /// comparing fingerprints.
    pub content_hash: String,
    /// First-insertion instant. Never changed after insert.
    pub created_at: DateTime<Utc>,
    /// Refreshed whenever any field changes.
    pub updated_at: DateTime<Utc>,
}

impl Article {
    /// Resolve the display title: manual override, then generated, then
    /// original. Whitespace-only overrides count as absent.
    pub fn display_title(&self) -> &str {
        if let Some(manual) = &self.manual_title {
            if !manual.trim().is_empty() {
                return manual;
            }
        }
        if let Some(generated) = &self.generated_title {
            if !generated.trim().is_empty() {
                return generated;
            }
        }
        &self.original_title
    }
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

/// Cardinality limits for the hero and column slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    /// Maximum number of articles flagged `is_hero`.
    #[serde(default = "default_max_heroes")]
    pub max_heroes: usize,
    /// Maximum number of articles flagged `is_column`.
    #[serde(default = "default_max_columns")]
    pub max_columns: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_heroes: default_max_heroes(),
            max_columns: default_max_columns(),
        }
    }
}

fn default_max_heroes() -> usize {
    3
}
fn default_max_columns() -> usize {
    10
}

/// The canonical, insertion-ordered article collection persisted between
/// runs. Identities are unique within a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    /// Schema version for forward compatibility.
    pub schema_version: u32,
    /// Instant of the last reconciliation or category change.
    pub last_updated: DateTime<Utc>,
    /// Configured hero/column limits.
    pub limits: Limits,
    /// Articles in insertion order.
    pub articles: Vec<Article>,
}

impl Collection {
    /// Create an empty collection with the given limits.
    pub fn new(limits: Limits) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            last_updated: Utc::now(),
            limits,
            articles: Vec::new(),
        }
    }

    /// Look up an article by identity.
    pub fn get(&self, identity: &str) -> Option<&Article> {
        self.articles.iter().find(|a| a.identity == identity)
    }

    /// Look up an article by identity, mutably.
    pub fn get_mut(&mut self, identity: &str) -> Option<&mut Article> {
        self.articles.iter_mut().find(|a| a.identity == identity)
    }

    /// Whether an article with this identity exists.
    pub fn contains(&self, identity: &str) -> bool {
        self.get(identity).is_some()
    }

    /// Append a new article. The caller is responsible for identity
    /// uniqueness; the merger checks before inserting.
    pub fn push(&mut self, article: Article) {
        debug_assert!(
            !self.contains(&article.identity),
            "duplicate identity inserted: {}",
            article.identity
        );
        self.articles.push(article);
    }

    /// Number of articles in the collection.
    pub fn len(&self) -> usize {
        self.articles.len()
    }

    /// Whether the collection holds no articles.
    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    /// Count of articles currently flagged `is_hero`.
    pub fn hero_count(&self) -> usize {
        self.articles.iter().filter(|a| a.is_hero).count()
    }

    /// Count of articles currently flagged `is_column`.
    pub fn column_count(&self) -> usize {
        self.articles.iter().filter(|a| a.is_column).count()
    }
}

// ---------------------------------------------------------------------------
// RecordFailure
// ---------------------------------------------------------------------------

/// One raw record that failed normalization, kept in the run report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordFailure {
    /// Human-readable origin of the record (filename, row id, payload title).
    pub record: String,
    /// Why normalization rejected it.
    pub reason: String,
}
