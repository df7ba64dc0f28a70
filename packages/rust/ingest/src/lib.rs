//! Record normalization: raw source records into canonical [`Article`]s.
//!
//! One normalizer handles all three upstream shapes (captured markdown
//! documents, table-service rows, webhook payloads), so the merge layer
//! never sees source-specific structure. Normalization is a pure function
//! of the raw record and the capture instant; failures are per-record and
//! never abort a batch.

pub mod identity;

mod content;
mod markdown;

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use frontpage_shared::{Article, IngestSettings, RecordFailure, Result};

pub use markdown::CaptureDoc;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Options governing normalization, derived from the `[ingest]` config.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Query parameters stripped during URL normalization.
    pub tracking_params: Vec<String>,
}

impl From<&IngestSettings> for IngestOptions {
    fn from(settings: &IngestSettings) -> Self {
        Self {
            tracking_params: settings.tracking_params.clone(),
        }
    }
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self::from(&IngestSettings::default())
    }
}

// ---------------------------------------------------------------------------
// Raw records
// ---------------------------------------------------------------------------

/// One raw input record, before normalization.
#[derive(Debug, Clone)]
pub enum RawRecord {
    /// A captured markdown document plus its source filename.
    Markdown { file_name: String, text: String },
    /// One row exported from the table service.
    TableRow(TableRow),
    /// An ad-hoc webhook payload.
    Webhook(WebhookPayload),
}

impl RawRecord {
    /// Human-readable origin label used in failure reports.
    pub fn label(&self) -> String {
        match self {
            Self::Markdown { file_name, .. } => file_name.clone(),
            Self::TableRow(row) => row
                .id
                .clone()
                .or_else(|| row.title.clone())
                .or_else(|| row.url.clone())
                .unwrap_or_else(|| "table row".into()),
            Self::Webhook(payload) => payload
                .title
                .clone()
                .or_else(|| payload.url.clone())
                .unwrap_or_else(|| "webhook payload".into()),
        }
    }
}

/// One row from the table service. Unknown columns are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableRow {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Option<TagList>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub published: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
}

/// Tag column value: the table service exports either an array or a
/// comma-separated string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TagList {
    Many(Vec<String>),
    Csv(String),
}

impl TagList {
    fn into_set(self) -> BTreeSet<String> {
        let items: Vec<String> = match self {
            Self::Many(items) => items,
            Self::Csv(csv) => csv.split(',').map(String::from).collect(),
        };
        items
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

/// An ad-hoc webhook payload. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub title: Option<String>,
    /// Enrichment-produced headline, stored as `generated_title`.
    #[serde(default)]
    pub generated_title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Normalize one raw record into an [`Article`].
///
/// `now` is the capture instant: it stamps `created_at`/`updated_at` and is
/// the fallback for unparseable or missing publication timestamps.
pub fn normalize(record: &RawRecord, opts: &IngestOptions, now: DateTime<Utc>) -> Result<Article> {
    match record {
        RawRecord::Markdown { file_name, text } => normalize_markdown(file_name, text, opts, now),
        RawRecord::TableRow(row) => normalize_table_row(row, opts, now),
        RawRecord::Webhook(payload) => normalize_webhook(payload, opts, now),
    }
}

/// Normalize a whole batch, collecting per-record failures.
///
/// One bad record never aborts the batch: failures are reported and the
/// rest of the records proceed.
pub fn normalize_batch(
    records: &[RawRecord],
    opts: &IngestOptions,
    now: DateTime<Utc>,
) -> (Vec<Article>, Vec<RecordFailure>) {
    let mut articles = Vec::with_capacity(records.len());
    let mut failures = Vec::new();

    for record in records {
        match normalize(record, opts, now) {
            Ok(article) => articles.push(article),
            Err(e) => {
                debug!(record = %record.label(), error = %e, "record rejected");
                failures.push(RecordFailure {
                    record: record.label(),
                    reason: e.to_string(),
                });
            }
        }
    }

    (articles, failures)
}

fn normalize_markdown(
    file_name: &str,
    text: &str,
    opts: &IngestOptions,
    now: DateTime<Utc>,
) -> Result<Article> {
    let doc = markdown::parse_capture(text)?;

    let url = doc
        .url
        .as_deref()
        .and_then(|u| identity::normalize_url(u, &opts.tracking_params));
    let identity = url
        .clone()
        .unwrap_or_else(|| identity::file_identity(file_name));

    Ok(build_article(ArticleFields {
        identity,
        original_title: doc.title,
        generated_title: None,
        url,
        source: doc.source.unwrap_or_default(),
        author: non_blank(doc.author).unwrap_or_else(default_author),
        published_at: parse_published(doc.published.as_deref(), now),
        tags: BTreeSet::from([default_category()]),
        content: doc.body,
        cover_image: None,
        now,
    }))
}

fn normalize_table_row(row: &TableRow, opts: &IngestOptions, now: DateTime<Utc>) -> Result<Article> {
    let title = non_blank(row.title.clone())
        .ok_or_else(|| frontpage_shared::FrontpageError::validation("table row has no title"))?;

    let url = row
        .url
        .as_deref()
        .and_then(|u| identity::normalize_url(u, &opts.tracking_params));
    let identity = url
        .clone()
        .unwrap_or_else(|| identity::slug_identity(&title, now));

    let mut tags = row.tags.clone().map(TagList::into_set).unwrap_or_default();
    if tags.is_empty() {
        tags.insert(default_category());
    }

    Ok(build_article(ArticleFields {
        identity,
        original_title: title,
        generated_title: None,
        url,
        source: non_blank(row.source.clone()).unwrap_or_default(),
        author: non_blank(row.author.clone()).unwrap_or_else(default_author),
        published_at: parse_published(row.published.as_deref(), now),
        tags,
        content: row
            .content
            .as_deref()
            .map(content::clean_content)
            .unwrap_or_default(),
        cover_image: non_blank(row.cover_image.clone()),
        now,
    }))
}

fn normalize_webhook(
    payload: &WebhookPayload,
    opts: &IngestOptions,
    now: DateTime<Utc>,
) -> Result<Article> {
    let title = non_blank(payload.title.clone()).ok_or_else(|| {
        frontpage_shared::FrontpageError::validation("webhook payload has no title")
    })?;

    let url = payload
        .url
        .as_deref()
        .and_then(|u| identity::normalize_url(u, &opts.tracking_params));
    let identity = url
        .clone()
        .unwrap_or_else(|| identity::slug_identity(&title, now));

    let category = non_blank(payload.category.clone()).unwrap_or_else(default_category);

    Ok(build_article(ArticleFields {
        identity,
        original_title: title,
        generated_title: non_blank(payload.generated_title.clone()),
        url,
        source: non_blank(payload.source.clone()).unwrap_or_default(),
        author: non_blank(payload.author.clone()).unwrap_or_else(default_author),
        published_at: parse_published(payload.date.as_deref(), now),
        tags: BTreeSet::from([category]),
        content: payload
            .content
            .as_deref()
            .map(content::clean_content)
            .unwrap_or_default(),
        cover_image: non_blank(payload.cover_image.clone()),
        now,
    }))
}

// ---------------------------------------------------------------------------
// Field assembly
// ---------------------------------------------------------------------------

struct ArticleFields {
    identity: String,
    original_title: String,
    generated_title: Option<String>,
    url: Option<String>,
    source: String,
    author: String,
    published_at: DateTime<Utc>,
    tags: BTreeSet<String>,
    content: String,
    cover_image: Option<String>,
    now: DateTime<Utc>,
}

fn build_article(fields: ArticleFields) -> Article {
    let mut article = Article {
        identity: fields.identity,
        original_title: fields.original_title,
        manual_title: None,
        generated_title: fields.generated_title,
        url: fields.url,
        source: fields.source,
        author: fields.author,
        published_at: fields.published_at,
        tags: fields.tags,
        content: fields.content,
        cover_image: fields.cover_image,
        is_hero: false,
        is_column: false,
        content_hash: String::new(),
        created_at: fields.now,
        updated_at: fields.now,
    };
    article.content_hash = fingerprint(&article);
    article
}

/// SHA-256 fingerprint of an article's refreshable fields.
///
/// Protected fields, category flags, and timestamps stamped by the merger
/// are excluded, so the fingerprint answers exactly one question: would a
/// re-merge of this record change the stored content?
pub fn fingerprint(article: &Article) -> String {
    let published_at = article.published_at.to_rfc3339();
    let mut hasher = Sha256::new();
    for part in [
        article.original_title.as_str(),
        article.url.as_deref().unwrap_or(""),
        article.source.as_str(),
        article.author.as_str(),
        published_at.as_str(),
        article.content.as_str(),
        article.cover_image.as_deref().unwrap_or(""),
    ] {
        hasher.update(part.as_bytes());
        hasher.update([0x1f]);
    }
    for tag in &article.tags {
        hasher.update(tag.as_bytes());
        hasher.update([0x1f]);
    }
    format!("{:x}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn default_author() -> String {
    "Unknown".into()
}

fn default_category() -> String {
    "general".into()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a publication timestamp in any of the formats the sources emit.
/// Unparseable or missing values default to the capture instant: a wrong
/// guess at source time would corrupt ordering downstream.
fn parse_published(raw: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return now;
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Utc);
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Utc.from_utc_datetime(&naive);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN));
    }
    if let Ok(secs) = raw.parse::<i64>() {
        if let Some(dt) = Utc.timestamp_opt(secs, 0).single() {
            return dt;
        }
    }

    debug!(raw, "unparseable published timestamp, using capture time");
    now
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
