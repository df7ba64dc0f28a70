//! Reconciliation: merge freshly normalized batches into the canonical
//! collection without losing protected edits.
//!
//! The merger is additive and refreshing, never pruning: articles absent
//! from one capture run are retained unchanged, because upstream sources
//! are not guaranteed to be exhaustive on every run. Removal is an explicit
//! external operation.

pub mod categories;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

use frontpage_shared::{Article, Collection, RecordFailure, RunId};

// ---------------------------------------------------------------------------
// Merge report
// ---------------------------------------------------------------------------

/// Summary of one reconciliation run, produced regardless of outcome and
/// suitable for logs or a UI.
#[derive(Debug, Clone, Serialize)]
pub struct MergeReport {
    /// Time-sortable identifier for this run.
    pub run_id: RunId,
    /// Identities inserted as new articles.
    pub inserted: usize,
    /// Identities whose refreshable fields changed.
    pub updated: usize,
    /// Identities re-supplied with identical content.
    pub unchanged: usize,
    /// Identities supplied more than once in the batch with differing
    /// content. Applied in input order, reported here.
    pub conflicts: Vec<String>,
    /// Raw records that failed normalization upstream of the merge.
    pub failures: Vec<RecordFailure>,
}

impl MergeReport {
    fn new() -> Self {
        Self {
            run_id: RunId::new(),
            inserted: 0,
            updated: 0,
            unchanged: 0,
            conflicts: Vec::new(),
            failures: Vec::new(),
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Outcome {
    Inserted,
    Updated,
    Unchanged,
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Merge a normalized batch into the collection.
///
/// New identities are inserted with `created_at = updated_at = now`.
/// Existing identities have their refreshable fields replaced and
/// `updated_at` bumped, while the protected fields (`manual_title`,
/// `generated_title`, the hero/column flags) and `created_at` keep their
/// stored values verbatim. A content-fingerprint match leaves the stored
/// article untouched, so re-merging an unchanged batch is a no-op apart
/// from `last_updated`.
///
/// Batches carrying two records for one identity apply in input order
/// (the later record wins for refreshable fields) and the identity is
/// reported as a conflict when the two disagree.
#[instrument(skip_all, fields(existing = collection.len(), batch = batch.len()))]
pub fn merge(
    mut collection: Collection,
    batch: &[Article],
    now: DateTime<Utc>,
) -> (Collection, MergeReport) {
    let mut report = MergeReport::new();
    let mut outcomes: HashMap<String, Outcome> = HashMap::new();
    let mut batch_hashes: HashMap<String, String> = HashMap::new();

    for incoming in batch {
        if let Some(prior_hash) = batch_hashes.get(&incoming.identity) {
            if prior_hash != &incoming.content_hash
                && !report.conflicts.contains(&incoming.identity)
            {
                warn!(
                    identity = %incoming.identity,
                    "batch carries conflicting records for one identity, applying in input order"
                );
                report.conflicts.push(incoming.identity.clone());
            }
        }
        batch_hashes.insert(incoming.identity.clone(), incoming.content_hash.clone());

        match collection.get_mut(&incoming.identity) {
            None => {
                let mut article = incoming.clone();
                article.created_at = now;
                article.updated_at = now;
                collection.push(article);
                outcomes.insert(incoming.identity.clone(), Outcome::Inserted);
            }
            Some(stored) => {
                if stored.content_hash == incoming.content_hash {
                    outcomes
                        .entry(incoming.identity.clone())
                        .or_insert(Outcome::Unchanged);
                } else {
                    refresh(stored, incoming, now);
                    // An identity inserted earlier in this batch stays
                    // counted as an insert
                    if outcomes.get(&incoming.identity) != Some(&Outcome::Inserted) {
                        outcomes.insert(incoming.identity.clone(), Outcome::Updated);
                    }
                }
            }
        }
    }

    for outcome in outcomes.values() {
        match outcome {
            Outcome::Inserted => report.inserted += 1,
            Outcome::Updated => report.updated += 1,
            Outcome::Unchanged => report.unchanged += 1,
        }
    }

    collection.last_updated = now;

    info!(
        run_id = %report.run_id,
        inserted = report.inserted,
        updated = report.updated,
        unchanged = report.unchanged,
        conflicts = report.conflicts.len(),
        total = collection.len(),
        "merge complete"
    );

    (collection, report)
}

/// Replace the refreshable fields of a stored article from an incoming one.
/// Protected fields, `identity`, and `created_at` are untouched.
fn refresh(stored: &mut Article, incoming: &Article, now: DateTime<Utc>) {
    stored.original_title = incoming.original_title.clone();
    stored.url = incoming.url.clone();
    stored.source = incoming.source.clone();
    stored.author = incoming.author.clone();
    stored.published_at = incoming.published_at;
    stored.tags = incoming.tags.clone();
    stored.content = incoming.content.clone();
    stored.cover_image = incoming.cover_image.clone();
    stored.content_hash = incoming.content_hash.clone();
    stored.updated_at = now;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use frontpage_shared::Limits;
    use frontpage_ingest::{IngestOptions, RawRecord, normalize};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 20, 12, 0, 0).unwrap()
    }

    fn t1() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 21, 12, 0, 0).unwrap()
    }

    fn article_from_markdown(file_name: &str, text: &str, now: DateTime<Utc>) -> Article {
        normalize(
            &RawRecord::Markdown {
                file_name: file_name.into(),
                text: text.into(),
            },
            &IngestOptions::default(),
            now,
        )
        .expect("normalize test record")
    }

    fn simple(title: &str, url: &str, now: DateTime<Utc>) -> Article {
        // Fixed publication date: undated records default published_at to
        // the capture instant, which reads as a content change across runs
        article_from_markdown(
            "test.md",
            &format!(
                "# {title}\n\n**Published:** 2024-01-10 08:00:00\n**URL:** {url}\n\n---\n\nBody of {title}.\n"
            ),
            now,
        )
    }

    #[test]
    fn insert_into_empty_collection() {
        let batch = vec![simple("AI Breakthrough", "https://x.com/a", t0())];
        let (merged, report) = merge(Collection::new(Limits::default()), &batch, t0());

        assert_eq!(merged.len(), 1);
        assert_eq!(report.inserted, 1);
        assert_eq!(report.updated, 0);
        assert_eq!(report.unchanged, 0);

        let article = merged.get("https://x.com/a").unwrap();
        assert_eq!(article.created_at, article.updated_at);
        assert_eq!(merged.last_updated, t0());
    }

    #[test]
    fn remerge_is_idempotent() {
        let batch = vec![
            simple("One", "https://x.com/1", t0()),
            simple("Two", "https://x.com/2", t0()),
        ];
        let (first, _) = merge(Collection::new(Limits::default()), &batch, t0());
        let (second, report) = merge(first.clone(), &batch, t1());

        assert_eq!(report.inserted, 0);
        assert_eq!(report.updated, 0);
        assert_eq!(report.unchanged, 2);

        // Identical apart from last_updated
        let mut second_cmp = second.clone();
        second_cmp.last_updated = first.last_updated;
        assert_eq!(first, second_cmp);
    }

    #[test]
    fn manual_title_survives_rebuild() {
        let batch = vec![simple("Original Title", "https://x.com/a", t0())];
        let (mut collection, _) = merge(Collection::new(Limits::default()), &batch, t0());
        collection.get_mut("https://x.com/a").unwrap().manual_title = Some("Custom".into());

        let rebatch = vec![simple("New Title", "https://x.com/a", t1())];
        let (merged, report) = merge(collection, &rebatch, t1());

        let article = merged.get("https://x.com/a").unwrap();
        assert_eq!(article.original_title, "New Title");
        assert_eq!(article.manual_title.as_deref(), Some("Custom"));
        assert_eq!(report.updated, 1);
    }

    #[test]
    fn flags_and_created_at_survive_rebuild() {
        let batch = vec![simple("Original", "https://x.com/a", t0())];
        let (mut collection, _) = merge(Collection::new(Limits::default()), &batch, t0());
        {
            let stored = collection.get_mut("https://x.com/a").unwrap();
            stored.is_hero = true;
            stored.generated_title = Some("Catchy".into());
        }

        let rebatch = vec![simple("Refreshed", "https://x.com/a", t1())];
        let (merged, _) = merge(collection, &rebatch, t1());

        let article = merged.get("https://x.com/a").unwrap();
        assert!(article.is_hero);
        assert_eq!(article.generated_title.as_deref(), Some("Catchy"));
        assert_eq!(article.created_at, t0());
        assert_eq!(article.updated_at, t1());
    }

    #[test]
    fn absent_articles_retained() {
        let batch = vec![
            simple("Keep Me", "https://x.com/keep", t0()),
            simple("Also Keep", "https://x.com/also", t0()),
        ];
        let (collection, _) = merge(Collection::new(Limits::default()), &batch, t0());

        // Next run only re-supplies one of the two
        let partial = vec![simple("Keep Me", "https://x.com/keep", t1())];
        let (merged, report) = merge(collection, &partial, t1());

        assert_eq!(merged.len(), 2);
        assert!(merged.contains("https://x.com/also"));
        assert_eq!(report.unchanged, 1);
    }

    #[test]
    fn unchanged_article_not_touched() {
        let batch = vec![simple("Stable", "https://x.com/s", t0())];
        let (collection, _) = merge(Collection::new(Limits::default()), &batch, t0());
        let before = collection.get("https://x.com/s").unwrap().clone();

        let (merged, report) = merge(collection, &batch, t1());
        let after = merged.get("https://x.com/s").unwrap();

        assert_eq!(report.unchanged, 1);
        assert_eq!(before, *after);
        assert_eq!(after.updated_at, t0());
    }

    #[test]
    fn in_batch_duplicates_apply_in_order() {
        let batch = vec![
            simple("First Version", "https://x.com/dup", t0()),
            simple("Second Version", "https://x.com/dup", t0()),
        ];
        let (merged, report) = merge(Collection::new(Limits::default()), &batch, t0());

        assert_eq!(merged.len(), 1);
        // The later record wins for refreshable fields
        assert_eq!(
            merged.get("https://x.com/dup").unwrap().original_title,
            "Second Version"
        );
        // One logical insert, flagged as a conflict
        assert_eq!(report.inserted, 1);
        assert_eq!(report.updated, 0);
        assert_eq!(report.conflicts, vec!["https://x.com/dup".to_string()]);
    }

    #[test]
    fn in_batch_identical_duplicates_are_not_conflicts() {
        let batch = vec![
            simple("Same", "https://x.com/same", t0()),
            simple("Same", "https://x.com/same", t0()),
        ];
        let (_, report) = merge(Collection::new(Limits::default()), &batch, t0());
        assert!(report.conflicts.is_empty());
        assert_eq!(report.inserted, 1);
    }

    #[test]
    fn merge_order_deterministic_across_identities() {
        let batch = vec![
            simple("B", "https://x.com/b", t0()),
            simple("A", "https://x.com/a", t0()),
        ];
        let (merged, _) = merge(Collection::new(Limits::default()), &batch, t0());
        // Insertion order is batch order
        assert_eq!(merged.articles[0].identity, "https://x.com/b");
        assert_eq!(merged.articles[1].identity, "https://x.com/a");
    }

    #[test]
    fn empty_batch_only_touches_last_updated() {
        let batch = vec![simple("Solo", "https://x.com/solo", t0())];
        let (collection, _) = merge(Collection::new(Limits::default()), &batch, t0());

        let (merged, report) = merge(collection.clone(), &[], t1());
        assert_eq!(report.inserted + report.updated + report.unchanged, 0);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.last_updated, t1());
    }
}
