//! End-to-end reconciliation pipeline: raw sources → normalize → merge →
//! project → persist → notify.
//!
//! Every run reads the full prior collection and writes the full new one;
//! there is no in-place mutation of persisted state. Concurrent writers
//! must be serialized externally (a run-level lock or queue), since two
//! interleaved read-then-write runs can lose an update.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use tracing::{info, instrument, warn};

use frontpage_ingest::{IngestOptions, RawRecord, TableRow, WebhookPayload, normalize_batch};
use frontpage_publish::{PublishArtifact, notify_published, project};
use frontpage_reconcile::categories::{Slot, set_slot};
use frontpage_reconcile::merge;
use frontpage_shared::{
    AppConfig, FrontpageError, Limits, ProjectConfig, RecordFailure, Result, RunId,
};

// ---------------------------------------------------------------------------
// Config & results
// ---------------------------------------------------------------------------

/// Configuration for one pipeline run, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Directory scanned for captured `*.md` articles.
    pub articles_dir: PathBuf,
    /// Extra batch files: a JSON array of table rows, or one webhook
    /// payload object per file.
    pub batch_files: Vec<PathBuf>,
    /// Path of the persisted canonical collection.
    pub collection_path: PathBuf,
    /// Path of the published site artifact.
    pub artifact_path: PathBuf,
    /// Hero/column limits applied to the collection.
    pub limits: Limits,
    /// Normalization options.
    pub ingest: IngestOptions,
    /// Projection options.
    pub project: ProjectConfig,
    /// Publish-notification endpoint, if configured.
    pub notify_url: Option<String>,
}

impl SyncConfig {
    /// Build a run config from the application config.
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            articles_dir: PathBuf::from(&config.ingest.articles_dir),
            batch_files: Vec::new(),
            collection_path: PathBuf::from(&config.publish.collection_path),
            artifact_path: PathBuf::from(&config.publish.artifact_path),
            limits: config.limits,
            ingest: IngestOptions::from(&config.ingest),
            project: ProjectConfig::from(config),
            notify_url: config.publish.notify_url.clone(),
        }
    }
}

/// Result of one reconciliation run.
#[derive(Debug)]
pub struct SyncResult {
    /// Run identifier, also stamped on log lines.
    pub run_id: RunId,
    /// Raw records considered (markdown files + batch records).
    pub scanned: usize,
    /// Identities inserted as new articles.
    pub inserted: usize,
    /// Identities whose content changed.
    pub updated: usize,
    /// Identities re-supplied unchanged.
    pub unchanged: usize,
    /// Per-record normalization failures. Never abort a run.
    pub failures: Vec<RecordFailure>,
    /// Identities supplied twice in one batch with differing content.
    pub conflicts: Vec<String>,
    /// Collection size after the merge.
    pub article_count: usize,
    /// Where the artifact was written.
    pub artifact_path: PathBuf,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}

/// Result of a category assignment.
#[derive(Debug)]
pub struct AssignResult {
    /// Identity whose flag changed.
    pub identity: String,
    /// Heroes flagged after the call.
    pub hero_count: usize,
    /// Columns flagged after the call.
    pub column_count: usize,
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called per raw record during normalization.
    fn record_processed(&self, label: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &SyncResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn record_processed(&self, _label: &str, _current: usize, _total: usize) {}
    fn done(&self, _result: &SyncResult) {}
}

// ---------------------------------------------------------------------------
// Sync pipeline
// ---------------------------------------------------------------------------

/// Run the full reconciliation pipeline.
///
/// 1. Load the prior collection
/// 2. Scan the articles directory and read batch files
/// 3. Normalize (per-record failures collected, batch continues)
/// 4. Merge into the collection
/// 5. Project and persist collection + artifact
/// 6. Notify, if configured (delivery failure never fails the run)
#[instrument(skip_all, fields(articles_dir = %config.articles_dir.display()))]
pub async fn run_sync(
    config: &SyncConfig,
    progress: &dyn ProgressReporter,
) -> Result<SyncResult> {
    let start = Instant::now();

    progress.phase("Loading collection");
    let mut collection =
        frontpage_storage::load_collection(&config.collection_path, config.limits)?;
    collection.limits = config.limits;

    progress.phase("Scanning sources");
    let mut records = scan_articles_dir(&config.articles_dir)?;
    let mut failures: Vec<RecordFailure> = Vec::new();
    for path in &config.batch_files {
        let (batch_records, batch_failures) = read_batch_file(path);
        records.extend(batch_records);
        failures.extend(batch_failures);
    }
    let scanned = records.len() + failures.len();

    progress.phase("Normalizing records");
    let now = Utc::now();
    let total = records.len();
    for (i, record) in records.iter().enumerate() {
        progress.record_processed(&record.label(), i + 1, total);
    }
    let (articles, normalize_failures) = normalize_batch(&records, &config.ingest, now);
    failures.extend(normalize_failures);

    progress.phase("Merging");
    let (merged, mut report) = merge(collection, &articles, now);
    report.failures = failures;

    progress.phase("Publishing");
    let artifact = project(&merged, &config.project);
    frontpage_storage::save_collection(&config.collection_path, &merged)?;
    frontpage_storage::write_artifact(&config.artifact_path, &artifact)?;

    maybe_notify(config.notify_url.as_deref(), &artifact).await;

    let result = SyncResult {
        run_id: report.run_id.clone(),
        scanned,
        inserted: report.inserted,
        updated: report.updated,
        unchanged: report.unchanged,
        failures: report.failures,
        conflicts: report.conflicts,
        article_count: merged.len(),
        artifact_path: config.artifact_path.clone(),
        elapsed: start.elapsed(),
    };

    progress.done(&result);

    info!(
        run_id = %result.run_id,
        scanned = result.scanned,
        inserted = result.inserted,
        updated = result.updated,
        unchanged = result.unchanged,
        failed = result.failures.len(),
        elapsed_ms = result.elapsed.as_millis(),
        "sync complete"
    );

    Ok(result)
}

/// Ingest a single webhook payload through the same merge path.
///
/// Unlike batch runs, a validation failure here is returned to the caller
/// directly: the webhook sender needs the rejection, not a buried report
/// entry.
#[instrument(skip_all)]
pub async fn ingest_one(
    config: &SyncConfig,
    payload: WebhookPayload,
    progress: &dyn ProgressReporter,
) -> Result<SyncResult> {
    let start = Instant::now();

    progress.phase("Loading collection");
    let mut collection =
        frontpage_storage::load_collection(&config.collection_path, config.limits)?;
    collection.limits = config.limits;

    progress.phase("Normalizing record");
    let now = Utc::now();
    let record = RawRecord::Webhook(payload);
    let article = frontpage_ingest::normalize(&record, &config.ingest, now)?;

    progress.phase("Merging");
    let (merged, report) = merge(collection, &[article], now);

    progress.phase("Publishing");
    let artifact = project(&merged, &config.project);
    frontpage_storage::save_collection(&config.collection_path, &merged)?;
    frontpage_storage::write_artifact(&config.artifact_path, &artifact)?;

    maybe_notify(config.notify_url.as_deref(), &artifact).await;

    let result = SyncResult {
        run_id: report.run_id.clone(),
        scanned: 1,
        inserted: report.inserted,
        updated: report.updated,
        unchanged: report.unchanged,
        failures: report.failures,
        conflicts: report.conflicts,
        article_count: merged.len(),
        artifact_path: config.artifact_path.clone(),
        elapsed: start.elapsed(),
    };

    progress.done(&result);
    Ok(result)
}

/// Change a hero/column flag and republish the artifact.
pub async fn assign_category(
    config: &SyncConfig,
    identity: &str,
    slot: Slot,
    value: bool,
) -> Result<AssignResult> {
    let mut collection =
        frontpage_storage::load_collection(&config.collection_path, config.limits)?;
    collection.limits = config.limits;

    set_slot(&mut collection, identity, slot, value)?;

    let artifact = project(&collection, &config.project);
    frontpage_storage::save_collection(&config.collection_path, &collection)?;
    frontpage_storage::write_artifact(&config.artifact_path, &artifact)?;

    maybe_notify(config.notify_url.as_deref(), &artifact).await;

    Ok(AssignResult {
        identity: identity.to_string(),
        hero_count: collection.hero_count(),
        column_count: collection.column_count(),
    })
}

/// Re-project and publish the current collection without ingesting.
pub async fn publish_only(config: &SyncConfig) -> Result<PublishArtifact> {
    let mut collection =
        frontpage_storage::load_collection(&config.collection_path, config.limits)?;
    collection.limits = config.limits;

    let artifact = project(&collection, &config.project);
    frontpage_storage::write_artifact(&config.artifact_path, &artifact)?;

    maybe_notify(config.notify_url.as_deref(), &artifact).await;

    Ok(artifact)
}

// ---------------------------------------------------------------------------
// Source readers
// ---------------------------------------------------------------------------

/// Collect `*.md` files from the articles directory, sorted by file name
/// for deterministic batch order. A missing directory is an empty batch,
/// not an error: markdown capture may simply not be configured.
fn scan_articles_dir(dir: &Path) -> Result<Vec<RawRecord>> {
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "articles directory not found, skipping");
        return Ok(Vec::new());
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| FrontpageError::io(dir, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
        })
        .collect();
    paths.sort();

    let mut records = Vec::with_capacity(paths.len());
    for path in paths {
        let text = std::fs::read_to_string(&path).map_err(|e| FrontpageError::io(&path, e))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        records.push(RawRecord::Markdown { file_name, text });
    }

    info!(dir = %dir.display(), files = records.len(), "articles directory scanned");
    Ok(records)
}

/// Read one batch file: a JSON array parses as table rows, a single
/// object as a webhook payload. Unreadable files or malformed records
/// become failures in the run report; the run continues.
fn read_batch_file(path: &Path) -> (Vec<RawRecord>, Vec<RecordFailure>) {
    let label = path.display().to_string();

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %label, error = %e, "cannot read batch file");
            return (
                Vec::new(),
                vec![RecordFailure {
                    record: label,
                    reason: format!("cannot read batch file: {e}"),
                }],
            );
        }
    };

    let value: serde_json::Value = match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            warn!(path = %label, error = %e, "batch file is not valid JSON");
            return (
                Vec::new(),
                vec![RecordFailure {
                    record: label,
                    reason: format!("not valid JSON: {e}"),
                }],
            );
        }
    };

    match value {
        serde_json::Value::Array(items) => {
            let mut records = Vec::with_capacity(items.len());
            let mut failures = Vec::new();
            for (i, item) in items.into_iter().enumerate() {
                match serde_json::from_value::<TableRow>(item) {
                    Ok(row) => records.push(RawRecord::TableRow(row)),
                    Err(e) => failures.push(RecordFailure {
                        record: format!("{label}[{i}]"),
                        reason: format!("malformed table row: {e}"),
                    }),
                }
            }
            (records, failures)
        }
        object => match serde_json::from_value::<WebhookPayload>(object) {
            Ok(payload) => (vec![RawRecord::Webhook(payload)], Vec::new()),
            Err(e) => (
                Vec::new(),
                vec![RecordFailure {
                    record: label,
                    reason: format!("malformed webhook payload: {e}"),
                }],
            ),
        },
    }
}

/// Fire the publish notification when configured. Delivery failures are
/// logged and swallowed: the artifact is already durably written.
async fn maybe_notify(endpoint: Option<&str>, artifact: &PublishArtifact) {
    let Some(endpoint) = endpoint else {
        return;
    };
    if let Err(e) = notify_published(endpoint, artifact).await {
        warn!(endpoint, error = %e, "publish notification failed");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
