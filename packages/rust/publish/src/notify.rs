//! Fire-and-forget publish notification.
//!
//! After an artifact is written, a single event is POSTed to the configured
//! endpoint so external collaborators (site rebuild triggers, monitors) can
//! react. Delivery failures are the caller's to log; they never invalidate
//! a completed publish.

use std::time::Duration;

use tracing::info;

use frontpage_shared::{FrontpageError, Result};

use crate::PublishArtifact;

/// POST a publish event to `endpoint`.
///
/// The payload is a small summary, not the artifact itself: consumers that
/// want the full document fetch it from its published location.
pub async fn notify_published(endpoint: &str, artifact: &PublishArtifact) -> Result<()> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("frontpage/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| FrontpageError::Network(format!("client build: {e}")))?;

    let body = serde_json::json!({
        "event": "published",
        "last_updated": artifact.last_updated,
        "hero_count": artifact.heroes.len(),
        "column_count": artifact.columns.values().map(Vec::len).sum::<usize>(),
    });

    let response = client
        .post(endpoint)
        .json(&body)
        .send()
        .await
        .map_err(|e| FrontpageError::Network(format!("{endpoint}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FrontpageError::Network(format!(
            "{endpoint}: HTTP {status}"
        )));
    }

    info!(endpoint, "publish notification delivered");
    Ok(())
}
