//! Collection and artifact persistence.
//!
//! The pipeline is single-writer, batch-at-a-time: one run reads the full
//! prior collection, computes the merge in memory, and writes the full new
//! document. Both documents are written all-or-nothing (temp file plus
//! rename), so an aborted run leaves the previously persisted state
//! untouched.
//!
//! A missing collection file is a first run and loads as an empty
//! collection; an unreadable or unparseable file is fatal. Resetting on a
//! parse error would silently drop every protected edit.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info};

use frontpage_publish::PublishArtifact;
use frontpage_shared::{CURRENT_SCHEMA_VERSION, Collection, FrontpageError, Limits, Result};

/// Load the canonical collection from `path`.
pub fn load_collection(path: &Path, limits: Limits) -> Result<Collection> {
    if !path.exists() {
        info!(path = %path.display(), "no prior collection, starting empty");
        return Ok(Collection::new(limits));
    }

    let content = std::fs::read_to_string(path).map_err(|e| FrontpageError::io(path, e))?;
    let collection: Collection = serde_json::from_str(&content).map_err(|e| {
        FrontpageError::persistence(format!(
            "invalid collection document {}: {e}",
            path.display()
        ))
    })?;

    if collection.schema_version > CURRENT_SCHEMA_VERSION {
        return Err(FrontpageError::persistence(format!(
            "collection schema v{} is newer than supported v{}",
            collection.schema_version, CURRENT_SCHEMA_VERSION
        )));
    }

    let mut seen: HashSet<&str> = HashSet::with_capacity(collection.articles.len());
    for article in &collection.articles {
        if !seen.insert(article.identity.as_str()) {
            return Err(FrontpageError::persistence(format!(
                "duplicate identity '{}' in {}",
                article.identity,
                path.display()
            )));
        }
    }

    debug!(
        path = %path.display(),
        articles = collection.len(),
        "collection loaded"
    );
    Ok(collection)
}

/// Persist the canonical collection to `path`, all-or-nothing.
pub fn save_collection(path: &Path, collection: &Collection) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(collection)
        .map_err(|e| FrontpageError::persistence(format!("serialize collection: {e}")))?;
    write_atomic(path, &bytes)?;
    info!(
        path = %path.display(),
        articles = collection.len(),
        "collection saved"
    );
    Ok(())
}

/// Write the publish artifact to `path`, all-or-nothing.
pub fn write_artifact(path: &Path, artifact: &PublishArtifact) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(artifact)
        .map_err(|e| FrontpageError::persistence(format!("serialize artifact: {e}")))?;
    write_atomic(path, &bytes)?;
    info!(
        path = %path.display(),
        heroes = artifact.heroes.len(),
        "artifact written"
    );
    Ok(())
}

/// Write to a temp sibling, then rename over the target. A failure at any
/// point leaves the previous file intact.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| FrontpageError::io(parent, e))?;
        }
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| FrontpageError::persistence(format!("invalid path {}", path.display())))?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    std::fs::write(&tmp, bytes).map_err(|e| FrontpageError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        FrontpageError::io(path, e)
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};
    use std::path::PathBuf;

    use chrono::{TimeZone, Utc};
    use frontpage_shared::Article;
    use uuid::Uuid;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("frontpage_test_{}_{name}", Uuid::now_v7()))
    }

    fn make_article(identity: &str) -> Article {
        let t = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        Article {
            identity: identity.into(),
            original_title: "Title".into(),
            manual_title: None,
            generated_title: None,
            url: Some(format!("https://x.com/{identity}")),
            source: String::new(),
            author: "Unknown".into(),
            published_at: t,
            tags: BTreeSet::from(["general".to_string()]),
            content: String::new(),
            cover_image: None,
            is_hero: false,
            is_column: false,
            content_hash: identity.into(),
            created_at: t,
            updated_at: t,
        }
    }

    #[test]
    fn missing_file_loads_empty() {
        let path = temp_path("missing.json");
        let limits = Limits {
            max_heroes: 5,
            max_columns: 7,
        };
        let collection = load_collection(&path, limits).expect("load");
        assert!(collection.is_empty());
        assert_eq!(collection.limits, limits);
    }

    #[test]
    fn save_and_reload_roundtrip() {
        let path = temp_path("roundtrip.json");
        let mut collection = Collection::new(Limits::default());
        let mut article = make_article("a");
        article.manual_title = Some("Kept".into());
        collection.push(article);

        save_collection(&path, &collection).expect("save");
        let loaded = load_collection(&path, Limits::default()).expect("reload");

        assert_eq!(loaded, collection);
        assert_eq!(loaded.get("a").unwrap().manual_title.as_deref(), Some("Kept"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn corrupt_file_is_fatal() {
        let path = temp_path("corrupt.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = load_collection(&path, Limits::default());
        assert!(matches!(result, Err(FrontpageError::Persistence { .. })));

        // The corrupt file was not replaced or removed
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn duplicate_identities_rejected() {
        let path = temp_path("dupes.json");
        let mut collection = Collection::new(Limits::default());
        collection.articles.push(make_article("a"));
        collection.articles.push(make_article("a"));
        let bytes = serde_json::to_vec(&collection).unwrap();
        std::fs::write(&path, bytes).unwrap();

        let result = load_collection(&path, Limits::default());
        assert!(matches!(result, Err(FrontpageError::Persistence { .. })));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn newer_schema_rejected() {
        let path = temp_path("future.json");
        let mut collection = Collection::new(Limits::default());
        collection.schema_version = CURRENT_SCHEMA_VERSION + 1;
        std::fs::write(&path, serde_json::to_vec(&collection).unwrap()).unwrap();

        let result = load_collection(&path, Limits::default());
        assert!(matches!(result, Err(FrontpageError::Persistence { .. })));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn fixture_collection_loads() {
        let path = PathBuf::from("../../../fixtures/json/collection.fixture.json");
        let collection = load_collection(&path, Limits::default()).expect("load fixture");
        assert_eq!(collection.len(), 1);
        let article = collection.get("https://example.com/ai-breakthrough").unwrap();
        assert_eq!(article.manual_title.as_deref(), Some("Protein Folding, Solved?"));
        assert!(article.is_hero);
    }

    #[test]
    fn artifact_write_creates_parent_dirs() {
        let dir = temp_path("artifact_dir");
        let path = dir.join("data").join("articles.json");
        let artifact = PublishArtifact {
            last_updated: 1_705_315_800_000,
            heroes: vec![],
            columns: BTreeMap::from([("news".to_string(), vec![])]),
        };

        write_artifact(&path, &artifact).expect("write artifact");
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"news\""));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn no_temp_file_left_behind() {
        let path = temp_path("clean.json");
        let collection = Collection::new(Limits::default());
        save_collection(&path, &collection).expect("save");

        let mut tmp_name = path.file_name().unwrap().to_os_string();
        tmp_name.push(".tmp");
        assert!(!path.with_file_name(tmp_name).exists());
        let _ = std::fs::remove_file(&path);
    }
}
