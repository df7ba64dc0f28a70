//! Application configuration for Frontpage.
//!
//! User config lives at `~/.frontpage/frontpage.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FrontpageError, Result};
use crate::types::Limits;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "frontpage.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".frontpage";

// ---------------------------------------------------------------------------
// Config structs (matching frontpage.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Hero/column cardinality limits.
    #[serde(default)]
    pub limits: Limits,

    /// Ingestion settings.
    #[serde(default)]
    pub ingest: IngestSettings,

    /// Publication settings.
    #[serde(default)]
    pub publish: PublishSettings,

    /// Ordered bucket rules; array order is the match-priority order.
    #[serde(default = "default_buckets")]
    pub buckets: Vec<BucketRule>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            ingest: IngestSettings::default(),
            publish: PublishSettings::default(),
            buckets: default_buckets(),
        }
    }
}

/// `[ingest]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSettings {
    /// Directory scanned for captured markdown articles.
    #[serde(default = "default_articles_dir")]
    pub articles_dir: String,

    /// Query parameters stripped during URL normalization. Entries ending
    /// in `*` are prefix matches.
    #[serde(default = "default_tracking_params")]
    pub tracking_params: Vec<String>,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            articles_dir: default_articles_dir(),
            tracking_params: default_tracking_params(),
        }
    }
}

fn default_articles_dir() -> String {
    "articles".into()
}

fn default_tracking_params() -> Vec<String> {
    ["utm_*", "fbclid", "gclid", "mc_cid", "mc_eid", "ref"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// `[publish]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishSettings {
    /// Path of the persisted canonical collection.
    #[serde(default = "default_collection_path")]
    pub collection_path: String,

    /// Path of the published site artifact.
    #[serde(default = "default_artifact_path")]
    pub artifact_path: String,

    /// Which articles feed the column buckets.
    #[serde(default)]
    pub column_policy: ColumnPolicy,

    /// Bucket name for articles no rule matches.
    #[serde(default = "default_bucket_name")]
    pub default_bucket: String,

    /// Upper bound on articles kept per bucket in the artifact.
    #[serde(default = "default_max_per_bucket")]
    pub max_per_bucket: usize,

    /// Endpoint for the fire-and-forget publish notification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_url: Option<String>,
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            collection_path: default_collection_path(),
            artifact_path: default_artifact_path(),
            column_policy: ColumnPolicy::default(),
            default_bucket: default_bucket_name(),
            max_per_bucket: default_max_per_bucket(),
            notify_url: None,
        }
    }
}

fn default_collection_path() -> String {
    "articles.json".into()
}
fn default_artifact_path() -> String {
    "data/articles.json".into()
}
fn default_bucket_name() -> String {
    "news".into()
}
fn default_max_per_bucket() -> usize {
    10
}

/// Which articles are partitioned into column buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColumnPolicy {
    /// Every article not selected as a hero.
    #[default]
    AllNonHero,
    /// Only articles explicitly flagged `is_column`.
    FlaggedOnly,
}

/// `[[buckets]]` entry: one named bucket and its match keywords.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketRule {
    /// Bucket name as it appears in the published artifact.
    pub name: String,
    /// Keywords matched case-insensitively against article tags and source.
    pub keywords: Vec<String>,
}

fn default_buckets() -> Vec<BucketRule> {
    vec![
        BucketRule {
            name: "tech".into(),
            keywords: [
                "ai",
                "artificial intelligence",
                "tech",
                "technology",
                "digital",
                "software",
                "app",
                "platform",
                "innovation",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        },
        BucketRule {
            name: "opinion".into(),
            keywords: [
                "opinion",
                "analysis",
                "editorial",
                "commentary",
                "perspective",
                "viewpoint",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        },
    ]
}

// ---------------------------------------------------------------------------
// Projection config (runtime, merged from config sections)
// ---------------------------------------------------------------------------

/// Runtime projection configuration for the site transformer.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    /// Ordered bucket rules; first match wins.
    pub buckets: Vec<BucketRule>,
    /// Bucket receiving unmatched articles.
    pub default_bucket: String,
    /// Which articles feed the buckets.
    pub column_policy: ColumnPolicy,
    /// Per-bucket size cap in the artifact.
    pub max_per_bucket: usize,
}

impl From<&AppConfig> for ProjectConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            buckets: config.buckets.clone(),
            default_bucket: config.publish.default_bucket.clone(),
            column_policy: config.publish.column_policy,
            max_per_bucket: config.publish.max_per_bucket,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.frontpage/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| FrontpageError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.frontpage/frontpage.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| FrontpageError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        FrontpageError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| FrontpageError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| FrontpageError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| FrontpageError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject configs that would violate collection invariants.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.limits.max_heroes == 0 {
        return Err(FrontpageError::config("limits.max_heroes must be positive"));
    }
    if config.limits.max_columns == 0 {
        return Err(FrontpageError::config(
            "limits.max_columns must be positive",
        ));
    }
    for rule in &config.buckets {
        if rule.name.trim().is_empty() {
            return Err(FrontpageError::config("bucket rule with empty name"));
        }
        if rule.name == config.publish.default_bucket {
            return Err(FrontpageError::config(format!(
                "bucket '{}' shadows the default bucket",
                rule.name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("articles_dir"));
        assert!(toml_str.contains("max_heroes"));
        assert!(toml_str.contains("tech"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.limits.max_heroes, 3);
        assert_eq!(parsed.limits.max_columns, 10);
        assert_eq!(parsed.publish.default_bucket, "news");
        assert_eq!(parsed.buckets.len(), 2);
    }

    #[test]
    fn config_with_custom_buckets() {
        let toml_str = r#"
[limits]
max_heroes = 5

[[buckets]]
name = "science"
keywords = ["research", "study"]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.limits.max_heroes, 5);
        assert_eq!(config.limits.max_columns, 10);
        assert_eq!(config.buckets.len(), 1);
        assert_eq!(config.buckets[0].name, "science");
    }

    #[test]
    fn column_policy_kebab_case() {
        let toml_str = r#"
[publish]
column_policy = "flagged-only"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.publish.column_policy, ColumnPolicy::FlaggedOnly);
    }

    #[test]
    fn project_config_from_app_config() {
        let app = AppConfig::default();
        let project = ProjectConfig::from(&app);
        assert_eq!(project.default_bucket, "news");
        assert_eq!(project.max_per_bucket, 10);
        assert_eq!(project.column_policy, ColumnPolicy::AllNonHero);
        assert_eq!(project.buckets[0].name, "tech");
    }

    #[test]
    fn zero_limits_rejected() {
        let mut config = AppConfig::default();
        config.limits.max_heroes = 0;
        let result = validate_config(&config);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("max_heroes must be positive")
        );
    }

    #[test]
    fn bucket_shadowing_default_rejected() {
        let mut config = AppConfig::default();
        config.buckets.push(BucketRule {
            name: "news".into(),
            keywords: vec![],
        });
        assert!(validate_config(&config).is_err());
    }
}
