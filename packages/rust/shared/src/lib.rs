//! Shared types, error model, and configuration for Frontpage.
//!
//! This crate is the foundation depended on by all other Frontpage crates.
//! It provides:
//! - [`FrontpageError`] — the unified error type
//! - Domain types ([`Article`], [`Collection`], [`Limits`], [`RunId`])
//! - Configuration ([`AppConfig`], [`ProjectConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BucketRule, ColumnPolicy, IngestSettings, ProjectConfig, PublishSettings,
    config_dir, config_file_path, init_config, load_config, load_config_from, validate_config,
};
pub use error::{FrontpageError, Result};
pub use types::{Article, CURRENT_SCHEMA_VERSION, Collection, Limits, RecordFailure, RunId};
