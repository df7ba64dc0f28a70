//! Core pipeline orchestration for Frontpage.
//!
//! This crate ties together ingestion, reconciliation, projection, and
//! persistence into end-to-end workflows (e.g., `run_sync`).

pub mod pipeline;
