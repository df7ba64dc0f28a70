//! Frontpage CLI — article reconciliation and publishing tool.
//!
//! Reconciles article records from heterogeneous sources into one
//! canonical collection and publishes the site-ready artifact.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
