//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use frontpage_core::pipeline::{
    ProgressReporter, SyncConfig, SyncResult, assign_category, ingest_one, publish_only, run_sync,
};
use frontpage_reconcile::categories::Slot;
use frontpage_shared::{AppConfig, init_config, load_config};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Frontpage — reconcile article feeds into a publishable front page.
#[derive(Parser)]
#[command(
    name = "frontpage",
    version,
    about = "Reconcile article records from feeds, tables, and webhooks into one published collection.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run a full reconciliation: scan sources, merge, publish.
    Sync {
        /// Articles directory (defaults to the configured one).
        #[arg(long)]
        articles_dir: Option<String>,

        /// Batch file(s): a JSON array of table rows or one webhook
        /// payload per file. May be repeated.
        #[arg(long)]
        batch: Vec<String>,

        /// Collection file path override.
        #[arg(long)]
        collection: Option<String>,

        /// Artifact output path override.
        #[arg(long)]
        out: Option<String>,

        /// Skip the publish notification.
        #[arg(long)]
        no_notify: bool,
    },

    /// Ingest one webhook payload from a JSON file.
    Add {
        /// Path to the payload JSON file.
        payload: String,
    },

    /// Flag or unflag an article as a hero.
    Hero {
        /// Article identity (normalized URL or slug).
        identity: String,

        /// Clear the flag instead of setting it.
        #[arg(long)]
        clear: bool,
    },

    /// Flag or unflag an article as a column.
    Column {
        /// Article identity (normalized URL or slug).
        identity: String,

        /// Clear the flag instead of setting it.
        #[arg(long)]
        clear: bool,
    },

    /// Re-project and publish the collection without ingesting.
    Publish,

    /// Show a summary of the current collection.
    Status,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "frontpage=info",
        1 => "frontpage=debug",
        _ => "frontpage=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Sync {
            articles_dir,
            batch,
            collection,
            out,
            no_notify,
        } => {
            cmd_sync(
                articles_dir.as_deref(),
                &batch,
                collection.as_deref(),
                out.as_deref(),
                no_notify,
            )
            .await
        }
        Command::Add { payload } => cmd_add(&payload).await,
        Command::Hero { identity, clear } => cmd_flag(&identity, Slot::Hero, !clear).await,
        Command::Column { identity, clear } => cmd_flag(&identity, Slot::Column, !clear).await,
        Command::Publish => cmd_publish().await,
        Command::Status => cmd_status().await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Build the run config from the config file plus CLI overrides.
fn sync_config(
    articles_dir: Option<&str>,
    batch: &[String],
    collection: Option<&str>,
    out: Option<&str>,
    no_notify: bool,
) -> Result<SyncConfig> {
    let app_config = load_config()?;
    let mut config = SyncConfig::from_app_config(&app_config);

    if let Some(dir) = articles_dir {
        config.articles_dir = PathBuf::from(dir);
    }
    config.batch_files = batch.iter().map(PathBuf::from).collect();
    if let Some(path) = collection {
        config.collection_path = PathBuf::from(path);
    }
    if let Some(path) = out {
        config.artifact_path = PathBuf::from(path);
    }
    if no_notify {
        config.notify_url = None;
    }

    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_sync(
    articles_dir: Option<&str>,
    batch: &[String],
    collection: Option<&str>,
    out: Option<&str>,
    no_notify: bool,
) -> Result<()> {
    let config = sync_config(articles_dir, batch, collection, out, no_notify)?;

    info!(
        articles_dir = %config.articles_dir.display(),
        batch_files = config.batch_files.len(),
        "starting sync"
    );

    let reporter = CliProgress::new();
    let result = run_sync(&config, &reporter).await?;

    print_summary(&result);
    Ok(())
}

async fn cmd_add(payload_path: &str) -> Result<()> {
    let config = sync_config(None, &[], None, None, false)?;

    let content = std::fs::read_to_string(payload_path)
        .map_err(|e| eyre!("cannot read payload '{payload_path}': {e}"))?;
    let payload = serde_json::from_str(&content)
        .map_err(|e| eyre!("payload '{payload_path}' is not a valid JSON object: {e}"))?;

    let reporter = CliProgress::new();
    let result = ingest_one(&config, payload, &reporter).await?;

    print_summary(&result);
    Ok(())
}

async fn cmd_flag(identity: &str, slot: Slot, value: bool) -> Result<()> {
    let config = sync_config(None, &[], None, None, false)?;
    let result = assign_category(&config, identity, slot, value).await?;

    let action = if value { "flagged" } else { "cleared" };
    println!();
    println!("  {} {action} as {slot}", result.identity);
    println!("  Heroes:  {}/{}", result.hero_count, config.limits.max_heroes);
    println!(
        "  Columns: {}/{}",
        result.column_count, config.limits.max_columns
    );
    println!();
    Ok(())
}

async fn cmd_publish() -> Result<()> {
    let config = sync_config(None, &[], None, None, false)?;
    let artifact = publish_only(&config).await?;

    let column_total: usize = artifact.columns.values().map(Vec::len).sum();
    println!();
    println!("  Artifact published!");
    println!("  Path:    {}", config.artifact_path.display());
    println!("  Heroes:  {}", artifact.heroes.len());
    println!("  Columns: {column_total} across {} buckets", artifact.columns.len());
    println!();
    Ok(())
}

async fn cmd_status() -> Result<()> {
    let config = sync_config(None, &[], None, None, false)?;
    let collection =
        frontpage_storage::load_collection(&config.collection_path, config.limits)?;

    println!();
    println!("  Collection: {}", config.collection_path.display());
    println!("  Articles:   {}", collection.len());
    println!(
        "  Heroes:     {}/{}",
        collection.hero_count(),
        collection.limits.max_heroes
    );
    println!(
        "  Columns:    {}/{}",
        collection.column_count(),
        collection.limits.max_columns
    );
    println!("  Updated:    {}", collection.last_updated.to_rfc3339());
    println!();
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

/// Print the run summary, including per-record failures.
fn print_summary(result: &SyncResult) {
    println!();
    println!("  Sync complete!");
    println!("  Run:       {}", result.run_id);
    println!("  Scanned:   {}", result.scanned);
    println!("  Inserted:  {}", result.inserted);
    println!("  Updated:   {}", result.updated);
    println!("  Unchanged: {}", result.unchanged);
    println!("  Total:     {}", result.article_count);
    println!("  Artifact:  {}", result.artifact_path.display());
    println!("  Time:      {:.1}s", result.elapsed.as_secs_f64());

    if !result.conflicts.is_empty() {
        println!("  Conflicts:");
        for identity in &result.conflicts {
            println!("    - {identity}");
        }
    }
    if !result.failures.is_empty() {
        println!("  Skipped records:");
        for failure in &result.failures {
            println!("    - {}: {}", failure.record, failure.reason);
        }
    }
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn record_processed(&self, label: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Normalizing [{current}/{total}] {label}"));
    }

    fn done(&self, _result: &SyncResult) {
        self.spinner.finish_and_clear();
    }
}
