//! Resource Indexer main entry point
//!
//! This is the command-line interface for the resource indexing batch.

use anyhow::Context;
use clap::Parser;
use resource_indexer::config::{load_config_with_hash, Config};
use resource_indexer::crawler::{self, IndexMode, RunOptions};
use resource_indexer::output::{load_statistics, print_statistics};
use resource_indexer::storage::open_storage;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Resource Indexer: crawls directory listings' websites into a search index
///
/// Loads resources from the catalog, discovers each website's pages through
/// its sitemaps, scrapes them while respecting robots.txt, and writes one
/// search document per page. Per-resource progress is tracked so batches can
/// be resumed or retried.
#[derive(Parser, Debug)]
#[command(name = "resource-indexer")]
#[command(version = "1.0.0")]
#[command(about = "Indexes resource websites into a search engine", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Which resources to process
    #[arg(long, value_enum, default_value_t = IndexMode::Full)]
    mode: IndexMode,

    /// Reset every job to pending before running
    #[arg(long)]
    reset: bool,

    /// Run without the job store (no resume/retry semantics)
    #[arg(long, conflicts_with = "status")]
    no_tracking: bool,

    /// Index only this resource, resetting its retry count
    #[arg(long, value_name = "ID")]
    reindex_resource: Option<i64>,

    /// Show job statistics from the job store and exit
    #[arg(long, conflicts_with_all = ["reset", "reindex_resource"])]
    status: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.status {
        return handle_status(&config);
    }

    let options = RunOptions {
        mode: cli.mode,
        reset: cli.reset,
        tracking: !cli.no_tracking,
        reindex_resource: cli.reindex_resource,
    };

    crawler::run(config, &config_hash, &options)
        .await
        .context("indexing run failed")?;

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG` overrides the verbosity flags when set.
fn setup_logging(verbose: u8, quiet: bool) {
    let default_filter = if quiet {
        "error"
    } else {
        match verbose {
            0 => "resource_indexer=info,warn",
            1 => "resource_indexer=debug,info",
            2 => "resource_indexer=trace,debug",
            _ => "trace",
        }
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --status mode: shows job statistics from the job store
fn handle_status(config: &Config) -> anyhow::Result<()> {
    let path = Path::new(&config.tracking.database_path);
    println!("Job store: {}\n", path.display());

    let storage = open_storage(path)
        .with_context(|| format!("failed to open job store {}", path.display()))?;
    let stats = load_statistics(&storage, config.indexer.max_job_retries)?;
    print_statistics(&stats);

    Ok(())
}
