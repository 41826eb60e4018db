//! Crawler module for resource indexing
//!
//! This module contains the core indexing logic, including:
//! - HTTP fetching with retry logic
//! - HTML text extraction
//! - Overall batch coordination

mod coordinator;
mod fetcher;
mod parser;

pub use coordinator::{BoxedJobStore, Coordinator, IndexMode, ResourceOutcome};
pub use fetcher::{build_http_client, build_probe_client, PageScraper, RetryPolicy, ScrapeStatus, ScrapedPage};
pub use parser::{parse_html, ParsedPage};

use crate::config::Config;
use crate::storage::open_storage;
use crate::{IndexerError, Result};
use std::path::Path;

/// Options of one indexer invocation
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Batch mode
    pub mode: IndexMode,
    /// Reset every job to `pending` before running
    pub reset: bool,
    /// Use the job store
    pub tracking: bool,
    /// Index only this resource instead of running a batch
    pub reindex_resource: Option<i64>,
}

/// Runs the indexer once
///
/// This is the main entry point. It will:
/// 1. Open the job store unless tracking is disabled
/// 2. Reset jobs if requested
/// 3. Re-index a single resource, or run a batch in the requested mode
///
/// A resource missing from the catalog is logged and is not an error.
///
/// # Returns
///
/// * `Ok(())` - The batch ran (individual resources may have failed)
/// * `Err(IndexerError)` - Job store, HTTP client or catalog failure
pub async fn run(config: Config, config_hash: &str, options: &RunOptions) -> Result<()> {
    let jobs: Option<BoxedJobStore> = if options.tracking {
        let path = Path::new(&config.tracking.database_path);
        tracing::info!("Using job store at {}", path.display());
        Some(Box::new(open_storage(path)?))
    } else {
        tracing::info!("Job tracking disabled");
        None
    };

    let mut coordinator = Coordinator::new(config, jobs)?.with_config_hash(config_hash);

    if options.reset {
        coordinator.reset_jobs()?;
    }

    if let Some(resource_id) = options.reindex_resource {
        return match coordinator.reindex_resource(resource_id).await {
            Ok(_) => Ok(()),
            Err(IndexerError::ResourceNotFound(id)) => {
                tracing::error!("Resource {} not found in catalog", id);
                Ok(())
            }
            Err(e) => Err(e),
        };
    }

    coordinator.run_batch(options.mode).await?;
    Ok(())
}
