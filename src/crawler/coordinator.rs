//! Indexing coordinator - batch orchestration logic
//!
//! This module drives a batch over the catalog, including:
//! - Choosing which resources to index for the selected mode
//! - Walking each resource's job through its lifecycle
//! - Discovering, scraping and indexing the pages of each site
//! - Recording batch runs in the job store

use crate::catalog::{CatalogClient, Resource};
use crate::config::Config;
use crate::crawler::{build_http_client, build_probe_client, PageScraper};
use crate::discovery::SiteDiscovery;
use crate::robots::RobotsChecker;
use crate::search::{DocumentIndexer, SearchClient};
use crate::state::{IndexingJob, JobStatus};
use crate::storage::{JobStore, RunStatus, RunTotals, StorageResult};
use crate::{IndexerError, Result};
use std::fmt;
use std::sync::Arc;

/// Job store handle owned by the coordinator
pub type BoxedJobStore = Box<dyn JobStore + Send>;

/// Which resources a batch processes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum IndexMode {
    /// Every resource, including completed ones
    #[default]
    Full,
    /// Every resource whose job is not completed
    Resume,
    /// Only failed jobs below the retry cap
    Retry,
}

impl IndexMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Resume => "resume",
            Self::Retry => "retry",
        }
    }
}

impl fmt::Display for IndexMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of indexing one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceOutcome {
    Completed { pages_indexed: u32, total_pages: u32 },
    Failed { error: String },
}

impl ResourceOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

enum Selection {
    Skip(&'static str),
    Run(Option<IndexingJob>),
}

/// Main indexing coordinator structure
pub struct Coordinator {
    config: Config,
    catalog: CatalogClient,
    discovery: SiteDiscovery,
    scraper: PageScraper,
    indexer: DocumentIndexer,
    jobs: Option<BoxedJobStore>,
    config_hash: String,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The indexer configuration
    /// * `jobs` - The job store, or `None` to run without tracking
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(IndexerError)` - Failed to build the HTTP client
    pub fn new(config: Config, jobs: Option<BoxedJobStore>) -> Result<Self> {
        let client = build_http_client(&config.user_agent)?;

        // One robots cache shared by discovery and scraping
        let robots = Arc::new(RobotsChecker::new(
            client.clone(),
            config.user_agent.crawler_name.clone(),
            config.indexer.robots_txt_timeout(),
        ));

        let discovery = SiteDiscovery::new(
            client.clone(),
            build_probe_client(&config.user_agent)?,
            Arc::clone(&robots),
            &config.indexer,
        );
        let scraper = PageScraper::new(client.clone(), robots, &config.indexer);
        let indexer = DocumentIndexer::new(
            SearchClient::new(client.clone(), &config.search.url, config.search.index_name())
                .with_timeout(config.indexer.request_timeout()),
        );
        let catalog = CatalogClient::new(client, config.catalog.clone())
            .with_timeout(config.indexer.request_timeout());

        Ok(Self {
            config,
            catalog,
            discovery,
            scraper,
            indexer,
            jobs,
            config_hash: String::new(),
        })
    }

    /// Sets the configuration hash recorded with each batch run
    pub fn with_config_hash(mut self, config_hash: impl Into<String>) -> Self {
        self.config_hash = config_hash.into();
        self
    }

    /// Returns the job store, if tracking is enabled
    pub fn job_store(&self) -> Option<&(dyn JobStore + Send)> {
        self.jobs.as_deref()
    }

    /// Resets every job to `pending` with zeroed counters
    pub fn reset_jobs(&mut self) -> Result<usize> {
        match self.jobs.as_deref_mut() {
            Some(store) => {
                let count = store.reset_all()?;
                tracing::info!("Reset {} indexing jobs to pending", count);
                Ok(count)
            }
            None => {
                tracing::warn!("Job tracking is disabled, nothing to reset");
                Ok(0)
            }
        }
    }

    /// Runs a batch over every catalog resource
    ///
    /// Catalog failures abort the batch. Per-resource failures are recorded
    /// on their jobs and counted, and the batch moves on.
    pub async fn run_batch(&mut self, mode: IndexMode) -> Result<RunTotals> {
        tracing::info!(
            "Starting resource indexing (mode: {}, tracking: {})",
            mode,
            if self.jobs.is_some() { "on" } else { "off" }
        );

        let resources = self.catalog.load_resources().await?;
        if resources.is_empty() {
            tracing::warn!("No resources found to index");
            return Ok(RunTotals::default());
        }

        self.ensure_index().await;
        self.reclaim_stale_jobs();
        let run_id = self.start_run(mode);

        let mut totals = RunTotals {
            total: resources.len() as u32,
            ..RunTotals::default()
        };

        for (position, resource) in resources.iter().enumerate() {
            let job = match self.select(resource, mode) {
                Ok(Selection::Run(job)) => job,
                Ok(Selection::Skip(reason)) => {
                    tracing::info!("Skipping resource {} ({}): {}", resource.id, resource.title, reason);
                    totals.skipped += 1;
                    continue;
                }
                Err(e) => {
                    tracing::error!("Failed to prepare job for resource {}: {}", resource.id, e);
                    totals.failed += 1;
                    continue;
                }
            };

            tracing::info!(
                "[{}/{}] Indexing resource {}: {}",
                position + 1,
                resources.len(),
                resource.id,
                resource.title
            );

            if self.process_resource(resource, job).await.is_success() {
                totals.succeeded += 1;
            } else {
                totals.failed += 1;
            }

            if position + 1 < resources.len() {
                tokio::time::sleep(self.config.indexer.delay_between_sites()).await;
            }
        }

        self.finish_run(run_id, &totals);

        tracing::info!(
            "Indexing complete. Success: {}, Failed: {}, Skipped: {}, Total: {}",
            totals.succeeded,
            totals.failed,
            totals.skipped,
            totals.total
        );

        Ok(totals)
    }

    /// Re-indexes a single resource regardless of its job status
    ///
    /// The job's retry count is reset to 0 before it is started.
    pub async fn reindex_resource(&mut self, resource_id: i64) -> Result<ResourceOutcome> {
        tracing::info!("Re-indexing resource {}", resource_id);

        let resource = self
            .catalog
            .find_resource(resource_id)
            .await?
            .ok_or(IndexerError::ResourceNotFound(resource_id))?;

        self.ensure_index().await;

        let job = match self.jobs.as_deref_mut() {
            Some(store) => {
                let mut job = store.get_or_create(resource_id)?;
                job.reset_retries();
                job.rewind();
                store.mark_started(&mut job)?;
                Some(job)
            }
            None => None,
        };

        Ok(self.process_resource(&resource, job).await)
    }

    /// Indexes one resource whose job (if tracked) is already `in_progress`
    ///
    /// Any error is caught and written to the job; the returned outcome
    /// reports it.
    pub async fn process_resource(
        &mut self,
        resource: &Resource,
        mut job: Option<IndexingJob>,
    ) -> ResourceOutcome {
        let outcome = match self.index_resource(resource, job.as_mut()).await {
            Ok((0, _)) => ResourceOutcome::Failed {
                error: "No pages indexed".to_string(),
            },
            Ok((pages_indexed, total_pages)) => ResourceOutcome::Completed {
                pages_indexed,
                total_pages,
            },
            Err(e) => ResourceOutcome::Failed {
                error: e.to_string(),
            },
        };

        let recorded = match &outcome {
            ResourceOutcome::Completed { .. } => {
                self.track(job.as_mut(), |store, job| store.mark_completed(job))
            }
            ResourceOutcome::Failed { error } => {
                self.track(job.as_mut(), |store, job| store.mark_failed(job, error))
            }
        };
        if let Err(e) = recorded {
            tracing::error!("Failed to record outcome for resource {}: {}", resource.id, e);
        }

        match &outcome {
            ResourceOutcome::Completed {
                pages_indexed,
                total_pages,
            } => tracing::info!(
                "Completed resource {}: {}/{} pages indexed",
                resource.id,
                pages_indexed,
                total_pages
            ),
            ResourceOutcome::Failed { error } => {
                tracing::warn!("Failed resource {}: {}", resource.id, error)
            }
        }

        outcome
    }

    /// Crawls and indexes the pages of a resource
    ///
    /// # Returns
    ///
    /// `(pages_indexed, total_pages)`
    async fn index_resource(
        &mut self,
        resource: &Resource,
        mut job: Option<&mut IndexingJob>,
    ) -> Result<(u32, u32)> {
        let site_url = resource
            .site_url()
            .ok_or(IndexerError::NoWebsite(resource.id))?;

        let urls = self
            .discovery
            .get_all_site_urls(site_url, self.config.indexer.max_pages_per_site)
            .await;
        let total = urls.len() as u32;
        self.track(job.as_deref_mut(), |store, job| {
            store.update_progress(job, 0, total)
        })?;

        tracing::info!("Found {} pages to index for resource {}", total, resource.id);

        let mut indexed = 0;
        for (page_index, page_url) in urls.iter().enumerate() {
            let scraped = self.scraper.scrape(page_url).await;

            if !scraped.is_fetched() {
                tracing::debug!("Nothing scraped from {}, not indexing", page_url);
            } else if self
                .indexer
                .index_page(resource, page_url, page_index, &scraped)
                .await
            {
                indexed += 1;
                self.track(job.as_deref_mut(), |store, job| {
                    store.update_progress(job, indexed, total)
                })?;
            }

            if page_index + 1 < urls.len() {
                tokio::time::sleep(self.config.indexer.delay_between_pages()).await;
            }
        }

        if indexed > 0 && self.config.indexer.prune_stale_documents {
            match self.indexer.prune_stale(resource.id, urls.len()).await {
                Ok(0) => {}
                Ok(deleted) => tracing::info!(
                    "Removed {} stale documents for resource {}",
                    deleted,
                    resource.id
                ),
                Err(e) => tracing::warn!(
                    "Failed to prune stale documents for resource {}: {}",
                    resource.id,
                    e
                ),
            }
        }

        Ok((indexed, total))
    }

    /// Loads or creates the job of a resource and starts it if the mode
    /// selects it
    fn select(&mut self, resource: &Resource, mode: IndexMode) -> StorageResult<Selection> {
        if resource.site_url().is_none() {
            return Ok(Selection::Skip("no website"));
        }

        let max_retries = self.config.indexer.max_job_retries;
        let Some(store) = self.jobs.as_deref_mut() else {
            return Ok(Selection::Run(None));
        };

        let mut job = store.get_or_create(resource.id)?;
        match (mode, job.status) {
            (IndexMode::Resume, JobStatus::Completed) => {
                return Ok(Selection::Skip("already completed"));
            }
            (IndexMode::Retry, JobStatus::Failed) if !job.is_retryable(max_retries) => {
                return Ok(Selection::Skip("retry limit reached"));
            }
            (IndexMode::Retry, JobStatus::Failed) => job.begin_retry(max_retries)?,
            (IndexMode::Retry, _) => return Ok(Selection::Skip("not failed")),
            _ => {}
        }

        // completed or in_progress jobs go back through pending
        if !job.status.can_transition_to(JobStatus::InProgress) {
            job.rewind();
        }
        store.mark_started(&mut job)?;

        Ok(Selection::Run(Some(job)))
    }

    /// Applies a store operation when both tracking and a job are present
    fn track<F>(&mut self, job: Option<&mut IndexingJob>, op: F) -> StorageResult<()>
    where
        F: FnOnce(&mut (dyn JobStore + Send), &mut IndexingJob) -> StorageResult<()>,
    {
        match (self.jobs.as_deref_mut(), job) {
            (Some(store), Some(job)) => op(store, job),
            _ => Ok(()),
        }
    }

    async fn ensure_index(&self) {
        let index = self.indexer.index_name();
        match self.indexer.ensure_index().await {
            Ok(true) => tracing::info!("Created search index {}", index),
            Ok(false) => tracing::debug!("Search index {} already exists", index),
            Err(e) => tracing::error!("Failed to ensure search index {}: {}", index, e),
        }
    }

    fn reclaim_stale_jobs(&mut self) {
        let Some(threshold) = self.config.indexer.stale_job_timeout() else {
            return;
        };
        let Some(store) = self.jobs.as_deref_mut() else {
            return;
        };

        match store.reclaim_stale(threshold) {
            Ok(0) => {}
            Ok(count) => tracing::warn!("Reclaimed {} stale in_progress jobs as failed", count),
            Err(e) => tracing::error!("Failed to reclaim stale jobs: {}", e),
        }
    }

    fn start_run(&mut self, mode: IndexMode) -> Option<i64> {
        let store = self.jobs.as_deref_mut()?;
        match store.create_run(mode.as_str(), &self.config_hash) {
            Ok(run_id) => Some(run_id),
            Err(e) => {
                tracing::error!("Failed to record batch run: {}", e);
                None
            }
        }
    }

    fn finish_run(&mut self, run_id: Option<i64>, totals: &RunTotals) {
        let (Some(run_id), Some(store)) = (run_id, self.jobs.as_deref_mut()) else {
            return;
        };
        if let Err(e) = store.finish_run(run_id, RunStatus::Completed, totals) {
            tracing::error!("Failed to finish batch run {}: {}", run_id, e);
        }
    }
}
