//! Statistics generation from the job store
//!
//! This module provides functionality for extracting and displaying
//! indexing job statistics from the storage layer.

use crate::state::JobStatus;
use crate::storage::{JobStore, RunRecord, StorageResult};
use std::collections::HashMap;

/// Job store statistics summary
#[derive(Debug, Clone)]
pub struct JobStatistics {
    /// Total number of tracked jobs
    pub total_jobs: u64,

    /// Count of jobs by status
    pub jobs_by_status: HashMap<JobStatus, u64>,

    /// Pages indexed across all jobs in their last run
    pub pages_indexed: u64,

    /// Failed jobs that retry mode will no longer pick up
    pub retry_exhausted: u64,

    /// Most recent failures as `(resource_id, last_error)`
    pub recent_errors: Vec<(i64, String)>,

    /// The most recent batch run
    pub latest_run: Option<RunRecord>,
}

/// Number of failure messages kept in the summary
const MAX_RECENT_ERRORS: usize = 10;

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The job store to query
/// * `max_job_retries` - Retry cap used by retry mode
///
/// # Returns
///
/// * `Ok(JobStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics(
    storage: &dyn JobStore,
    max_job_retries: u32,
) -> StorageResult<JobStatistics> {
    let jobs_by_status = storage.count_by_status()?;
    let jobs = storage.list_jobs()?;

    let retry_exhausted = jobs
        .iter()
        .filter(|job| job.status == JobStatus::Failed && !job.is_retryable(max_job_retries))
        .count() as u64;

    let pages_indexed = jobs.iter().map(|job| job.pages_indexed as u64).sum();

    let mut failed: Vec<_> = jobs
        .iter()
        .filter(|job| job.status == JobStatus::Failed)
        .filter_map(|job| {
            job.last_error
                .as_ref()
                .map(|error| (job.updated_at, job.resource_id, error.clone()))
        })
        .collect();
    failed.sort_by(|a, b| b.0.cmp(&a.0));
    let recent_errors = failed
        .into_iter()
        .take(MAX_RECENT_ERRORS)
        .map(|(_, resource_id, error)| (resource_id, error))
        .collect();

    Ok(JobStatistics {
        total_jobs: jobs.len() as u64,
        jobs_by_status,
        pages_indexed,
        retry_exhausted,
        recent_errors,
        latest_run: storage.get_latest_run()?,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &JobStatistics) {
    println!("=== Indexing Job Statistics ===\n");

    println!("Overview:");
    println!("  Total jobs: {}", stats.total_jobs);
    println!("  Pages indexed: {}", stats.pages_indexed);
    println!();

    println!("Jobs by Status:");
    for status in JobStatus::all() {
        let count = stats.jobs_by_status.get(&status).copied().unwrap_or(0);
        let percentage = if stats.total_jobs > 0 {
            (count as f64 / stats.total_jobs as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
    println!();

    if stats.retry_exhausted > 0 {
        println!("Failed jobs past the retry limit: {}", stats.retry_exhausted);
        println!();
    }

    if !stats.recent_errors.is_empty() {
        println!("Recent Errors:");
        for (resource_id, error) in &stats.recent_errors {
            println!("  - {}: {}", resource_id, error);
        }
        println!();
    }

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Run (#{}):", run.id);
            println!("  Mode: {}", run.mode);
            println!("  Status: {}", run.status.to_db_string());
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            println!(
                "  Resources: {} total, {} succeeded, {} failed, {} skipped",
                run.totals.total, run.totals.succeeded, run.totals.failed, run.totals.skipped
            );
        }
        None => println!("No batch runs recorded"),
    }
}
