//! Storage traits and error types
//!
//! This module defines the trait interface for job store backends and
//! associated error types.

use crate::state::{IndexingJob, JobStatus};
use crate::storage::{RunRecord, RunStatus, RunTotals};
use crate::TransitionError;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Job not found for resource {0}")]
    JobNotFound(i64),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for job store implementations
///
/// Lifecycle helpers (`mark_*`, `update_progress`) apply the transition to
/// the in-memory job first and only persist it when the transition is legal,
/// so a rejected change leaves the stored row untouched.
pub trait JobStore {
    // ===== Job Management =====

    /// Returns the job for a resource, creating a pending one if absent
    fn get_or_create(&mut self, resource_id: i64) -> StorageResult<IndexingJob>;

    /// Gets the job for a resource
    fn get_job(&self, resource_id: i64) -> StorageResult<Option<IndexingJob>>;

    /// Persists every field of a job and stamps `updated_at`
    fn save_job(&mut self, job: &mut IndexingJob) -> StorageResult<()>;

    /// Sets every job to `pending` with counters and errors cleared
    ///
    /// # Returns
    ///
    /// The number of jobs reset
    fn reset_all(&mut self) -> StorageResult<usize>;

    /// Gets jobs that are pending, or failed with `retry_count < max_retries`
    fn pending_or_retryable(&self, max_retries: u32) -> StorageResult<Vec<IndexingJob>>;

    /// Gets all jobs ordered by resource ID
    fn list_jobs(&self) -> StorageResult<Vec<IndexingJob>>;

    /// Counts jobs per status
    fn count_by_status(&self) -> StorageResult<HashMap<JobStatus, u64>>;

    // ===== Run Management =====

    /// Creates a new batch run
    ///
    /// # Arguments
    ///
    /// * `mode` - The batch mode name
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, mode: &str, config_hash: &str) -> StorageResult<i64>;

    /// Records the outcome of a run with a finish timestamp
    fn finish_run(&mut self, run_id: i64, status: RunStatus, totals: &RunTotals)
        -> StorageResult<()>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    // ===== Lifecycle =====

    /// Starts a job and persists it
    fn mark_started(&mut self, job: &mut IndexingJob) -> StorageResult<()> {
        job.start()?;
        self.save_job(job)
    }

    /// Records progress of a started job
    fn update_progress(
        &mut self,
        job: &mut IndexingJob,
        pages_indexed: u32,
        total_pages: u32,
    ) -> StorageResult<()> {
        job.record_progress(pages_indexed, total_pages)?;
        self.save_job(job)
    }

    /// Completes a job that indexed at least one page
    fn mark_completed(&mut self, job: &mut IndexingJob) -> StorageResult<()> {
        job.complete()?;
        self.save_job(job)
    }

    /// Fails a started job with an error message
    fn mark_failed(&mut self, job: &mut IndexingJob, error: &str) -> StorageResult<()> {
        job.fail(error)?;
        self.save_job(job)
    }

    /// Fails `in_progress` jobs that were started longer ago than `older_than`
    ///
    /// Used on startup to recover jobs left behind by a crashed run.
    ///
    /// # Returns
    ///
    /// The number of jobs reclaimed
    fn reclaim_stale(&mut self, older_than: Duration) -> StorageResult<usize> {
        let now = Utc::now();
        let mut reclaimed = 0;
        for mut job in self.list_jobs()? {
            if job.is_stale(now, older_than) {
                self.mark_failed(&mut job, "stale in_progress job reclaimed")?;
                reclaimed += 1;
            }
        }
        Ok(reclaimed)
    }
}
