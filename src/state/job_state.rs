//! Indexing job lifecycle
//!
//! A job moves `pending -> in_progress -> completed | failed`. A failed job
//! may be started again; any job may be sent back to `pending` by an
//! explicit reset. Every other change is rejected.

use crate::TransitionError;
use chrono::{DateTime, Duration, Utc};
use std::fmt;

/// Lifecycle state of an indexing job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    /// Created or reset, not yet started
    Pending,

    /// Being indexed by the active run (or left behind by a crashed one)
    InProgress,

    /// At least one page was indexed in the last run
    Completed,

    /// The last run indexed nothing or raised an error
    Failed,
}

impl JobStatus {
    /// Returns true if `next` is a legal successor of this status
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (_, Pending)
                | (Pending, InProgress)
                | (Failed, InProgress)
                | (InProgress, Completed)
                | (InProgress, Failed)
        )
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all statuses
    pub fn all() -> [Self; 4] {
        [
            Self::Pending,
            Self::InProgress,
            Self::Completed,
            Self::Failed,
        ]
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Progress and status record for one resource
#[derive(Debug, Clone, PartialEq)]
pub struct IndexingJob {
    /// Row ID (0 until persisted)
    pub id: i64,
    pub resource_id: i64,
    pub status: JobStatus,
    pub pages_indexed: u32,
    pub total_pages: u32,
    pub retry_count: u32,
    /// Most recent failure message, cleared on success
    pub last_error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl IndexingJob {
    /// Creates a pending job for a resource
    pub fn new(resource_id: i64) -> Self {
        Self {
            id: 0,
            resource_id,
            status: JobStatus::Pending,
            pages_indexed: 0,
            total_pages: 0,
            retry_count: 0,
            last_error: None,
            started_at: None,
            completed_at: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn transition(&mut self, to: JobStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(to) {
            return Err(TransitionError::Invalid {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    /// Starts a run: `pending | failed -> in_progress`, counters zeroed
    pub fn start(&mut self) -> Result<(), TransitionError> {
        self.transition(JobStatus::InProgress)?;
        self.pages_indexed = 0;
        self.total_pages = 0;
        self.started_at = Some(Utc::now());
        self.completed_at = None;
        Ok(())
    }

    /// Counts a retry of a failed job; the job still has to be started
    pub fn begin_retry(&mut self, max_retries: u32) -> Result<(), TransitionError> {
        if self.status != JobStatus::Failed {
            return Err(TransitionError::Invalid {
                from: self.status,
                to: JobStatus::InProgress,
            });
        }
        if !self.is_retryable(max_retries) {
            return Err(TransitionError::RetryLimit {
                resource_id: self.resource_id,
                retry_count: self.retry_count,
            });
        }
        self.retry_count += 1;
        Ok(())
    }

    /// Records progress of the active run
    pub fn record_progress(
        &mut self,
        pages_indexed: u32,
        total_pages: u32,
    ) -> Result<(), TransitionError> {
        if self.status != JobStatus::InProgress {
            return Err(TransitionError::Invalid {
                from: self.status,
                to: JobStatus::InProgress,
            });
        }
        if pages_indexed > total_pages {
            return Err(TransitionError::ProgressOverflow {
                pages_indexed,
                total_pages,
            });
        }
        self.pages_indexed = pages_indexed;
        self.total_pages = total_pages;
        Ok(())
    }

    /// Finishes a run that indexed at least one page
    pub fn complete(&mut self) -> Result<(), TransitionError> {
        if self.status == JobStatus::InProgress && self.pages_indexed == 0 {
            return Err(TransitionError::NothingIndexed {
                resource_id: self.resource_id,
            });
        }
        self.transition(JobStatus::Completed)?;
        self.completed_at = Some(Utc::now());
        self.last_error = None;
        Ok(())
    }

    /// Finishes a run with an error message
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(JobStatus::Failed)?;
        self.last_error = Some(error.into());
        Ok(())
    }

    /// Sends the job back to `pending` for another run, keeping its retry count
    pub fn rewind(&mut self) {
        self.status = JobStatus::Pending;
        self.pages_indexed = 0;
        self.total_pages = 0;
        self.started_at = None;
        self.completed_at = None;
    }

    /// Full reset: `pending`, every counter zeroed, error cleared
    pub fn reset(&mut self) {
        self.rewind();
        self.retry_count = 0;
        self.last_error = None;
    }

    /// Zeroes the retry count for a manual single-resource re-index
    pub fn reset_retries(&mut self) {
        self.retry_count = 0;
    }

    /// Returns true if a failed job may still be retried
    pub fn is_retryable(&self, max_retries: u32) -> bool {
        self.status == JobStatus::Failed && self.retry_count < max_retries
    }

    /// Returns true if the job has been `in_progress` for longer than `threshold`
    pub fn is_stale(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        self.status == JobStatus::InProgress
            && self
                .started_at
                .map_or(true, |started| now - started > threshold)
    }
}
