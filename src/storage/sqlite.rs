//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the JobStore trait.

use crate::state::{IndexingJob, JobStatus};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{JobStore, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus, RunTotals};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;

const JOB_COLUMNS: &str = "id, resource_id, status, pages_indexed, total_pages, retry_count,
     last_error, started_at, completed_at, created_at, updated_at";

const RUN_COLUMNS: &str = "id, started_at, finished_at, mode, config_hash, status,
     resources_total, succeeded, failed, skipped";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn parse_time(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_optional_time(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    row.get::<_, Option<String>>(idx)?
        .map(|value| parse_time(idx, &value))
        .transpose()
}

fn job_from_row(row: &Row<'_>) -> rusqlite::Result<IndexingJob> {
    Ok(IndexingJob {
        id: row.get(0)?,
        resource_id: row.get(1)?,
        status: JobStatus::from_db_string(&row.get::<_, String>(2)?).unwrap_or(JobStatus::Failed),
        pages_indexed: row.get(3)?,
        total_pages: row.get(4)?,
        retry_count: row.get(5)?,
        last_error: row.get(6)?,
        started_at: parse_optional_time(row, 7)?,
        completed_at: parse_optional_time(row, 8)?,
        created_at: parse_time(9, &row.get::<_, String>(9)?)?,
        updated_at: parse_optional_time(row, 10)?,
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        mode: row.get(3)?,
        config_hash: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
            .unwrap_or(RunStatus::Running),
        totals: RunTotals {
            total: row.get(6)?,
            succeeded: row.get(7)?,
            failed: row.get(8)?,
            skipped: row.get(9)?,
        },
    })
}

impl JobStore for SqliteStorage {
    // ===== Job Management =====

    fn get_or_create(&mut self, resource_id: i64) -> StorageResult<IndexingJob> {
        if let Some(job) = self.get_job(resource_id)? {
            return Ok(job);
        }

        let mut job = IndexingJob::new(resource_id);
        self.conn.execute(
            "INSERT INTO indexing_jobs (resource_id, status, created_at) VALUES (?1, ?2, ?3)",
            params![
                resource_id,
                job.status.to_db_string(),
                job.created_at.to_rfc3339()
            ],
        )?;
        job.id = self.conn.last_insert_rowid();

        Ok(job)
    }

    fn get_job(&self, resource_id: i64) -> StorageResult<Option<IndexingJob>> {
        let sql = format!(
            "SELECT {} FROM indexing_jobs WHERE resource_id = ?1",
            JOB_COLUMNS
        );
        let job = self
            .conn
            .query_row(&sql, params![resource_id], job_from_row)
            .optional()?;
        Ok(job)
    }

    fn save_job(&mut self, job: &mut IndexingJob) -> StorageResult<()> {
        let now = Utc::now();
        let updated = self.conn.execute(
            "UPDATE indexing_jobs SET status = ?1, pages_indexed = ?2, total_pages = ?3,
             retry_count = ?4, last_error = ?5, started_at = ?6, completed_at = ?7,
             updated_at = ?8
             WHERE resource_id = ?9",
            params![
                job.status.to_db_string(),
                job.pages_indexed,
                job.total_pages,
                job.retry_count,
                job.last_error,
                job.started_at.map(|t| t.to_rfc3339()),
                job.completed_at.map(|t| t.to_rfc3339()),
                now.to_rfc3339(),
                job.resource_id,
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::JobNotFound(job.resource_id));
        }

        job.updated_at = Some(now);
        Ok(())
    }

    fn reset_all(&mut self) -> StorageResult<usize> {
        let now = Utc::now().to_rfc3339();
        let count = self.conn.execute(
            "UPDATE indexing_jobs SET status = ?1, pages_indexed = 0, total_pages = 0,
             retry_count = 0, last_error = NULL, started_at = NULL, completed_at = NULL,
             updated_at = ?2",
            params![JobStatus::Pending.to_db_string(), now],
        )?;
        Ok(count)
    }

    fn pending_or_retryable(&self, max_retries: u32) -> StorageResult<Vec<IndexingJob>> {
        let sql = format!(
            "SELECT {} FROM indexing_jobs
             WHERE status = ?1 OR (status = ?2 AND retry_count < ?3)
             ORDER BY resource_id",
            JOB_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let jobs = stmt
            .query_map(
                params![
                    JobStatus::Pending.to_db_string(),
                    JobStatus::Failed.to_db_string(),
                    max_retries
                ],
                job_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(jobs)
    }

    fn list_jobs(&self) -> StorageResult<Vec<IndexingJob>> {
        let sql = format!(
            "SELECT {} FROM indexing_jobs ORDER BY resource_id",
            JOB_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let jobs = stmt
            .query_map([], job_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(jobs)
    }

    fn count_by_status(&self) -> StorageResult<HashMap<JobStatus, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM indexing_jobs GROUP BY status")?;

        let mut counts = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        for row in rows {
            let (status, count) = row?;
            if let Some(status) = JobStatus::from_db_string(&status) {
                *counts.entry(status).or_insert(0) += count as u64;
            }
        }

        Ok(counts)
    }

    // ===== Run Management =====

    fn create_run(&mut self, mode: &str, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, mode, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![now, mode, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        totals: &RunTotals,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, resources_total = ?3,
             succeeded = ?4, failed = ?5, skipped = ?6
             WHERE id = ?7",
            params![
                status.to_db_string(),
                now,
                totals.total,
                totals.succeeded,
                totals.failed,
                totals.skipped,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let sql = format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS);
        let run = self.conn.query_row(&sql, [], run_from_row).optional()?;
        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn storage() -> SqliteStorage {
        SqliteStorage::new_in_memory().unwrap()
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let mut storage = storage();

        let first = storage.get_or_create(10042).unwrap();
        let second = storage.get_or_create(10042).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.status, JobStatus::Pending);
        assert_eq!(storage.list_jobs().unwrap().len(), 1);
    }

    #[test]
    fn test_get_job_missing() {
        let storage = storage();
        assert!(storage.get_job(1).unwrap().is_none());
    }

    #[test]
    fn test_lifecycle_persists() {
        let mut storage = storage();
        let mut job = storage.get_or_create(7).unwrap();

        storage.mark_started(&mut job).unwrap();
        storage.update_progress(&mut job, 0, 5).unwrap();
        storage.update_progress(&mut job, 3, 5).unwrap();
        storage.mark_completed(&mut job).unwrap();

        let stored = storage.get_job(7).unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
        assert_eq!(stored.pages_indexed, 3);
        assert_eq!(stored.total_pages, 5);
        assert!(stored.started_at.is_some());
        assert!(stored.completed_at.is_some());
        assert!(stored.updated_at.is_some());
    }

    #[test]
    fn test_rejected_transition_leaves_row_untouched() {
        let mut storage = storage();
        let mut job = storage.get_or_create(7).unwrap();

        let result = storage.mark_completed(&mut job);
        assert!(matches!(result, Err(StorageError::Transition(_))));

        let stored = storage.get_job(7).unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Pending);
    }

    #[test]
    fn test_mark_failed_stores_error() {
        let mut storage = storage();
        let mut job = storage.get_or_create(9).unwrap();
        storage.mark_started(&mut job).unwrap();
        storage.mark_failed(&mut job, "No pages indexed").unwrap();

        let stored = storage.get_job(9).unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert_eq!(stored.last_error.as_deref(), Some("No pages indexed"));
    }

    #[test]
    fn test_reset_all() {
        let mut storage = storage();
        for id in [1, 2] {
            let mut job = storage.get_or_create(id).unwrap();
            storage.mark_started(&mut job).unwrap();
            storage.mark_failed(&mut job, "boom").unwrap();
            job.retry_count = 2;
            storage.save_job(&mut job).unwrap();
        }

        assert_eq!(storage.reset_all().unwrap(), 2);

        for job in storage.list_jobs().unwrap() {
            assert_eq!(job.status, JobStatus::Pending);
            assert_eq!(job.retry_count, 0);
            assert_eq!(job.pages_indexed, 0);
            assert!(job.last_error.is_none());
            assert!(job.started_at.is_none());
        }
    }

    #[test]
    fn test_pending_or_retryable() {
        let mut storage = storage();
        storage.get_or_create(1).unwrap();

        let mut retryable = storage.get_or_create(2).unwrap();
        storage.mark_started(&mut retryable).unwrap();
        storage.mark_failed(&mut retryable, "x").unwrap();

        let mut exhausted = storage.get_or_create(3).unwrap();
        storage.mark_started(&mut exhausted).unwrap();
        storage.mark_failed(&mut exhausted, "x").unwrap();
        exhausted.retry_count = 3;
        storage.save_job(&mut exhausted).unwrap();

        let mut done = storage.get_or_create(4).unwrap();
        storage.mark_started(&mut done).unwrap();
        storage.update_progress(&mut done, 1, 1).unwrap();
        storage.mark_completed(&mut done).unwrap();

        let ids: Vec<i64> = storage
            .pending_or_retryable(3)
            .unwrap()
            .iter()
            .map(|j| j.resource_id)
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_count_by_status() {
        let mut storage = storage();
        storage.get_or_create(1).unwrap();
        storage.get_or_create(2).unwrap();
        let mut job = storage.get_or_create(3).unwrap();
        storage.mark_started(&mut job).unwrap();

        let counts = storage.count_by_status().unwrap();
        assert_eq!(counts.get(&JobStatus::Pending), Some(&2));
        assert_eq!(counts.get(&JobStatus::InProgress), Some(&1));
        assert_eq!(counts.get(&JobStatus::Completed), None);
    }

    #[test]
    fn test_reclaim_stale() {
        let mut storage = storage();

        let mut stale = storage.get_or_create(1).unwrap();
        storage.mark_started(&mut stale).unwrap();
        stale.started_at = Some(Utc::now() - Duration::hours(3));
        storage.save_job(&mut stale).unwrap();

        let mut fresh = storage.get_or_create(2).unwrap();
        storage.mark_started(&mut fresh).unwrap();

        assert_eq!(storage.reclaim_stale(Duration::hours(1)).unwrap(), 1);

        let stale = storage.get_job(1).unwrap().unwrap();
        assert_eq!(stale.status, JobStatus::Failed);
        assert_eq!(
            stale.last_error.as_deref(),
            Some("stale in_progress job reclaimed")
        );
        assert_eq!(
            storage.get_job(2).unwrap().unwrap().status,
            JobStatus::InProgress
        );
    }

    #[test]
    fn test_runs() {
        let mut storage = storage();
        assert!(storage.get_latest_run().unwrap().is_none());

        let run_id = storage.create_run("resume", "abc123").unwrap();
        let running = storage.get_latest_run().unwrap().unwrap();
        assert_eq!(running.status, RunStatus::Running);
        assert_eq!(running.mode, "resume");

        let totals = RunTotals {
            total: 4,
            succeeded: 2,
            failed: 1,
            skipped: 1,
        };
        storage
            .finish_run(run_id, RunStatus::Completed, &totals)
            .unwrap();

        let finished = storage.get_latest_run().unwrap().unwrap();
        assert_eq!(finished.id, run_id);
        assert_eq!(finished.status, RunStatus::Completed);
        assert!(finished.finished_at.is_some());
        assert_eq!(finished.totals, totals);
        assert!(matches!(
            storage.finish_run(99, RunStatus::Completed, &totals),
            Err(StorageError::RunNotFound(99))
        ));
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("jobs.db");

        {
            let mut storage = SqliteStorage::new(&path).unwrap();
            let mut job = storage.get_or_create(5).unwrap();
            storage.mark_started(&mut job).unwrap();
        }

        let storage = SqliteStorage::new(&path).unwrap();
        let job = storage.get_job(5).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::InProgress);
    }
}
