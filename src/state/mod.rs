//! State module for tracking indexing progress
//!
//! # Components
//!
//! - `JobStatus`: lifecycle state of one resource's indexing job
//! - `IndexingJob`: the persisted job record and its transition rules

mod job_state;

pub use job_state::{IndexingJob, JobStatus};
