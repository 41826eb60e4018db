//! Output module for reporting job tracking state
//!
//! This module handles:
//! - Summarizing the job store for `--status`
//! - Printing job statistics

pub mod stats;

pub use stats::{load_statistics, print_statistics, JobStatistics};
