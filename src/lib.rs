//! Resource Indexer: a polite website indexer for directory listings
//!
//! This crate loads resources from a catalog service, discovers the pages of
//! each resource's website through its sitemaps, scrapes them while respecting
//! robots.txt, and writes one search document per page. Per-resource progress
//! is tracked in a SQLite job store so that batches can be resumed or retried.

pub mod catalog;
pub mod config;
pub mod crawler;
pub mod discovery;
pub mod output;
pub mod robots;
pub mod search;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for indexer operations
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Search engine error: {0}")]
    Search(#[from] search::SearchError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] catalog::CatalogError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Resource {0} not found in catalog")]
    ResourceNotFound(i64),

    #[error("Resource {0} has no website")]
    NoWebsite(i64),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Rejected indexing job lifecycle changes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Invalid job transition: {from} -> {to}")]
    Invalid {
        from: state::JobStatus,
        to: state::JobStatus,
    },

    #[error("Job for resource {resource_id} cannot complete without indexed pages")]
    NothingIndexed { resource_id: i64 },

    #[error("Progress {pages_indexed}/{total_pages} exceeds the page total")]
    ProgressOverflow { pages_indexed: u32, total_pages: u32 },

    #[error("Job for resource {resource_id} reached the retry limit ({retry_count})")]
    RetryLimit { resource_id: i64, retry_count: u32 },
}

/// Result type alias for indexer operations
pub type Result<T> = std::result::Result<T, IndexerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use catalog::{CatalogClient, Resource};
pub use config::Config;
pub use crawler::{Coordinator, IndexMode, ResourceOutcome, RunOptions};
pub use state::{IndexingJob, JobStatus};
pub use crate::url::{extract_domain, site_origin};
