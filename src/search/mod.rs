//! Search engine integration
//!
//! This module writes one document per crawled page into an
//! OpenSearch-compatible index:
//! - `SearchClient`: thin REST client for the index and document endpoints
//! - `DocumentIndexer`: index mapping, document building and stale pruning

mod client;
mod document;

pub use client::SearchClient;
pub use document::{document_id, index_mapping, DocumentIndexer, SearchDocument};

use thiserror::Error;

/// Errors returned by the search engine
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },

    #[error("Search engine answered {status} for {url}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
}

/// Result type for search operations
pub type SearchResult<T> = Result<T, SearchError>;
