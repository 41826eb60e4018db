//! REST client for an OpenSearch-compatible engine

use crate::search::{SearchError, SearchResult};
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Total time allowed for one engine request unless overridden
pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Client bound to a single index
#[derive(Debug, Clone)]
pub struct SearchClient {
    client: Client,
    base_url: String,
    index: String,
    timeout: Duration,
}

impl SearchClient {
    /// Creates a client for `index` on the engine at `base_url`
    pub fn new(client: Client, base_url: &str, index: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            index: index.into(),
            timeout: DEFAULT_SEARCH_TIMEOUT,
        }
    }

    /// Overrides the total timeout applied to every request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the index name
    pub fn index_name(&self) -> &str {
        &self.index
    }

    fn index_url(&self) -> String {
        format!("{}/{}", self.base_url, self.index)
    }

    /// Returns true if the index exists (`HEAD /{index}`)
    pub async fn index_exists(&self) -> SearchResult<bool> {
        let url = self.index_url();
        let response = self
            .client
            .head(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|source| SearchError::Request {
                url: url.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(SearchError::Status {
                url,
                status: status.as_u16(),
                body: String::new(),
            }),
        }
    }

    /// Creates the index with the given settings and mappings (`PUT /{index}`)
    pub async fn create_index(&self, body: &Value) -> SearchResult<()> {
        let url = self.index_url();
        let response = self.client.put(&url).timeout(self.timeout).json(body).send().await;
        check(url, response).await?;
        Ok(())
    }

    /// Creates or replaces a document by ID (`PUT /{index}/_doc/{id}`)
    pub async fn index_document<T: Serialize + ?Sized>(
        &self,
        id: &str,
        document: &T,
    ) -> SearchResult<()> {
        let url = format!("{}/_doc/{}", self.index_url(), id);
        let response = self
            .client
            .put(&url)
            .timeout(self.timeout)
            .json(document)
            .send()
            .await;
        check(url, response).await?;
        Ok(())
    }

    /// Deletes every document matching `query` (`POST /{index}/_delete_by_query`)
    ///
    /// # Returns
    ///
    /// The number of deleted documents reported by the engine
    pub async fn delete_stale(&self, query: &Value) -> SearchResult<u64> {
        let url = format!("{}/_delete_by_query", self.index_url());
        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(query)
            .send()
            .await;
        let response = check(url.clone(), response).await?;

        let body: Value = response
            .json()
            .await
            .map_err(|source| SearchError::Request { url, source })?;
        Ok(body.get("deleted").and_then(Value::as_u64).unwrap_or(0))
    }
}

/// Maps transport failures and non-2xx answers to `SearchError`
async fn check(url: String, response: reqwest::Result<Response>) -> SearchResult<Response> {
    let response = match response {
        Ok(response) => response,
        Err(source) => return Err(SearchError::Request { url, source }),
    };

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(SearchError::Status {
        url,
        status: status.as_u16(),
        body,
    })
}
