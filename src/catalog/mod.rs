//! Catalog service client
//!
//! Loads the directory listings ("resources") to index from the catalog's
//! paginated cards endpoint. Only cards with a website are returned.

use crate::config::CatalogConfig;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

/// Errors returned while reading the catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },

    #[error("Catalog answered HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Malformed catalog response from {url}: {source}")]
    Decode { url: String, source: reqwest::Error },
}

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// A card as served by the catalog
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogCard {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub website_url: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CardsPage {
    #[serde(default)]
    cards: Vec<CatalogCard>,
}

/// A directory listing eligible for indexing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub website_url: Option<String>,
    pub category: String,
    pub phone: String,
    pub address: String,
}

impl Resource {
    /// Maps a card to a resource, offsetting its ID
    pub fn from_card(card: CatalogCard, id_offset: i64, category: &str) -> Self {
        Self {
            id: id_offset + card.id,
            title: card.name.unwrap_or_default(),
            description: card.description.unwrap_or_default(),
            website_url: card
                .website_url
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty()),
            category: category.to_string(),
            phone: card.phone_number.unwrap_or_default(),
            address: card.address.unwrap_or_default(),
        }
    }

    /// Returns the website URL if the resource has one
    pub fn site_url(&self) -> Option<&str> {
        self.website_url.as_deref()
    }
}

/// Total time allowed for one catalog page unless overridden
pub const DEFAULT_CATALOG_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the catalog service
pub struct CatalogClient {
    client: Client,
    config: CatalogConfig,
    timeout: Duration,
}

impl CatalogClient {
    pub fn new(client: Client, config: CatalogConfig) -> Self {
        Self {
            client,
            config,
            timeout: DEFAULT_CATALOG_TIMEOUT,
        }
    }

    /// Overrides the total timeout applied to every page request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Loads every resource that has a website
    ///
    /// Pages through `GET {base}/api/cards?limit=N&offset=M` until a short
    /// page. A page that repeats only already-seen cards also ends the walk,
    /// so a server ignoring `offset` cannot loop forever.
    pub async fn load_resources(&self) -> CatalogResult<Vec<Resource>> {
        let limit = self.config.page_size as usize;
        let mut offset = 0;
        let mut seen = HashSet::new();
        let mut resources = Vec::new();

        loop {
            let cards = self.fetch_page(limit, offset).await?;
            let count = cards.len();

            let mut new_cards = 0;
            for card in cards {
                if !seen.insert(card.id) {
                    continue;
                }
                new_cards += 1;
                let resource =
                    Resource::from_card(card, self.config.resource_id_offset, &self.config.category);
                if resource.site_url().is_some() {
                    resources.push(resource);
                }
            }

            if count < limit || new_cards == 0 {
                break;
            }
            offset += count;
        }

        tracing::info!(
            "Loaded {} resources with websites from {} catalog cards",
            resources.len(),
            seen.len()
        );
        Ok(resources)
    }

    /// Loads one resource by its (offset) resource ID
    pub async fn find_resource(&self, resource_id: i64) -> CatalogResult<Option<Resource>> {
        Ok(self
            .load_resources()
            .await?
            .into_iter()
            .find(|resource| resource.id == resource_id))
    }

    async fn fetch_page(&self, limit: usize, offset: usize) -> CatalogResult<Vec<CatalogCard>> {
        let url = format!(
            "{}/api/cards?limit={}&offset={}",
            self.config.base_url.trim_end_matches('/'),
            limit,
            offset
        );
        tracing::debug!("Fetching catalog page {}", url);

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|source| CatalogError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let page: CardsPage = response
            .json()
            .await
            .map_err(|source| CatalogError::Decode { url, source })?;
        Ok(page.cards)
    }
}
