//! Search documents and the page indexer

use crate::catalog::Resource;
use crate::crawler::ScrapedPage;
use crate::search::{SearchClient, SearchResult};
use crate::url::{extract_domain, same_page};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One search document per crawled page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub resource_id: i64,
    /// Page title, or the resource title when the page had none
    pub title: String,
    /// Page meta description, or the resource description when the page had none
    pub description: String,
    pub content: String,
    /// The resource's canonical site URL
    pub url: String,
    /// The crawled page URL
    pub page_url: String,
    pub category: String,
    pub phone: String,
    pub address: String,
    /// Host of `page_url`
    pub domain: String,
    pub is_homepage: bool,
    pub indexed_at: String,
    pub page_title: String,
    pub page_description: String,
    pub resource_title: String,
    pub resource_description: String,
}

impl SearchDocument {
    /// Builds the document for one scraped page of a resource
    pub fn build(
        resource: &Resource,
        page_url: &str,
        scraped: &ScrapedPage,
        indexed_at: DateTime<Utc>,
    ) -> Self {
        let website_url = resource.website_url.clone().unwrap_or_default();

        Self {
            resource_id: resource.id,
            title: prefer(&scraped.title, &resource.title),
            description: prefer(&scraped.description, &resource.description),
            content: scraped.content.clone(),
            is_homepage: same_page(page_url, &website_url),
            url: website_url,
            page_url: page_url.to_string(),
            category: resource.category.clone(),
            phone: resource.phone.clone(),
            address: resource.address.clone(),
            domain: extract_domain(page_url).unwrap_or_default(),
            indexed_at: indexed_at.to_rfc3339(),
            page_title: scraped.title.clone(),
            page_description: scraped.description.clone(),
            resource_title: resource.title.clone(),
            resource_description: resource.description.clone(),
        }
    }
}

fn prefer(page_value: &str, fallback: &str) -> String {
    if page_value.is_empty() {
        fallback.to_string()
    } else {
        page_value.to_string()
    }
}

/// Returns the deterministic document ID of a page: `{resource_id}-{page_index}`
pub fn document_id(resource_id: i64, page_index: usize) -> String {
    format!("{}-{}", resource_id, page_index)
}

/// Settings and field mapping of the resource index
pub fn index_mapping() -> Value {
    let text = json!({"type": "text", "analyzer": "standard"});
    let keyword = json!({"type": "keyword"});

    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 0
        },
        "mappings": {
            "properties": {
                "resource_id": {"type": "integer"},
                "title": text,
                "description": text,
                "content": text,
                "url": keyword,
                "page_url": keyword,
                "category": keyword,
                "domain": keyword,
                "phone": keyword,
                "address": {"type": "text"},
                "is_homepage": {"type": "boolean"},
                "indexed_at": {"type": "date"},
                "page_title": text,
                "page_description": text,
                "resource_title": text,
                "resource_description": text
            }
        }
    })
}

/// Writes page documents into the resource index
pub struct DocumentIndexer {
    search: SearchClient,
}

impl DocumentIndexer {
    pub fn new(search: SearchClient) -> Self {
        Self { search }
    }

    /// Returns the index name
    pub fn index_name(&self) -> &str {
        self.search.index_name()
    }

    /// Creates the index with its mapping unless it already exists
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The index was created
    /// * `Ok(false)` - The index already existed
    pub async fn ensure_index(&self) -> SearchResult<bool> {
        if self.search.index_exists().await? {
            return Ok(false);
        }
        self.search.create_index(&index_mapping()).await?;
        Ok(true)
    }

    /// Upserts the document of one page
    ///
    /// Failures are logged and reported as `false`; they never abort the
    /// remaining pages of a resource.
    pub async fn index_page(
        &self,
        resource: &Resource,
        page_url: &str,
        page_index: usize,
        scraped: &ScrapedPage,
    ) -> bool {
        let doc_id = document_id(resource.id, page_index);
        let document = SearchDocument::build(resource, page_url, scraped, Utc::now());

        match self.search.index_document(&doc_id, &document).await {
            Ok(()) => {
                tracing::debug!("Indexed {} as {}", page_url, doc_id);
                true
            }
            Err(e) => {
                tracing::error!("Failed to index {} ({}): {}", page_url, doc_id, e);
                false
            }
        }
    }

    /// Deletes documents of a resource outside the current crawl set
    ///
    /// Keeps `{resource_id}-0` up to `{resource_id}-{total_pages - 1}`.
    ///
    /// # Returns
    ///
    /// The number of documents deleted
    pub async fn prune_stale(&self, resource_id: i64, total_pages: usize) -> SearchResult<u64> {
        if total_pages == 0 {
            return Ok(0);
        }

        let keep: Vec<String> = (0..total_pages)
            .map(|index| document_id(resource_id, index))
            .collect();

        let query = json!({
            "query": {
                "bool": {
                    "filter": [{"term": {"resource_id": resource_id}}],
                    "must_not": [{"ids": {"values": keep}}]
                }
            }
        });

        self.search.delete_stale(&query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::ScrapeStatus;
    use reqwest::Client;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn resource() -> Resource {
        Resource {
            id: 42,
            title: "Example Org".to_string(),
            description: "Catalog description".to_string(),
            website_url: Some("https://example.com".to_string()),
            category: "Business Directory".to_string(),
            phone: "555-0100".to_string(),
            address: "1 Main St".to_string(),
        }
    }

    fn scraped(title: &str, description: &str) -> ScrapedPage {
        ScrapedPage {
            content: "page text".to_string(),
            title: title.to_string(),
            description: description.to_string(),
            status: ScrapeStatus::Fetched,
        }
    }

    fn indexer(server: &MockServer) -> DocumentIndexer {
        DocumentIndexer::new(SearchClient::new(
            Client::new(),
            &server.uri(),
            "default-resources",
        ))
    }

    #[test]
    fn test_document_id() {
        assert_eq!(document_id(42, 0), "42-0");
        assert_eq!(document_id(10007, 12), "10007-12");
    }

    #[test]
    fn test_build_prefers_page_values() {
        let doc = SearchDocument::build(
            &resource(),
            "https://example.com/about",
            &scraped("About", "About page"),
            Utc::now(),
        );

        assert_eq!(doc.title, "About");
        assert_eq!(doc.description, "About page");
        assert_eq!(doc.resource_title, "Example Org");
        assert_eq!(doc.domain, "example.com");
        assert_eq!(doc.url, "https://example.com");
        assert!(!doc.is_homepage);
    }

    #[test]
    fn test_build_falls_back_to_catalog_values() {
        let doc = SearchDocument::build(
            &resource(),
            "https://example.com",
            &scraped("", ""),
            Utc::now(),
        );

        assert_eq!(doc.title, "Example Org");
        assert_eq!(doc.description, "Catalog description");
        assert_eq!(doc.page_title, "");
        assert!(doc.is_homepage);
    }

    #[test]
    fn test_homepage_with_trailing_slash() {
        let doc = SearchDocument::build(
            &resource(),
            "https://example.com/",
            &scraped("Home", ""),
            Utc::now(),
        );

        assert!(doc.is_homepage);
        assert_eq!(doc.page_url, "https://example.com/");
        assert_eq!(doc.url, "https://example.com");
    }

    #[test]
    fn test_mapping_field_types() {
        let mapping = index_mapping();
        let properties = &mapping["mappings"]["properties"];
        assert_eq!(properties["content"]["type"], "text");
        assert_eq!(properties["page_url"]["type"], "keyword");
        assert_eq!(properties["is_homepage"]["type"], "boolean");
        assert_eq!(properties["indexed_at"]["type"], "date");
        assert_eq!(properties["resource_id"]["type"], "integer");
    }

    #[tokio::test]
    async fn test_ensure_index_creates_once() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/default-resources"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/default-resources"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        assert!(indexer(&server).ensure_index().await.unwrap());
    }

    #[tokio::test]
    async fn test_ensure_index_skips_existing() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/default-resources"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        assert!(!indexer(&server).ensure_index().await.unwrap());
    }

    #[tokio::test]
    async fn test_index_page_puts_document() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/default-resources/_doc/42-3"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let ok = indexer(&server)
            .index_page(&resource(), "https://example.com/x", 3, &scraped("X", ""))
            .await;
        assert!(ok);

        let requests = server.received_requests().await.unwrap();
        let doc: SearchDocument = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(doc.resource_id, 42);
        assert_eq!(doc.page_url, "https://example.com/x");
        assert_eq!(doc.title, "X");
        assert_eq!(doc.description, "Catalog description");
    }

    #[tokio::test]
    async fn test_index_page_failure_returns_false() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let ok = indexer(&server)
            .index_page(&resource(), "https://example.com", 0, &scraped("", ""))
            .await;
        assert!(!ok);
    }

    #[tokio::test]
    async fn test_prune_stale_keeps_current_ids() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/default-resources/_delete_by_query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deleted": 1})))
            .expect(1)
            .mount(&server)
            .await;

        let deleted = indexer(&server).prune_stale(42, 2).await.unwrap();
        assert_eq!(deleted, 1);

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(
            body["query"]["bool"]["must_not"][0]["ids"]["values"],
            json!(["42-0", "42-1"])
        );
        assert_eq!(body["query"]["bool"]["filter"][0]["term"]["resource_id"], 42);
    }

    #[tokio::test]
    async fn test_prune_stale_with_nothing_to_keep_is_noop() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        assert_eq!(indexer(&server).prune_stale(42, 0).await.unwrap(), 0);
    }
}
