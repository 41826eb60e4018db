use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for the resource indexer
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub indexer: IndexerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    pub catalog: CatalogConfig,
    pub search: SearchConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
}

/// Crawl limits, retry policy, delays and timeouts
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct IndexerConfig {
    /// Maximum pages indexed per website
    pub max_pages_per_site: usize,

    /// Maximum characters of page text kept per document
    pub max_content_length: usize,

    /// Fetch attempts per page before giving up
    pub max_retries: u32,

    /// Exponential backoff base (delay = unit * base^attempt)
    pub retry_base_delay: u32,

    /// Backoff unit in milliseconds
    pub retry_unit_ms: u64,

    /// Retry-mode cap on a job's retry count
    pub max_job_retries: u32,

    /// Pause between pages of the same site (milliseconds)
    pub delay_between_pages_ms: u64,

    /// Pause between sites (milliseconds)
    pub delay_between_sites_ms: u64,

    /// Page and sitemap fetch timeout (seconds)
    pub request_timeout_secs: u64,

    /// Sitemap HEAD probe timeout (seconds)
    pub sitemap_head_timeout_secs: u64,

    /// Robots.txt fetch timeout (seconds)
    pub robots_txt_timeout_secs: u64,

    /// Age after which an `in_progress` job is reclaimed as failed (0 disables)
    pub stale_job_timeout_minutes: u64,

    /// Delete documents of pages that vanished from a re-crawled site
    pub prune_stale_documents: bool,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            max_pages_per_site: 50,
            max_content_length: 5000,
            max_retries: 3,
            retry_base_delay: 2,
            retry_unit_ms: 1000,
            max_job_retries: 3,
            delay_between_pages_ms: 500,
            delay_between_sites_ms: 1000,
            request_timeout_secs: 10,
            sitemap_head_timeout_secs: 5,
            robots_txt_timeout_secs: 5,
            stale_job_timeout_minutes: 0,
            prune_stale_documents: true,
        }
    }
}

impl IndexerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn sitemap_head_timeout(&self) -> Duration {
        Duration::from_secs(self.sitemap_head_timeout_secs)
    }

    pub fn robots_txt_timeout(&self) -> Duration {
        Duration::from_secs(self.robots_txt_timeout_secs)
    }

    pub fn delay_between_pages(&self) -> Duration {
        Duration::from_millis(self.delay_between_pages_ms)
    }

    pub fn delay_between_sites(&self) -> Duration {
        Duration::from_millis(self.delay_between_sites_ms)
    }

    /// Returns the stale-job threshold, if reclaiming is enabled
    pub fn stale_job_timeout(&self) -> Option<chrono::Duration> {
        (self.stale_job_timeout_minutes > 0)
            .then(|| chrono::Duration::minutes(self.stale_job_timeout_minutes as i64))
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Product token, also used to match robots.txt groups
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    pub contact_url: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "ResourceIndexer".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.org/indexer".to_string(),
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header sent with every request
    ///
    /// Format: `Mozilla/5.0 (compatible; Name/Version; +ContactURL)`
    pub fn header_value(&self) -> String {
        format!(
            "Mozilla/5.0 (compatible; {}/{}; +{})",
            self.crawler_name, self.crawler_version, self.contact_url
        )
    }
}

/// Catalog service connection
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CatalogConfig {
    /// Base URL of the catalog API (e.g. `http://backend:5000`)
    pub base_url: String,

    /// Number of cards requested per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Added to card IDs so resource IDs do not collide with other sources
    #[serde(default = "default_resource_id_offset")]
    pub resource_id_offset: i64,

    /// Category stamped on every document from this catalog
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_page_size() -> u32 {
    100
}

fn default_resource_id_offset() -> i64 {
    10_000
}

fn default_category() -> String {
    "Business Directory".to_string()
}

/// Search engine connection
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SearchConfig {
    /// Base URL of the OpenSearch/Elasticsearch HTTP endpoint
    pub url: String,

    /// Namespace prefix of the index name
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_namespace() -> String {
    "default".to_string()
}

impl SearchConfig {
    /// Name of the index documents are written to
    pub fn index_name(&self) -> String {
        format!("{}-resources", self.namespace)
    }
}

/// Job store configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TrackingConfig {
    /// Path to the SQLite job store
    pub database_path: String,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            database_path: "./indexing_jobs.db".to_string(),
        }
    }
}
