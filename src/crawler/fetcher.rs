//! HTTP fetcher implementation
//!
//! This module handles page requests for the indexer, including:
//! - Building HTTP clients with a browser-compatible user agent string
//! - robots.txt checks before every page fetch
//! - Retry logic with exponential backoff for any fetch failure

use crate::config::{IndexerConfig, UserAgentConfig};
use crate::crawler::parser::parse_html;
use crate::robots::RobotsChecker;
use crate::IndexerError;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Builds an HTTP client with proper configuration
///
/// Redirects are followed with reqwest's default policy (at most 10 hops).
/// Per-request timeouts are set by each caller.
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use resource_indexer::config::UserAgentConfig;
/// use resource_indexer::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Builds the client used for sitemap HEAD probes
///
/// Redirects are not followed: a probe only counts when the conventional
/// path itself answers 200, so a site redirecting unknown paths to its
/// homepage is not mistaken for one with a sitemap.
pub fn build_probe_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .connect_timeout(Duration::from_secs(10))
        .redirect(reqwest::redirect::Policy::none())
        .build()
}

/// Exponential backoff between fetch attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Multiplier applied per attempt
    pub base: u32,
    /// Delay unit the powers of `base` are scaled by
    pub unit: Duration,
}

impl RetryPolicy {
    /// Builds the policy from the indexer configuration
    pub fn from_config(config: &IndexerConfig) -> Self {
        Self {
            max_attempts: config.max_retries,
            base: config.retry_base_delay,
            unit: Duration::from_millis(config.retry_unit_ms),
        }
    }

    /// Returns the pause after failed attempt `attempt` (zero-based), or
    /// `None` after the last attempt
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt + 1 >= self.max_attempts {
            return None;
        }
        let factor = self.base.saturating_pow(attempt);
        Some(self.unit.saturating_mul(factor))
    }
}

/// How a scrape ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrapeStatus {
    /// Page fetched and parsed
    Fetched,
    /// robots.txt forbids the URL; no request was sent
    Disallowed,
    /// Every attempt failed
    #[default]
    Failed,
}

/// Content scraped from one page
///
/// Disallowed and failed scrapes carry empty fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapedPage {
    pub content: String,
    pub title: String,
    pub description: String,
    pub status: ScrapeStatus,
}

impl ScrapedPage {
    fn empty(status: ScrapeStatus) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// Returns true if the page was actually fetched
    pub fn is_fetched(&self) -> bool {
        self.status == ScrapeStatus::Fetched
    }
}

/// Polite page scraper
pub struct PageScraper {
    client: Client,
    robots: Arc<RobotsChecker>,
    retry: RetryPolicy,
    request_timeout: Duration,
    max_content_length: usize,
}

impl PageScraper {
    /// Creates a scraper sharing the given robots cache
    pub fn new(client: Client, robots: Arc<RobotsChecker>, config: &IndexerConfig) -> Self {
        Self {
            client,
            robots,
            retry: RetryPolicy::from_config(config),
            request_timeout: config.request_timeout(),
            max_content_length: config.max_content_length,
        }
    }

    /// Scrapes a page: title, meta description and visible text
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Disallowed by robots.txt | No request, empty result |
    /// | Non-2xx status | Retry with backoff |
    /// | Timeout / network error | Retry with backoff |
    /// | Attempts exhausted | Empty result |
    ///
    /// Never returns an error; the outcome is reported in `ScrapedPage::status`.
    pub async fn scrape(&self, url: &str) -> ScrapedPage {
        if !self.robots.is_allowed(url).await {
            tracing::info!("URL blocked by robots.txt: {}", url);
            return ScrapedPage::empty(ScrapeStatus::Disallowed);
        }

        for attempt in 0..self.retry.max_attempts {
            match self.fetch_html(url).await {
                Ok(html) => {
                    let parsed = parse_html(&html, self.max_content_length);
                    return ScrapedPage {
                        content: parsed.content,
                        title: parsed.title,
                        description: parsed.description,
                        status: ScrapeStatus::Fetched,
                    };
                }
                Err(e) => {
                    tracing::warn!("Attempt {} failed for {}: {}", attempt + 1, url, e);
                    if let Some(delay) = self.retry.delay_after(attempt) {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        tracing::error!(
            "Failed to scrape {} after {} attempts",
            url,
            self.retry.max_attempts
        );
        ScrapedPage::empty(ScrapeStatus::Failed)
    }

    async fn fetch_html(&self, url: &str) -> Result<String, IndexerError> {
        let http_error = |source| IndexerError::Http {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(http_error)?;

        response.text().await.map_err(http_error)
    }
}
