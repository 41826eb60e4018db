//! Robots.txt handling module
//!
//! This module fetches, parses, and caches robots.txt files, one per site
//! origin. A missing or unreachable robots file never stops a crawl: it is
//! treated as allow-all.

mod cache;
mod parser;

pub use cache::CachedRobots;
pub use parser::ParsedRobots;

use crate::url::site_origin;
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Fetches and parses robots.txt for a site origin
///
/// | Outcome | Policy |
/// |---------|--------|
/// | 2xx | Parsed rules |
/// | 401 / 403 | Deny all |
/// | Other status | Allow all |
/// | Network error / timeout | Allow all |
pub async fn fetch_robots(client: &Client, origin: &str, timeout: Duration) -> ParsedRobots {
    let robots_url = format!("{}/robots.txt", origin.trim_end_matches('/'));

    let response = match client.get(&robots_url).timeout(timeout).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!("Could not load robots.txt for {}: {}", origin, e);
            return ParsedRobots::allow_all();
        }
    };

    let status = response.status();
    if status.is_success() {
        match response.text().await {
            Ok(body) => {
                tracing::info!("Loaded robots.txt for {}", origin);
                ParsedRobots::from_content(&body)
            }
            Err(e) => {
                tracing::debug!("Could not read robots.txt body for {}: {}", origin, e);
                ParsedRobots::allow_all()
            }
        }
    } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        tracing::info!("robots.txt for {} answered {}, denying all", origin, status);
        ParsedRobots::deny_all()
    } else {
        tracing::debug!("No robots.txt for {} (HTTP {})", origin, status);
        ParsedRobots::allow_all()
    }
}

/// Robots.txt checker with a per-origin cache
///
/// The cache is owned by the checker rather than held globally, so each
/// checker (and each test) sees its own view. It is shared between sitemap
/// discovery and the page scraper through an `Arc`.
pub struct RobotsChecker {
    client: Client,
    user_agent: String,
    timeout: Duration,
    cache: Mutex<HashMap<String, CachedRobots>>,
}

impl RobotsChecker {
    /// Creates a checker
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client used for robots.txt requests
    /// * `user_agent` - Product token matched against `User-agent` groups
    /// * `timeout` - Timeout for each robots.txt request
    pub fn new(client: Client, user_agent: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            user_agent: user_agent.into(),
            timeout,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Checks whether a URL may be fetched
    ///
    /// URLs that cannot be parsed are allowed; the fetch itself will fail
    /// and be handled by the caller.
    pub async fn is_allowed(&self, url: &str) -> bool {
        let origin = match site_origin(url) {
            Ok(origin) => origin,
            Err(e) => {
                tracing::debug!("Error checking robots.txt for {}: {}", url, e);
                return true;
            }
        };

        self.robots_for(&origin).await.is_allowed(url, &self.user_agent)
    }

    /// Returns the robots rules for an origin, fetching them on a cache miss
    pub async fn robots_for(&self, origin: &str) -> ParsedRobots {
        if let Some(cached) = self.cached(origin) {
            return cached;
        }

        let parsed = fetch_robots(&self.client, origin, self.timeout).await;
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(origin.to_string(), CachedRobots::new(parsed.clone()));
        parsed
    }

    #[cfg(test)]
    fn cached_origins(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn cached(&self, origin: &str) -> Option<ParsedRobots> {
        let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache
            .get(origin)
            .filter(|entry| !entry.is_stale())
            .map(|entry| entry.content.clone())
    }
}
