//! Sitemap discovery for resource websites
//!
//! This module finds the sitemaps of a site (conventional paths plus
//! `Sitemap:` directives in robots.txt), expands them into page URLs, and
//! bounds the result. Every failure here degrades the URL list instead of
//! failing the resource: a site without a usable sitemap is crawled as its
//! homepage alone.

mod sitemap;

pub use self::sitemap::{is_text_sitemap, parse_text_sitemap, parse_xml_sitemap, SitemapEntries};

use crate::config::IndexerConfig;
use crate::robots::RobotsChecker;
use crate::url::{resolve_against, site_origin};
use reqwest::{Client, StatusCode};
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// Conventional sitemap locations probed on every site, in probe order
pub const SITEMAP_PATHS: [&str; 4] = [
    "/sitemap.xml",
    "/sitemap_index.xml",
    "/sitemap.txt",
    "/sitemaps.xml",
];

/// Deepest chain of nested sitemap indexes that is followed
const MAX_SITEMAP_NESTING: usize = 5;

type UrlListFuture<'a> = Pin<Box<dyn Future<Output = Vec<String>> + Send + 'a>>;

/// Discovers crawlable page URLs for a site
pub struct SiteDiscovery {
    client: Client,
    probe_client: Client,
    robots: Arc<RobotsChecker>,
    head_timeout: Duration,
    request_timeout: Duration,
}

impl SiteDiscovery {
    /// Creates a discovery component sharing the given robots cache
    ///
    /// `probe_client` sends the HEAD probes and must not follow redirects
    /// (see `build_probe_client`).
    pub fn new(
        client: Client,
        probe_client: Client,
        robots: Arc<RobotsChecker>,
        config: &IndexerConfig,
    ) -> Self {
        Self {
            client,
            probe_client,
            robots,
            head_timeout: config.sitemap_head_timeout(),
            request_timeout: config.request_timeout(),
        }
    }

    /// Finds the sitemaps of the site `base_url` belongs to
    ///
    /// Conventional paths that answer a HEAD request with a direct 200 come
    /// first (a redirect is not a sitemap), then
    /// sitemaps declared in robots.txt (resolved against the site origin).
    /// The list is deduplicated in discovery order.
    pub async fn discover_sitemaps(&self, base_url: &str) -> Vec<String> {
        let origin = match site_origin(base_url) {
            Ok(origin) => origin,
            Err(e) => {
                tracing::warn!("Cannot discover sitemaps for {}: {}", base_url, e);
                return Vec::new();
            }
        };

        let mut found: Vec<String> = Vec::new();

        for probe in SITEMAP_PATHS {
            let sitemap_url = format!("{}{}", origin, probe);
            match self
                .probe_client
                .head(&sitemap_url)
                .timeout(self.head_timeout)
                .send()
                .await
            {
                Ok(response) if response.status() == StatusCode::OK => {
                    tracing::info!("Found sitemap: {}", sitemap_url);
                    found.push(sitemap_url);
                }
                Ok(response) => {
                    tracing::debug!("No sitemap at {} (HTTP {})", sitemap_url, response.status());
                }
                Err(e) => {
                    tracing::debug!("No sitemap at {}: {}", sitemap_url, e);
                }
            }
        }

        let robots = self.robots.robots_for(&origin).await;
        for declared in robots.sitemaps() {
            let Some(sitemap_url) = resolve_against(&origin, &declared) else {
                tracing::debug!("Ignoring unusable robots.txt sitemap '{}'", declared);
                continue;
            };
            if !found.contains(&sitemap_url) {
                tracing::info!("Found sitemap in robots.txt: {}", sitemap_url);
                found.push(sitemap_url);
            }
        }

        found
    }

    /// Fetches one sitemap and returns the allowed page URLs it lists
    ///
    /// Sitemap indexes are expanded recursively. Fetch failures and malformed
    /// XML are logged and yield an empty list.
    pub async fn parse_sitemap(&self, sitemap_url: &str) -> Vec<String> {
        self.parse_nested(sitemap_url, 0).await
    }

    fn parse_nested<'a>(&'a self, sitemap_url: &'a str, nesting: usize) -> UrlListFuture<'a> {
        Box::pin(async move {
            if nesting > MAX_SITEMAP_NESTING {
                tracing::warn!("Sitemap nesting too deep at {}, skipping", sitemap_url);
                return Vec::new();
            }

            let response = match self
                .client
                .get(sitemap_url)
                .timeout(self.request_timeout)
                .send()
                .await
                .and_then(|r| r.error_for_status())
            {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!("Failed to fetch sitemap {}: {}", sitemap_url, e);
                    return Vec::new();
                }
            };

            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            let body = match response.bytes().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::error!("Failed to read sitemap {}: {}", sitemap_url, e);
                    return Vec::new();
                }
            };

            let mut urls = Vec::new();

            if is_text_sitemap(sitemap_url, content_type.as_deref(), &body) {
                for url in parse_text_sitemap(&String::from_utf8_lossy(&body)) {
                    if self.robots.is_allowed(&url).await {
                        urls.push(url);
                    }
                }
                return urls;
            }

            let entries = match parse_xml_sitemap(&body) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("Could not parse XML sitemap {}: {}", sitemap_url, e);
                    return Vec::new();
                }
            };

            for child in &entries.sitemaps {
                urls.extend(self.parse_nested(child, nesting + 1).await);
            }

            for url in entries.urls {
                if self.robots.is_allowed(&url).await {
                    urls.push(url);
                } else {
                    tracing::debug!("Sitemap URL blocked by robots.txt: {}", url);
                }
            }

            urls
        })
    }

    /// Returns up to `max_pages` URLs to crawl for a site
    ///
    /// Sitemap URLs are deduplicated in first-seen order, so an unchanged
    /// sitemap always yields the same list in the same order. When no sitemap
    /// is discovered the result is exactly `[base_url]`.
    pub async fn get_all_site_urls(&self, base_url: &str, max_pages: usize) -> Vec<String> {
        let sitemaps = self.discover_sitemaps(base_url).await;

        if sitemaps.is_empty() {
            tracing::info!("No sitemaps found for {}, indexing homepage only", base_url);
            return vec![base_url.to_string()];
        }

        let mut seen = HashSet::new();
        let mut all_urls = Vec::new();

        'sitemaps: for sitemap_url in &sitemaps {
            for url in self.parse_sitemap(sitemap_url).await {
                if all_urls.len() >= max_pages {
                    break 'sitemaps;
                }
                if seen.insert(url.clone()) {
                    all_urls.push(url);
                }
            }
        }

        tracing::info!(
            "Found {} URLs from {} sitemaps for {}",
            all_urls.len(),
            sitemaps.len(),
            base_url
        );
        all_urls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn discovery() -> SiteDiscovery {
        let client = Client::new();
        let probe_client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();
        let config = IndexerConfig::default();
        let robots = Arc::new(RobotsChecker::new(
            client.clone(),
            "TestBot",
            config.robots_txt_timeout(),
        ));
        SiteDiscovery::new(client, probe_client, robots, &config)
    }

    fn urlset(urls: &[String]) -> String {
        let entries: String = urls
            .iter()
            .map(|u| format!("<url><loc>{}</loc></url>", u))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</urlset>"#,
            entries
        )
    }

    async fn mount_head(server: &MockServer, sitemap_path: &str) {
        Mock::given(method("HEAD"))
            .and(path(sitemap_path))
            .respond_with(ResponseTemplate::new(200))
            .mount(server)
            .await;
    }

    async fn mount_get(server: &MockServer, page_path: &str, body: String, content_type: &str) {
        Mock::given(method("GET"))
            .and(path(page_path))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(body, content_type),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_homepage_fallback_without_sitemaps() {
        let server = MockServer::start().await;
        let base = format!("{}/", server.uri());

        let urls = discovery().get_all_site_urls(&base, 50).await;
        assert_eq!(urls, vec![base]);
    }

    #[tokio::test]
    async fn test_redirected_probe_is_not_a_sitemap() {
        let server = MockServer::start().await;
        let base = server.uri();
        Mock::given(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(301).insert_header("Location", "/"))
            .mount(&server)
            .await;
        mount_get(
            &server,
            "/",
            "<html><body>Home</body></html>".to_string(),
            "text/html",
        )
        .await;
        Mock::given(method("HEAD"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let d = discovery();
        assert!(d.discover_sitemaps(&base).await.is_empty());
        assert_eq!(d.get_all_site_urls(&base, 50).await, vec![base]);
    }

    #[tokio::test]
    async fn test_probed_then_robots_declared_order() {
        let server = MockServer::start().await;
        mount_head(&server, "/sitemap_index.xml").await;
        mount_head(&server, "/sitemap.txt").await;
        mount_get(
            &server,
            "/robots.txt",
            "User-agent: *\nSitemap: /extra.xml\nsitemap: /sitemap.txt".to_string(),
            "text/plain",
        )
        .await;

        let found = discovery().discover_sitemaps(&server.uri()).await;
        assert_eq!(
            found,
            vec![
                format!("{}/sitemap_index.xml", server.uri()),
                format!("{}/sitemap.txt", server.uri()),
                format!("{}/extra.xml", server.uri()),
            ]
        );
    }

    #[tokio::test]
    async fn test_urlset_filtered_by_robots() {
        let server = MockServer::start().await;
        let base = server.uri();
        mount_head(&server, "/sitemap.xml").await;
        mount_get(
            &server,
            "/robots.txt",
            "User-agent: *\nDisallow: /private".to_string(),
            "text/plain",
        )
        .await;
        mount_get(
            &server,
            "/sitemap.xml",
            urlset(&[
                format!("{}/", base),
                format!("{}/private/staff", base),
                format!("{}/services", base),
            ]),
            "application/xml",
        )
        .await;

        let urls = discovery().get_all_site_urls(&base, 50).await;
        assert_eq!(urls, vec![format!("{}/", base), format!("{}/services", base)]);
    }

    #[tokio::test]
    async fn test_sitemap_index_is_expanded() {
        let server = MockServer::start().await;
        let base = server.uri();
        mount_head(&server, "/sitemap_index.xml").await;
        mount_get(
            &server,
            "/sitemap_index.xml",
            format!(
                r#"<?xml version="1.0"?><sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"><sitemap><loc>{0}/pages.xml</loc></sitemap><sitemap><loc>{0}/posts.xml</loc></sitemap></sitemapindex>"#,
                base
            ),
            "application/xml",
        )
        .await;
        mount_get(&server, "/pages.xml", urlset(&[format!("{}/a", base)]), "application/xml").await;
        mount_get(
            &server,
            "/posts.xml",
            urlset(&[format!("{}/b", base), format!("{}/a", base)]),
            "application/xml",
        )
        .await;

        let urls = discovery().get_all_site_urls(&base, 50).await;
        assert_eq!(urls, vec![format!("{}/a", base), format!("{}/b", base)]);
    }

    #[tokio::test]
    async fn test_text_sitemap() {
        let server = MockServer::start().await;
        let base = server.uri();
        mount_get(
            &server,
            "/sitemap.txt",
            format!("{0}/one\n\n{0}/two\nnot-a-url\n", base),
            "text/plain",
        )
        .await;

        let urls = discovery()
            .parse_sitemap(&format!("{}/sitemap.txt", base))
            .await;
        assert_eq!(urls, vec![format!("{}/one", base), format!("{}/two", base)]);
    }

    #[tokio::test]
    async fn test_malformed_sitemap_yields_nothing() {
        let server = MockServer::start().await;
        let base = server.uri();
        mount_head(&server, "/sitemap.xml").await;
        mount_get(
            &server,
            "/sitemap.xml",
            "<urlset><url><loc>broken".to_string(),
            "application/xml",
        )
        .await;

        let d = discovery();
        assert!(d.parse_sitemap(&format!("{}/sitemap.xml", base)).await.is_empty());
        // A sitemap was discovered, so there is no homepage fallback
        assert!(d.get_all_site_urls(&base, 50).await.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_sitemap_yields_nothing() {
        let server = MockServer::start().await;
        let urls = discovery()
            .parse_sitemap(&format!("{}/missing.xml", server.uri()))
            .await;
        assert!(urls.is_empty());
    }

    #[tokio::test]
    async fn test_result_is_bounded_by_max_pages() {
        let server = MockServer::start().await;
        let base = server.uri();
        let pages: Vec<String> = (0..20).map(|i| format!("{}/page-{}", base, i)).collect();
        mount_head(&server, "/sitemap.xml").await;
        mount_get(&server, "/sitemap.xml", urlset(&pages), "application/xml").await;

        let urls = discovery().get_all_site_urls(&base, 5).await;
        assert_eq!(urls, pages[..5].to_vec());
    }

    #[tokio::test]
    async fn test_self_referencing_index_terminates() {
        let server = MockServer::start().await;
        let base = server.uri();
        mount_get(
            &server,
            "/loop.xml",
            format!(
                r#"<?xml version="1.0"?><sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"><sitemap><loc>{}/loop.xml</loc></sitemap></sitemapindex>"#,
                base
            ),
            "application/xml",
        )
        .await;

        let urls = discovery().parse_sitemap(&format!("{}/loop.xml", base)).await;
        assert!(urls.is_empty());
    }
}
