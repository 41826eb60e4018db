//! Sitemap body parsing
//!
//! XML sitemaps follow the sitemaps.org protocol and are read with the
//! `sitemap` crate's streaming reader; plain-text sitemaps list one URL
//! per line.

use sitemap::reader::{SiteMapEntity, SiteMapReader};
use std::io::Cursor;

/// Locations listed by one XML sitemap document
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SitemapEntries {
    /// Child sitemaps from a `<sitemapindex>`
    pub sitemaps: Vec<String>,

    /// Page URLs from a `<urlset>`
    pub urls: Vec<String>,
}

/// Parses an XML sitemap or sitemap index
///
/// # Returns
///
/// * `Ok(SitemapEntries)` - The `<loc>` values, in document order
/// * `Err(String)` - The document is not well-formed XML
pub fn parse_xml_sitemap(body: &[u8]) -> Result<SitemapEntries, String> {
    let mut entries = SitemapEntries::default();

    for entity in SiteMapReader::new(Cursor::new(body)) {
        match entity {
            SiteMapEntity::Url(entry) => {
                if let Some(url) = entry.loc.get_url() {
                    entries.urls.push(url.to_string());
                }
            }
            SiteMapEntity::SiteMap(entry) => {
                if let Some(url) = entry.loc.get_url() {
                    entries.sitemaps.push(url.to_string());
                }
            }
            SiteMapEntity::Err(error) => return Err(format!("{:?}", error)),
        }
    }

    Ok(entries)
}

/// Parses a plain-text sitemap: one absolute URL per line
pub fn parse_text_sitemap(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && line.starts_with("http"))
        .map(str::to_string)
        .collect()
}

/// Decides whether a fetched sitemap should be read as plain text
///
/// A body starting with `<` is always XML, whatever the server labels it.
pub fn is_text_sitemap(sitemap_url: &str, content_type: Option<&str>, body: &[u8]) -> bool {
    if body.iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'<') {
        return false;
    }
    sitemap_url.ends_with(".txt") || content_type.is_some_and(|ct| ct.contains("text/plain"))
}
