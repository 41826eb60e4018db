//! URL helpers shared by discovery, scraping and indexing
//!
//! Robots rules and sitemap probes are keyed by a site's origin
//! (`scheme://host[:port]`); documents record the page host as their domain.

mod domain;

pub use domain::extract_domain;

use crate::{UrlError, UrlResult};
use url::Url;

/// Parses an absolute HTTP(S) URL
pub fn parse_http_url(raw: &str) -> UrlResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(UrlError::InvalidScheme(other.to_string())),
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    Ok(url)
}

/// Returns the origin of a URL as `scheme://host[:port]`
///
/// Default ports are omitted, so `https://example.com:443/a` and
/// `https://example.com/b` share the origin `https://example.com`.
///
/// # Examples
///
/// ```
/// use resource_indexer::url::site_origin;
///
/// assert_eq!(site_origin("https://example.com/about?x=1").unwrap(), "https://example.com");
/// assert_eq!(site_origin("http://localhost:8080/").unwrap(), "http://localhost:8080");
/// ```
pub fn site_origin(raw: &str) -> UrlResult<String> {
    let url = parse_http_url(raw)?;
    Ok(url.origin().ascii_serialization())
}

/// Resolves a possibly relative reference against a site origin
///
/// Returns None when the result is not an HTTP(S) URL.
pub fn resolve_against(origin: &str, reference: &str) -> Option<String> {
    let base = Url::parse(origin).ok()?;
    let joined = base.join(reference.trim()).ok()?;

    match joined.scheme() {
        "http" | "https" => Some(joined.to_string()),
        _ => None,
    }
}

/// Returns true if two URLs name the same page
///
/// Both sides are compared in their parsed form, so `https://example.com`
/// matches the `https://example.com/` a sitemap reader produces. Unparseable
/// input falls back to exact comparison.
pub fn same_page(a: &str, b: &str) -> bool {
    match (Url::parse(a.trim()), Url::parse(b.trim())) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_origin_strips_path_query_fragment() {
        assert_eq!(
            site_origin("https://example.com/a/b?c=d#e").unwrap(),
            "https://example.com"
        );
    }

    #[test]
    fn test_site_origin_keeps_non_default_port() {
        assert_eq!(
            site_origin("http://127.0.0.1:4321/page").unwrap(),
            "http://127.0.0.1:4321"
        );
    }

    #[test]
    fn test_site_origin_drops_default_port() {
        assert_eq!(
            site_origin("https://example.com:443/").unwrap(),
            "https://example.com"
        );
    }

    #[test]
    fn test_site_origin_rejects_other_schemes() {
        assert!(matches!(
            site_origin("ftp://example.com/file"),
            Err(UrlError::InvalidScheme(_))
        ));
        assert!(matches!(site_origin("not a url"), Err(UrlError::Parse(_))));
    }

    #[test]
    fn test_resolve_relative_reference() {
        assert_eq!(
            resolve_against("https://example.com", "/sitemap-pages.xml"),
            Some("https://example.com/sitemap-pages.xml".to_string())
        );
    }

    #[test]
    fn test_resolve_absolute_reference() {
        assert_eq!(
            resolve_against("https://example.com", "https://cdn.example.net/sitemap.xml"),
            Some("https://cdn.example.net/sitemap.xml".to_string())
        );
    }

    #[test]
    fn test_resolve_rejects_non_http() {
        assert_eq!(resolve_against("https://example.com", "mailto:a@b.c"), None);
    }

    #[test]
    fn test_same_page_ignores_root_slash() {
        assert!(same_page("https://example.com", "https://example.com/"));
        assert!(same_page("https://Example.com:443/a b", "https://example.com/a%20b"));
        assert!(!same_page("https://example.com", "https://example.com/about"));
        assert!(!same_page("", "https://example.com/"));
    }
}
