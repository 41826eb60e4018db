use url::Url;

/// Extracts the lowercase host from a URL string
///
/// This is the `domain` field of a search document. Ports are not part of
/// the domain.
///
/// # Examples
///
/// ```
/// use resource_indexer::url::extract_domain;
///
/// assert_eq!(extract_domain("https://Example.COM/path"), Some("example.com".to_string()));
/// assert_eq!(extract_domain("https://blog.example.com:8443/"), Some("blog.example.com".to_string()));
/// assert_eq!(extract_domain("/relative/only"), None);
/// ```
pub fn extract_domain(raw: &str) -> Option<String> {
    Url::parse(raw)
        .ok()?
        .host_str()
        .map(|h| h.to_lowercase())
}
