use crate::config::types::{
    CatalogConfig, Config, IndexerConfig, SearchConfig, TrackingConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_indexer_config(&config.indexer)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_catalog_config(&config.catalog)?;
    validate_search_config(&config.search)?;
    validate_tracking_config(&config.tracking)?;
    Ok(())
}

fn validate_indexer_config(config: &IndexerConfig) -> Result<(), ConfigError> {
    if config.max_pages_per_site < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages_per_site must be >= 1, got {}",
            config.max_pages_per_site
        )));
    }

    if config.max_content_length < 1 {
        return Err(ConfigError::Validation(format!(
            "max_content_length must be >= 1, got {}",
            config.max_content_length
        )));
    }

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    if config.request_timeout_secs < 1
        || config.sitemap_head_timeout_secs < 1
        || config.robots_txt_timeout_secs < 1
    {
        return Err(ConfigError::Validation(
            "request, sitemap and robots.txt timeouts must be >= 1s".to_string(),
        ));
    }

    Ok(())
}

fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Robots.txt groups are matched on the bare product token
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_ascii_alphabetic() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only letters, '-' and '_', got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    Ok(())
}

fn validate_catalog_config(config: &CatalogConfig) -> Result<(), ConfigError> {
    validate_http_url("catalog base_url", &config.base_url)?;

    if config.page_size < 1 {
        return Err(ConfigError::Validation(format!(
            "catalog page_size must be >= 1, got {}",
            config.page_size
        )));
    }

    if config.resource_id_offset < 0 {
        return Err(ConfigError::Validation(format!(
            "resource_id_offset cannot be negative, got {}",
            config.resource_id_offset
        )));
    }

    Ok(())
}

fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    validate_http_url("search url", &config.url)?;

    // OpenSearch index names must be lowercase and cannot contain these
    if config.namespace.is_empty()
        || config.namespace.chars().any(|c| {
            c.is_ascii_uppercase() || matches!(c, ' ' | '/' | '\\' | '*' | '?' | '"' | ',' | '#')
        })
    {
        return Err(ConfigError::Validation(format!(
            "namespace '{}' is not a valid index name prefix",
            config.namespace
        )));
    }

    Ok(())
}

fn validate_tracking_config(config: &TrackingConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    Ok(())
}
