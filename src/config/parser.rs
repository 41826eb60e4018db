use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Each batch run records this hash so that runs made with different
/// settings can be told apart in the job store.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_minimal_config_uses_defaults() {
        let config_content = r#"
[catalog]
base-url = "http://backend:5000"

[search]
url = "http://opensearch:9200"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.indexer.max_pages_per_site, 50);
        assert_eq!(config.indexer.max_content_length, 5000);
        assert_eq!(config.indexer.max_retries, 3);
        assert_eq!(config.indexer.max_job_retries, 3);
        assert_eq!(config.indexer.delay_between_pages_ms, 500);
        assert_eq!(config.indexer.delay_between_sites_ms, 1000);
        assert_eq!(config.catalog.page_size, 100);
        assert_eq!(config.catalog.resource_id_offset, 10_000);
        assert_eq!(config.catalog.category, "Business Directory");
        assert_eq!(config.search.index_name(), "default-resources");
        assert_eq!(config.user_agent.crawler_name, "ResourceIndexer");
    }

    #[test]
    fn test_load_full_config() {
        let config_content = r#"
[indexer]
max-pages-per-site = 10
delay-between-pages-ms = 0
stale-job-timeout-minutes = 90
prune-stale-documents = false

[user-agent]
crawler-name = "CityBot"
crawler-version = "2.1"
contact-url = "https://city.example/bot"

[catalog]
base-url = "http://backend:5000"
page-size = 25
resource-id-offset = 0

[search]
url = "http://opensearch:9200"
namespace = "staging"

[tracking]
database-path = "/var/lib/indexer/jobs.db"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.indexer.max_pages_per_site, 10);
        assert_eq!(config.indexer.delay_between_pages_ms, 0);
        assert!(!config.indexer.prune_stale_documents);
        assert_eq!(
            config.indexer.stale_job_timeout(),
            Some(chrono::Duration::minutes(90))
        );
        assert_eq!(config.catalog.page_size, 25);
        assert_eq!(config.search.index_name(), "staging-resources");
        assert_eq!(config.tracking.database_path, "/var/lib/indexer/jobs.db");
        assert_eq!(
            config.user_agent.header_value(),
            "Mozilla/5.0 (compatible; CityBot/2.1; +https://city.example/bot)"
        );
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/indexer.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_missing_search_section() {
        let file = create_temp_config("[catalog]\nbase-url = \"http://backend:5000\"\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let config_content = r#"
[indexer]
max-pages-per-site = 0

[catalog]
base-url = "http://backend:5000"

[search]
url = "http://opensearch:9200"
"#;

        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
