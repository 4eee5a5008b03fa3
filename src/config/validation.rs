use crate::config::types::{
    CacheConfig, CatalogConfig, Config, CrawlerConfig, FetchConfig, OutputConfig, OutputFormat,
    ID_PLACEHOLDER,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_catalog_config(&config.catalog)?;
    validate_cache_config(&config.cache)?;
    validate_fetch_config(&config.fetch)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_fetches < 1 || config.max_concurrent_fetches > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_fetches must be between 1 and 100, got {}",
            config.max_concurrent_fetches
        )));
    }

    if config.drain_interval < 1 {
        return Err(ConfigError::Validation(format!(
            "drain_interval must be >= 1, got {}",
            config.drain_interval
        )));
    }

    validate_url_template(&config.url_template)?;

    Ok(())
}

/// Validates that the template carries the placeholder and yields an HTTP(S) URL
fn validate_url_template(template: &str) -> Result<(), ConfigError> {
    if !template.contains(ID_PLACEHOLDER) {
        return Err(ConfigError::Validation(format!(
            "url_template must contain the '{}' placeholder, got '{}'",
            ID_PLACEHOLDER, template
        )));
    }

    let sample = template.replace(ID_PLACEHOLDER, "tt0000001");
    let url = Url::parse(&sample)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid url_template '{}': {}", template, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "url_template '{}' must use http or https",
            template
        )));
    }

    Ok(())
}

/// Validates catalog configuration
fn validate_catalog_config(config: &CatalogConfig) -> Result<(), ConfigError> {
    if config.path.is_empty() {
        return Err(ConfigError::Validation(
            "catalog path cannot be empty".to_string(),
        ));
    }

    if config.delimiter_byte().is_none() {
        return Err(ConfigError::Validation(format!(
            "delimiter must be a single ASCII character, got '{}'",
            config.delimiter
        )));
    }

    Ok(())
}

/// Validates cache configuration
fn validate_cache_config(config: &CacheConfig) -> Result<(), ConfigError> {
    if config.prefix.is_empty() {
        return Err(ConfigError::Validation(
            "cache prefix cannot be empty".to_string(),
        ));
    }

    if config.shard_size < 1 {
        return Err(ConfigError::Validation(format!(
            "shard_size must be >= 1, got {}",
            config.shard_size
        )));
    }

    if config.member_name.is_empty() {
        return Err(ConfigError::Validation(
            "member_name cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates fetch configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if matches!(&config.proxies_path, Some(path) if path.is_empty()) {
        return Err(ConfigError::Validation(
            "proxies_path cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    match config.format {
        OutputFormat::Json => {
            if config.json_prefix.as_deref().map_or(true, str::is_empty) {
                return Err(ConfigError::Validation(
                    "json_prefix is required for json output".to_string(),
                ));
            }
        }
        OutputFormat::Csv => {
            if config.csv_path.as_deref().map_or(true, str::is_empty) {
                return Err(ConfigError::Validation(
                    "csv_path is required for csv output".to_string(),
                ));
            }
        }
    }

    if matches!(&config.process_log, Some(path) if path.is_empty()) {
        return Err(ConfigError::Validation(
            "process_log cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}
