use crate::config::types::{Config, CrawlerConfig, IndexConfig, OutputConfig, SelectorEntry};
use crate::url::PseudoUrl;
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_name(&config.crawler_name)?;
    validate_seeds(config.seed_urls())?;
    validate_selectors(&config.selectors)?;
    validate_link_options(config)?;
    validate_pseudo_urls(&config.effective_pseudo_urls())?;
    validate_crawler_config(&config.crawler)?;
    validate_index_config(&config.index)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the crawler identity
///
/// The name ends up inside a `crawledBy:<name>` filter expression, so it is
/// restricted to characters that need no quoting there.
fn validate_crawler_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters, '-', '_' or '.', got '{}'",
            name
        )));
    }

    Ok(())
}

/// Validates seed URLs
fn validate_seeds(seeds: &[String]) -> Result<(), ConfigError> {
    if seeds.is_empty() {
        return Err(ConfigError::Validation(
            "at least one seed URL is required in start_urls or list_of_urls".to_string(),
        ));
    }

    for seed in seeds {
        let url = Url::parse(seed)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' must use HTTP or HTTPS",
                seed
            )));
        }
    }

    Ok(())
}

/// Validates selector entries
fn validate_selectors(selectors: &[SelectorEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for entry in selectors {
        if entry.key.is_empty() {
            return Err(ConfigError::Validation(
                "selector key cannot be empty".to_string(),
            ));
        }

        if entry.value.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "selector '{}' has an empty value",
                entry.key
            )));
        }

        if scraper::Selector::parse(&entry.value).is_err() {
            return Err(ConfigError::Validation(format!(
                "selector '{}' is not a valid CSS selector: '{}'",
                entry.key, entry.value
            )));
        }

        if !seen.insert(entry.key.as_str()) {
            return Err(ConfigError::Validation(format!(
                "selector key '{}' is defined more than once",
                entry.key
            )));
        }
    }

    Ok(())
}

/// Validates the link and readiness selectors
fn validate_link_options(config: &Config) -> Result<(), ConfigError> {
    let options = [
        ("clickable_elements", config.clickable_elements.as_deref()),
        ("wait_for_element", config.wait_for_element.as_deref()),
    ];

    for (name, value) in options {
        let Some(value) = value else { continue };
        if value.trim().is_empty() || scraper::Selector::parse(value).is_err() {
            return Err(ConfigError::Validation(format!(
                "{} is not a valid CSS selector: '{}'",
                name, value
            )));
        }
    }

    Ok(())
}

/// Validates pseudo-URL patterns by compiling them
fn validate_pseudo_urls(patterns: &[String]) -> Result<(), ConfigError> {
    for pattern in patterns {
        PseudoUrl::new(pattern)?;
    }
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrency < 1 || config.max_concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrency must be between 1 and 100, got {}",
            config.max_concurrency
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates index configuration
fn validate_index_config(config: &IndexConfig) -> Result<(), ConfigError> {
    Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid index base_url: {}", e)))?;

    if config.index_name.is_empty() {
        return Err(ConfigError::Validation(
            "index_name cannot be empty".to_string(),
        ));
    }

    if config.browse_batch_size < 1 || config.browse_batch_size > 1000 {
        return Err(ConfigError::Validation(format!(
            "browse_batch_size must be between 1 and 1000, got {}",
            config.browse_batch_size
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if matches!(config.summary_path.as_deref(), Some("")) {
        return Err(ConfigError::Validation(
            "summary_path cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}
