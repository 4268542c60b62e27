use crate::config::types::{CollectConfig, Config, DownloadConfig, HttpConfig, PortalConfig};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_portal_config(&config.portal)?;
    validate_http_config(&config.http)?;
    validate_collect_config(&config.collect)?;
    validate_download_config(&config.download)?;
    Ok(())
}

/// Validates portal configuration
fn validate_portal_config(config: &PortalConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use HTTP or HTTPS",
            config.base_url
        )));
    }

    if config.detail_marker.is_empty() {
        return Err(ConfigError::Validation(
            "detail_marker cannot be empty".to_string(),
        ));
    }

    Selector::parse(&config.list_item_selector).map_err(|e| {
        ConfigError::Validation(format!(
            "list_item_selector '{}' is not a valid CSS selector: {:?}",
            config.list_item_selector, e
        ))
    })?;

    Ok(())
}

/// Validates HTTP session configuration
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Proxy schemes the HTTP client can route through
const PROXY_SCHEMES: [&str; 4] = ["http", "https", "socks5", "socks5h"];

/// Validates listing collection configuration
fn validate_collect_config(config: &CollectConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.no_growth_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "no_growth_limit must be >= 1, got {}",
            config.no_growth_limit
        )));
    }

    if let Some(proxy) = config.proxy.as_deref().filter(|p| !p.is_empty()) {
        let url = Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))?;
        if !PROXY_SCHEMES.contains(&url.scheme()) {
            return Err(ConfigError::InvalidUrl(format!(
                "Unsupported proxy scheme '{}' in '{}'",
                url.scheme(),
                proxy
            )));
        }
    }

    Ok(())
}

/// Validates download configuration
fn validate_download_config(config: &DownloadConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 100 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 100, got {}",
            config.workers
        )));
    }

    if config.types.is_empty() {
        return Err(ConfigError::Validation(
            "types must name at least one file type".to_string(),
        ));
    }

    if config.out_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation("out_dir cannot be empty".to_string()));
    }

    Ok(())
}
