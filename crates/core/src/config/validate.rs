use reqwest::Url;

use super::{types::Config, ConfigError};

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::ValidationError(format!("{field} is not a valid URL: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::ValidationError(format!(
            "{field} must use http or https, got {other}"
        ))),
    }
}

/// Validate configuration
/// Currently validates:
/// - At least one seed source is configured
/// - Static seeds have a base URL to resolve against
/// - Worker count and intervals are non-zero
/// - URLs are absolute http(s) URLs
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let scraper = &config.scraper;

    if scraper.concurrency == 0 {
        return Err(ConfigError::ValidationError(
            "scraper.concurrency cannot be 0".to_string(),
        ));
    }

    if scraper.output_location.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "scraper.output_location cannot be empty".to_string(),
        ));
    }

    if scraper.static_list_path.is_none() && scraper.dynamic_list_url.is_none() {
        return Err(ConfigError::ValidationError(
            "at least one of scraper.static_list_path or scraper.dynamic_list_url is required"
                .to_string(),
        ));
    }

    if scraper.static_list_path.is_some() && scraper.site_base_url.is_none() {
        return Err(ConfigError::ValidationError(
            "scraper.static_list_path requires scraper.site_base_url".to_string(),
        ));
    }

    if let Some(url) = &scraper.dynamic_list_url {
        validate_http_url("scraper.dynamic_list_url", url)?;
    }

    if let Some(url) = &scraper.site_base_url {
        validate_http_url("scraper.site_base_url", url)?;
    }

    if scraper.follow_updates {
        if scraper.dynamic_list_url.is_none() {
            return Err(ConfigError::ValidationError(
                "scraper.follow_updates requires scraper.dynamic_list_url".to_string(),
            ));
        }
        if scraper.follow_poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "scraper.follow_poll_interval_ms cannot be 0".to_string(),
            ));
        }
    }

    if config.http.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "http.timeout_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScraperConfig;
    use std::path::PathBuf;

    fn config_with(scraper: ScraperConfig) -> Config {
        Config {
            scraper,
            ..Default::default()
        }
    }

    fn page_list_only() -> ScraperConfig {
        ScraperConfig {
            dynamic_list_url: Some("https://example.org/pages".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_default_config_has_no_seed_source() {
        let err = validate_config(&Config::default()).unwrap_err();
        assert!(err.to_string().contains("at least one"));
    }

    #[test]
    fn test_validate_page_list_only() {
        assert!(validate_config(&config_with(page_list_only())).is_ok());
    }

    #[test]
    fn test_validate_static_list_needs_base_url() {
        let config = config_with(ScraperConfig {
            static_list_path: Some(PathBuf::from("staticfiles.csv")),
            ..Default::default()
        });
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("site_base_url"));

        let config = config_with(ScraperConfig {
            static_list_path: Some(PathBuf::from("staticfiles.csv")),
            site_base_url: Some("https://example.org".to_string()),
            ..Default::default()
        });
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_zero_concurrency_fails() {
        let config = config_with(ScraperConfig {
            concurrency: 0,
            ..page_list_only()
        });
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_requires_a_seed_source() {
        let config = config_with(ScraperConfig {
            static_list_path: None,
            dynamic_list_url: None,
            ..Default::default()
        });
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_rejects_non_http_url() {
        let config = config_with(ScraperConfig {
            dynamic_list_url: Some("ftp://example.org/pages".to_string()),
            ..Default::default()
        });
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("http or https"));

        let config = config_with(ScraperConfig {
            site_base_url: Some("not a url".to_string()),
            ..page_list_only()
        });
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_follow_updates_needs_dynamic_list() {
        let config = config_with(ScraperConfig {
            follow_updates: true,
            ..Default::default()
        });
        assert!(validate_config(&config).is_err());

        let config = config_with(ScraperConfig {
            follow_updates: true,
            dynamic_list_url: Some("https://example.org/pages".to_string()),
            ..Default::default()
        });
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_empty_output_location_fails() {
        let config = config_with(ScraperConfig {
            output_location: PathBuf::new(),
            ..page_list_only()
        });
        assert!(validate_config(&config).is_err());
    }
}
