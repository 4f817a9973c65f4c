use crate::config::types::{
    Config, CrawlerConfig, EventsConfig, ThrottleConfig, UserAgentConfig, MAX_DELAY_SECS,
    MIN_TARGET_CONCURRENCY,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_throttle_config(&config.throttle)?;
    validate_user_agent_config(&config.user_agent)?;
    if let Some(events) = &config.events {
        validate_events_config(events)?;
    }
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    for status in &config.allowed_statuses {
        if !(300..600).contains(status) {
            return Err(ConfigError::Validation(format!(
                "allowed_statuses must only contain non-2xx HTTP statuses, got {}",
                status
            )));
        }
    }

    if config.request_timeout == 0 {
        return Err(ConfigError::Validation(
            "request_timeout must be >= 1 second".to_string(),
        ));
    }

    if config.connect_timeout == 0 {
        return Err(ConfigError::Validation(
            "connect_timeout must be >= 1 second".to_string(),
        ));
    }

    if config.progress_interval == 0 {
        return Err(ConfigError::Validation(
            "progress_interval must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates throttle configuration
fn validate_throttle_config(config: &ThrottleConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("start_delay", config.start_delay),
        ("min_delay", config.min_delay),
        ("max_delay", config.max_delay),
    ] {
        if !value.is_finite() || !(0.0..=MAX_DELAY_SECS).contains(&value) {
            return Err(ConfigError::Validation(format!(
                "{} must be between 0 and {} seconds, got {}",
                name, MAX_DELAY_SECS, value
            )));
        }
    }

    if config.min_delay > config.max_delay {
        return Err(ConfigError::Validation(format!(
            "min_delay ({}s) cannot exceed max_delay ({}s)",
            config.min_delay, config.max_delay
        )));
    }

    if !config.target_concurrency.is_finite()
        || config.target_concurrency < MIN_TARGET_CONCURRENCY
    {
        return Err(ConfigError::Validation(format!(
            "target_concurrency must be at least {}, got {}",
            MIN_TARGET_CONCURRENCY, config.target_concurrency
        )));
    }

    for (name, value) in [
        ("concurrency", config.concurrency),
        ("unthrottled_concurrency", config.unthrottled_concurrency),
    ] {
        if !(1..=100).contains(&value) {
            return Err(ConfigError::Validation(format!(
                "{} must be between 1 and 100, got {}",
                name, value
            )));
        }
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if let Some(contact) = &config.contact_url {
        Url::parse(contact)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;
    }

    Ok(())
}

/// Validates the events API section
fn validate_events_config(config: &EventsConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("listing_url", &config.listing_url),
        ("search_url", &config.search_url),
    ] {
        let url = Url::parse(value)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "{} '{}' must use HTTP or HTTPS",
                name, value
            )));
        }
    }

    if config.document_type.is_empty() || config.language.is_empty() {
        return Err(ConfigError::Validation(
            "events document_type and language cannot be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_rejects_success_status_in_allow_list() {
        let mut config = Config::default();
        config.crawler.allowed_statuses = vec![404, 200];
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_rejects_inverted_delays() {
        let mut config = Config::default();
        config.throttle.min_delay = 10.0;
        config.throttle.max_delay = 1.0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_negative_delay() {
        let mut config = Config::default();
        config.throttle.start_delay = -1.0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_delay_above_one_day() {
        let mut config = Config::default();
        config.throttle.max_delay = 1e20;
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(_))
        ));

        config.throttle.max_delay = MAX_DELAY_SECS;
        assert!(validate(&config).is_ok());

        config.throttle.start_delay = MAX_DELAY_SECS + 1.0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_tiny_target_concurrency() {
        let mut config = Config::default();
        config.throttle.target_concurrency = 1e-20;
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(_))
        ));

        config.throttle.target_concurrency = MIN_TARGET_CONCURRENCY;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.throttle.concurrency = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_crawler_name() {
        let mut config = Config::default();
        config.user_agent.crawler_name = "bad name!".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_events_urls() {
        let mut config = Config::default();
        config.events = Some(EventsConfig::new(
            "https://example.com/us/en/events",
            "not a url",
        ));
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));

        config.events = Some(EventsConfig::new(
            "https://example.com/us/en/events",
            "https://example.com/api/search",
        ));
        assert!(validate(&config).is_ok());
    }
}
