use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure
///
/// Every section is optional in the TOML file; missing sections fall back to
/// their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub throttle: ThrottleConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub events: Option<EventsConfig>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Non-2xx statuses that are handed to the page classifier instead of dropped
    #[serde(rename = "allowed-statuses")]
    pub allowed_statuses: Vec<u16>,

    /// Whole-request timeout (seconds)
    #[serde(rename = "request-timeout")]
    pub request_timeout: u64,

    /// Connection timeout (seconds)
    #[serde(rename = "connect-timeout")]
    pub connect_timeout: u64,

    /// Log progress every N completed fetches
    #[serde(rename = "progress-interval")]
    pub progress_interval: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            allowed_statuses: vec![404],
            request_timeout: 30,
            connect_timeout: 10,
            progress_interval: 10,
        }
    }
}

/// Longest delay any throttle setting may ask for (one day)
pub const MAX_DELAY_SECS: f64 = 86_400.0;

/// Smallest accepted `target-concurrency`
pub const MIN_TARGET_CONCURRENCY: f64 = 0.01;

/// Adaptive rate control configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Whether the adaptive delay is active
    pub enabled: bool,

    /// Initial per-domain delay (seconds)
    #[serde(rename = "start-delay")]
    pub start_delay: f64,

    /// Lowest delay the governor may settle on (seconds)
    #[serde(rename = "min-delay")]
    pub min_delay: f64,

    /// Highest delay the governor may back off to (seconds)
    #[serde(rename = "max-delay")]
    pub max_delay: f64,

    /// Average number of requests to keep in flight against one domain
    #[serde(rename = "target-concurrency")]
    pub target_concurrency: f64,

    /// Worker slots while throttled
    pub concurrency: u32,

    /// Worker slots when throttling is disabled
    #[serde(rename = "unthrottled-concurrency")]
    pub unthrottled_concurrency: u32,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            start_delay: 5.0,
            min_delay: 0.0,
            max_delay: 60.0,
            target_concurrency: 1.0,
            concurrency: 8,
            unthrottled_concurrency: 16,
        }
    }
}

impl ThrottleConfig {
    /// Converts seconds to a delay bounded by `[0, MAX_DELAY_SECS]`
    ///
    /// NaN maps to zero.
    pub fn delay_from_secs(secs: f64) -> Duration {
        if secs.is_nan() {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(secs.clamp(0.0, MAX_DELAY_SECS))
    }

    /// Floor of the adaptive delay
    pub fn delay_floor(&self) -> Duration {
        Self::delay_from_secs(self.min_delay)
    }

    /// Ceiling of the adaptive delay
    pub fn delay_ceiling(&self) -> Duration {
        Self::delay_from_secs(self.max_delay)
    }

    /// Delay a domain starts with
    pub fn initial_delay(&self) -> Duration {
        Self::delay_from_secs(self.start_delay)
    }

    /// Worker slots for the current mode
    pub fn effective_concurrency(&self) -> usize {
        if self.enabled {
            self.concurrency as usize
        } else {
            self.unthrottled_concurrency as usize
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL or address with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "mkto-crawl".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (+contact)`
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(contact) => format!(
                "{}/{} (+{})",
                self.crawler_name, self.crawler_version, contact
            ),
            None => format!("{}/{}", self.crawler_name, self.crawler_version),
        }
    }
}

/// Events search API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    /// The events listing page that triggers the API paginator
    #[serde(rename = "listing-url")]
    pub listing_url: String,

    /// The JSON search endpoint queried with POST
    #[serde(rename = "search-url")]
    pub search_url: String,

    /// Value of the `document_type` filter
    #[serde(rename = "document-type", default = "default_document_type")]
    pub document_type: String,

    /// Value of the `language` filter
    #[serde(default = "default_language")]
    pub language: String,

    /// Size requested for each facet
    #[serde(rename = "facet-size", default = "default_facet_size")]
    pub facet_size: u32,
}

impl EventsConfig {
    /// Builds an events configuration with the default filters
    pub fn new(listing_url: impl Into<String>, search_url: impl Into<String>) -> Self {
        Self {
            listing_url: listing_url.into(),
            search_url: search_url.into(),
            document_type: default_document_type(),
            language: default_language(),
            facet_size: default_facet_size(),
        }
    }
}

fn default_document_type() -> String {
    "events".to_string()
}

fn default_language() -> String {
    "en_us".to_string()
}

fn default_facet_size() -> u32 {
    250
}
