//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the configured user agent and timeouts
//! - GET requests for pages, sitemaps, and fragments
//! - JSON POST requests for the events search API
//! - Status classification (allowed vs. unexpected non-2xx)
//!
//! Redirects are not followed by the client. A 3xx response with a usable
//! `Location` is handed back with its target so the crawler can re-enqueue
//! it through the frontier. Retries are not attempted here.

use crate::config::Config;
use crate::crawler::request::{CrawlRequest, Method};
use crate::state::{PageState, ResponseHealth};
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE, LOCATION};
use reqwest::{redirect::Policy, Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// A response the page classifier may look at
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// URL the response was served for
    pub url: Url,

    /// HTTP status code
    pub status: u16,

    /// Content-Type header value (empty if absent)
    pub content_type: String,

    /// Response body decoded as text
    pub body: String,

    /// Resolved `Location` of a 3xx response
    pub location: Option<Url>,
}

impl FetchResult {
    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the body is something the extractors can read
    ///
    /// A missing Content-Type is given the benefit of the doubt.
    pub fn is_textual(&self) -> bool {
        let content_type = self.content_type.to_ascii_lowercase();
        content_type.is_empty()
            || content_type.starts_with("text/")
            || content_type.contains("html")
            || content_type.contains("xml")
            || content_type.contains("json")
    }

    /// Whether this is a redirect the crawler should follow
    pub fn is_redirect(&self) -> bool {
        self.location.is_some()
    }

    /// How this response should feed back into the rate governor
    pub fn health(&self) -> ResponseHealth {
        if self.is_success() || self.is_redirect() {
            ResponseHealth::Healthy
        } else {
            ResponseHealth::Degraded
        }
    }
}

/// Why a request produced no usable response
#[derive(Debug, Error)]
pub enum FetchError {
    /// DNS, connection, TLS, timeout, or body read failure
    #[error("{kind} fetching {url}: {source}")]
    Transport {
        url: Url,
        kind: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// A non-2xx status that is not in the allowed list
    #[error("Unexpected status {status} for {url}")]
    UnexpectedStatus { url: Url, status: u16 },
}

impl FetchError {
    /// The page state this failure maps to
    pub fn page_state(&self) -> PageState {
        match self {
            Self::Transport { .. } => PageState::Unreachable,
            Self::UnexpectedStatus { .. } => PageState::Skipped,
        }
    }

    /// How this failure should feed back into the rate governor
    ///
    /// Rate limiting, server errors, and transport failures back off;
    /// other client errors only keep the delay from shrinking.
    pub fn health(&self) -> ResponseHealth {
        match self {
            Self::Transport { .. } => ResponseHealth::Failed,
            Self::UnexpectedStatus { status, .. } => {
                if *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500 {
                    ResponseHealth::Failed
                } else {
                    ResponseHealth::Degraded
                }
            }
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The crawl configuration (user agent and timeouts)
///
/// # Example
///
/// ```no_run
/// use mkto_crawl::config::Config;
/// use mkto_crawl::crawler::build_http_client;
///
/// let client = build_http_client(&Config::default()).unwrap();
/// ```
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.header_value())
        .timeout(Duration::from_secs(config.crawler.request_timeout))
        .connect_timeout(Duration::from_secs(config.crawler.connect_timeout))
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches one crawl request
///
/// # Status handling
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx | `Ok(FetchResult)` |
/// | 3xx with a resolvable `Location` | `Ok(FetchResult)` with `location` set |
/// | Status in `allowed_statuses` (404 by default) | `Ok(FetchResult)` |
/// | Any other status | `Err(UnexpectedStatus)` |
/// | Timeout, refused connection, DNS, TLS | `Err(Transport)` |
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `request` - What to fetch
/// * `allowed_statuses` - Non-2xx statuses handed on to the classifier
pub async fn fetch(
    client: &Client,
    request: &CrawlRequest,
    allowed_statuses: &[u16],
) -> Result<FetchResult, FetchError> {
    let url = request.url().clone();

    let builder = match request.method() {
        Method::Get => client.get(url.clone()),
        Method::Post => client
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(request.body().unwrap_or_default().to_vec()),
    };

    let response = builder.send().await.map_err(|source| FetchError::Transport {
        url: url.clone(),
        kind: classify_transport_error(&source),
        source,
    })?;

    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if status.is_redirection() {
        if let Some(location) = redirect_target(&url, response.headers().get(LOCATION)) {
            return Ok(FetchResult {
                url,
                status: status.as_u16(),
                content_type,
                body: String::new(),
                location: Some(location),
            });
        }
    }

    if !status.is_success() && !allowed_statuses.contains(&status.as_u16()) {
        return Err(FetchError::UnexpectedStatus {
            url,
            status: status.as_u16(),
        });
    }

    let body = response.text().await.map_err(|source| FetchError::Transport {
        url: url.clone(),
        kind: "Body read failure",
        source,
    })?;

    Ok(FetchResult {
        url,
        status: status.as_u16(),
        content_type,
        body,
        location: None,
    })
}

/// Resolves a `Location` header against the URL that returned it
///
/// Only http(s) targets are followed; the fragment is dropped.
fn redirect_target(base: &Url, header: Option<&HeaderValue>) -> Option<Url> {
    let raw = header?.to_str().ok()?.trim();
    if raw.is_empty() {
        return None;
    }

    let mut target = base.join(raw).ok()?;
    if target.scheme() != "http" && target.scheme() != "https" {
        return None;
    }
    target.set_fragment(None);
    Some(target)
}

fn classify_transport_error(error: &reqwest::Error) -> &'static str {
    if error.is_timeout() {
        "Request timeout"
    } else if error.is_connect() {
        "Connection failure"
    } else if error.is_redirect() {
        "Redirect failure"
    } else {
        "Transport failure"
    }
}
