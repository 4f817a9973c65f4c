//! URL handling module
//!
//! This module provides URL canonicalization (the input to request
//! fingerprints), host matching, and the allow-list applied to discovered
//! links.

mod matcher;
mod normalize;

pub use matcher::{has_ignored_extension, host_matches, LinkFilter};
pub use normalize::{canonicalize, canonicalize_url};

use url::Url;

/// Returns the `scheme://host[:port]` origin of a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use mkto_crawl::url::origin_of;
///
/// let url = Url::parse("https://example.com:8443/a/b?c=d").unwrap();
/// assert_eq!(origin_of(&url).as_deref(), Some("https://example.com:8443"));
/// ```
pub fn origin_of(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}

/// Key under which per-domain throttle state is tracked (`host[:port]`)
pub fn domain_key(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_lowercase();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    }
}
