use crate::UrlError;
use url::Url;

/// Canonicalizes a URL for request fingerprinting
///
/// Two URLs that name the same resource canonicalize to the same string, so
/// the dedup store treats them as one request.
///
/// # Canonicalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Accept only HTTP and HTTPS
/// 3. Require a host (lowercased by the parser, default port dropped)
/// 4. Remove fragment (everything after #)
/// 5. Sort query parameters by key, then value
/// 6. Remove empty query string (trailing ?)
///
/// Path case, trailing slashes and every query parameter are preserved: they
/// can select different pages on the server.
///
/// # Examples
///
/// ```
/// use mkto_crawl::url::canonicalize_url;
///
/// let url = canonicalize_url("HTTPS://Example.COM:443/Page?b=2&a=1#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/Page?a=1&b=2");
/// ```
pub fn canonicalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    canonicalize(url)
}

/// Canonicalizes an already parsed URL
pub fn canonicalize(mut url: Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);

    if url.query().is_some() {
        let params = sorted_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut()
                .clear()
                .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
    }

    Ok(url)
}

/// Returns the query parameters sorted by key, then by value
fn sorted_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    params.sort();

    params
}
