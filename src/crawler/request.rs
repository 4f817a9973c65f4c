//! Crawl requests and their fingerprints
//!
//! A `CrawlRequest` names what to fetch and which extraction path handles the
//! response. Context needed by that path (the referring page of an
//! experience fragment) travels inside the `Callback` variant itself.

use crate::extract::PageMetadata;
use crate::url::canonicalize;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use url::Url;

/// HTTP method of a crawl request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The page that referenced an experience fragment
///
/// Records extracted from the fragment are attributed to this page.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentOrigin {
    /// URL of the referring page
    pub referer: Url,

    /// HTTP status the referring page was served with
    pub status: u16,

    /// Metadata extracted from the referring page
    pub metadata: PageMetadata,
}

/// Which extraction path handles the response
#[derive(Debug, Clone, PartialEq)]
pub enum Callback {
    /// Ordinary page: classify, extract forms, discover links and fragments
    Page,
    /// Sitemap or sitemap index
    Sitemap,
    /// Events search API, page size 1, to learn the total result count
    EventsProbe,
    /// Events search API, one page covering every result
    EventsListing {
        /// Result count the probe reported
        expected: u64,
    },
    /// Experience fragment referenced by another page
    Fragment(FragmentOrigin),
}

impl Callback {
    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Sitemap => "sitemap",
            Self::EventsProbe => "events-probe",
            Self::EventsListing { .. } => "events-listing",
            Self::Fragment(_) => "fragment",
        }
    }
}

/// A pending fetch
///
/// Immutable once built; the frontier owns it from enqueue to dequeue.
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlRequest {
    url: Url,
    method: Method,
    body: Option<Vec<u8>>,
    callback: Callback,
    redirects: u8,
}

impl CrawlRequest {
    /// A GET request handled as an ordinary page
    pub fn page(url: Url) -> Self {
        Self::get(url, Callback::Page)
    }

    /// A GET request handled as a sitemap
    pub fn sitemap(url: Url) -> Self {
        Self::get(url, Callback::Sitemap)
    }

    /// A GET request for an experience fragment referenced by `origin`
    pub fn fragment(url: Url, origin: FragmentOrigin) -> Self {
        Self::get(url, Callback::Fragment(origin))
    }

    /// A GET request with an arbitrary callback
    pub fn get(url: Url, callback: Callback) -> Self {
        Self {
            url,
            method: Method::Get,
            body: None,
            callback,
            redirects: 0,
        }
    }

    /// A POST request with a JSON body
    pub fn post_json<T: Serialize>(
        url: Url,
        payload: &T,
        callback: Callback,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            url,
            method: Method::Post,
            body: Some(serde_json::to_vec(payload)?),
            callback,
            redirects: 0,
        })
    }

    /// The request to issue after a 3xx answer pointing at `target`
    ///
    /// The callback is kept. 307 and 308 keep the method and body; any other
    /// redirect turns a POST into a plain GET, as browsers do.
    pub fn redirected(&self, target: Url, status: u16) -> Self {
        let keep_method = matches!(status, 307 | 308);
        let (method, body) = if keep_method {
            (self.method, self.body.clone())
        } else {
            (Method::Get, None)
        };

        Self {
            url: target,
            method,
            body,
            callback: self.callback.clone(),
            redirects: self.redirects.saturating_add(1),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn callback(&self) -> &Callback {
        &self.callback
    }

    /// Number of redirects followed to reach this request
    pub fn redirects(&self) -> u8 {
        self.redirects
    }

    /// Canonical identity of the request: SHA-256 over method, canonical URL,
    /// and body
    ///
    /// Headers, the callback, and the redirect count do not participate, so equivalent requests
    /// built in different places share a fingerprint.
    pub fn fingerprint(&self) -> String {
        let url = canonicalize(self.url.clone()).unwrap_or_else(|_| self.url.clone());

        let mut hasher = Sha256::new();
        hasher.update(self.method.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(url.as_str().as_bytes());
        hasher.update([0u8]);
        if let Some(body) = &self.body {
            hasher.update(body);
        }
        hex::encode(hasher.finalize())
    }

    /// Key the frontier deduplicates on
    ///
    /// Equal to the fingerprint, except that fragment requests are scoped to
    /// their referring page: the same fragment embedded on two pages must be
    /// resolved once for each of them.
    pub fn dedup_key(&self) -> String {
        match &self.callback {
            Callback::Fragment(origin) => {
                let referer = canonicalize(origin.referer.clone())
                    .unwrap_or_else(|_| origin.referer.clone());
                format!("{}@{}", self.fingerprint(), referer)
            }
            _ => self.fingerprint(),
        }
    }
}
