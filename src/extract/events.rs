//! Events search API paginator
//!
//! The events listing page renders its entries client-side from a JSON
//! search endpoint, so its links cannot be scraped. Instead the endpoint is
//! queried twice:
//!
//! 1. **Probe**: page size 1, to read `meta.page.total_results`
//! 2. **Listing**: page size = total, one page covering every result
//!
//! Each `results[].url.raw` of the listing becomes an ordinary page request.

use crate::config::EventsConfig;
use crate::crawler::{Callback, CrawlRequest, FetchResult};
use crate::ConfigError;
use serde::{Deserialize, Serialize};
use url::Url;

/// Request body of the search endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchQuery {
    pub query: String,
    pub filters: Filters,
    pub facets: Facets,
    pub sort: Vec<SortField>,
    pub page: PageSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Filters {
    pub all: Vec<Filter>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Filter {
    DocumentType { document_type: Vec<String> },
    Language { language: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Facets {
    pub article_tags: Facet,
    pub location: Facet,
    pub tags: Facet,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Facet {
    #[serde(rename = "type")]
    pub kind: String,
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SortField {
    pub start_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSpec {
    pub current: u32,
    pub size: u64,
}

/// The parts of a search response the paginator reads
///
/// Every level may be absent or `null`; a missing total counts as zero.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchResponse {
    meta: Option<ResponseMeta>,
    results: Option<Vec<SearchResult>>,
}

impl SearchResponse {
    fn total_results(&self) -> u64 {
        self.meta
            .as_ref()
            .and_then(|meta| meta.page.as_ref())
            .and_then(|page| page.total_results)
            .unwrap_or(0)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResponseMeta {
    page: Option<ResponsePage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResponsePage {
    total_results: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchResult {
    url: Option<RawField>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawField {
    raw: Option<String>,
}

/// Drives the two-phase events query
#[derive(Debug, Clone)]
pub struct EventsPaginator {
    config: EventsConfig,
    search_url: Url,
}

impl EventsPaginator {
    /// Builds a paginator from the events configuration
    pub fn new(config: EventsConfig) -> Result<Self, ConfigError> {
        let search_url = Url::parse(&config.search_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", config.search_url, e)))?;
        Ok(Self { config, search_url })
    }

    /// Whether `url` is the events listing page
    ///
    /// Trailing slashes on either side are ignored.
    pub fn is_listing(&self, url: &Url) -> bool {
        let listing = self.config.listing_url.trim_end_matches('/');
        !listing.is_empty() && url.as_str().trim_end_matches('/').ends_with(listing)
    }

    /// The query body for a page of the given size
    pub fn query(&self, size: u64) -> SearchQuery {
        let facet = || Facet {
            kind: "value".to_string(),
            size: self.config.facet_size,
        };

        SearchQuery {
            query: String::new(),
            filters: Filters {
                all: vec![
                    Filter::DocumentType {
                        document_type: vec![self.config.document_type.clone()],
                    },
                    Filter::Language {
                        language: self.config.language.clone(),
                    },
                ],
            },
            facets: Facets {
                article_tags: facet(),
                location: facet(),
                tags: facet(),
            },
            sort: vec![SortField {
                start_date: "desc".to_string(),
            }],
            page: PageSpec {
                current: 1,
                size,
            },
        }
    }

    /// The probe request issued when the listing page is reached
    pub fn probe_request(&self) -> Result<CrawlRequest, serde_json::Error> {
        CrawlRequest::post_json(self.search_url.clone(), &self.query(1), Callback::EventsProbe)
    }

    /// Reads the total from a probe response
    ///
    /// Returns the listing request, or None when there are no events.
    pub fn handle_probe(&self, result: &FetchResult) -> Result<Option<CrawlRequest>, serde_json::Error> {
        let response: SearchResponse = serde_json::from_str(&result.body)?;
        let total = response.total_results();

        if total == 0 {
            tracing::info!("Events search reported no results");
            return Ok(None);
        }

        tracing::info!("Events search reported {} results", total);
        CrawlRequest::post_json(
            self.search_url.clone(),
            &self.query(total),
            Callback::EventsListing { expected: total },
        )
        .map(Some)
    }

    /// Reads the event page URLs from a listing response
    ///
    /// Results without a parsable URL are skipped. A response shorter than
    /// `expected` is logged, since the endpoint may cap the page size.
    pub fn handle_listing(
        &self,
        result: &FetchResult,
        expected: u64,
    ) -> Result<Vec<Url>, serde_json::Error> {
        let response: SearchResponse = serde_json::from_str(&result.body)?;
        let results = response.results.unwrap_or_default();

        if (results.len() as u64) < expected {
            tracing::warn!(
                "Events search returned {} of {} results; the page size may be capped",
                results.len(),
                expected
            );
        }

        Ok(results
            .into_iter()
            .filter_map(|item| item.url.and_then(|u| u.raw))
            .filter_map(|raw| match result.url.join(raw.trim()) {
                Ok(url) => Some(url),
                Err(e) => {
                    tracing::debug!("Skipping event URL {:?}: {}", raw, e);
                    None
                }
            })
            .collect())
    }
}
