//! Page classification and extraction
//!
//! A fetched response is routed by the callback its request carries:
//!
//! | Callback | Handling |
//! |----------|----------|
//! | `Page` | classify as [`PageKind`], extract forms, discover fragments and links |
//! | `Sitemap` | enqueue listed pages or nested sitemaps |
//! | `EventsProbe` | read the result total, request the full listing |
//! | `EventsListing` | enqueue every event page |
//! | `Fragment` | extract forms, attribute them to the referring page |
//!
//! A 3xx response is handled before any of these: its target is re-enqueued
//! with the same callback, subject to dedup and the host allow-list.
//!
//! Processing is pure: a [`PageOutput`] lists the records to write and the
//! requests to enqueue, and the coordinator applies both.

mod events;
mod forms;
mod fragments;
mod metadata;
mod sitemap;

pub use events::{EventsPaginator, SearchQuery};
pub use forms::{detect_forms, find_form_loads, FormLoad, FormMatch, Strategy, FORMS2_LOADER_PATH};
pub use fragments::{discover_fragments, fragment_url, resolve_fragment, FRAGMENT_SUFFIX};
pub use metadata::{collapse_whitespace, PageMetadata};
pub use sitemap::{parse_sitemap, Sitemap, SitemapKind};

use crate::config::{CrawlScope, EventsConfig};
use crate::crawler::{extract_links, Callback, CrawlRequest, FetchResult, FragmentOrigin};
use crate::output::FormRecord;
use crate::state::PageState;
use crate::ConfigError;
use scraper::Html;
use url::Url;

/// Longest redirect chain followed from one request
pub const MAX_REDIRECTS: u8 = 10;

/// What kind of page a `Page` response is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// HTTP 404
    NotFound,
    /// The configured events listing page
    EventsListing,
    /// Anything else
    Content,
}

/// Everything one response produced
#[derive(Debug, Default)]
pub struct PageOutput {
    /// Records for the sink, in extraction order
    pub records: Vec<FormRecord>,

    /// Requests for the frontier
    pub follow_ups: Vec<CrawlRequest>,

    /// How the response was disposed of
    pub state: Option<PageState>,
}

impl PageOutput {
    fn with_state(state: PageState) -> Self {
        Self {
            state: Some(state),
            ..Self::default()
        }
    }

    /// Final state, `Processed` unless something else was recorded
    pub fn state(&self) -> PageState {
        self.state.unwrap_or(PageState::Processed)
    }
}

/// Turns fetched responses into records and follow-up requests
///
/// Holds only immutable crawl configuration, so one instance is shared by
/// every worker.
#[derive(Debug, Clone)]
pub struct PageProcessor {
    scope: CrawlScope,
    events: Option<EventsPaginator>,
}

impl PageProcessor {
    /// Creates a processor for the given scope
    ///
    /// Without an events configuration no page is treated as the events
    /// listing.
    pub fn new(scope: CrawlScope, events: Option<EventsConfig>) -> Result<Self, ConfigError> {
        let events = events.map(EventsPaginator::new).transpose()?;
        Ok(Self { scope, events })
    }

    /// The crawl scope
    pub fn scope(&self) -> &CrawlScope {
        &self.scope
    }

    /// Classifies a `Page` response
    pub fn classify(&self, result: &FetchResult) -> PageKind {
        if result.status == 404 {
            PageKind::NotFound
        } else if self
            .events
            .as_ref()
            .is_some_and(|events| events.is_listing(&result.url))
        {
            PageKind::EventsListing
        } else {
            PageKind::Content
        }
    }

    /// Processes one response according to its request's callback
    pub fn process(&self, request: &CrawlRequest, result: &FetchResult) -> PageOutput {
        if let Some(target) = &result.location {
            return self.process_redirect(request, result.status, target);
        }

        match request.callback() {
            Callback::Page => self.process_page(result),
            Callback::Sitemap => self.process_sitemap(result),
            Callback::EventsProbe => self.process_events_probe(result),
            Callback::EventsListing { expected } => self.process_events_listing(result, *expected),
            Callback::Fragment(origin) => Self::process_fragment(result, origin),
        }
    }

    fn process_redirect(&self, request: &CrawlRequest, status: u16, target: &Url) -> PageOutput {
        if request.redirects() >= MAX_REDIRECTS {
            tracing::warn!(
                "Dropping {}: more than {} redirects",
                request.url(),
                MAX_REDIRECTS
            );
            return PageOutput::with_state(PageState::Skipped);
        }

        let mut output = PageOutput::with_state(PageState::Redirected);
        if self.scope.allows_host(target) {
            tracing::debug!("Redirecting ({}) {} to {}", status, request.url(), target);
            output.follow_ups.push(request.redirected(target.clone(), status));
        } else {
            tracing::debug!(
                "Ignoring off-site redirect ({}) {} to {}",
                status,
                request.url(),
                target
            );
        }
        output
    }

    fn process_page(&self, result: &FetchResult) -> PageOutput {
        let kind = self.classify(result);

        if kind == PageKind::NotFound {
            tracing::warn!("Page not found: {}", result.url);
            let mut output = PageOutput::with_state(PageState::NotFound);
            output
                .records
                .push(FormRecord::not_found(result.url.as_str(), result.status));
            return output;
        }

        if !result.is_textual() {
            tracing::debug!(
                "Skipping {} with content type {}",
                result.url,
                result.content_type
            );
            return PageOutput::with_state(PageState::ContentMismatch);
        }

        let document = Html::parse_document(&result.body);
        let mut output = PageOutput::default();
        let mut metadata: Option<PageMetadata> = None;

        match kind {
            PageKind::EventsListing => {
                if let Some(events) = &self.events {
                    tracing::info!("Querying events search for {}", result.url);
                    match events.probe_request() {
                        Ok(probe) => output.follow_ups.push(probe),
                        Err(e) => tracing::warn!("Failed to build events probe: {}", e),
                    }
                }
            }
            PageKind::Content => {
                let (strategy, forms) = detect_forms(&document, &result.url);
                if !forms.is_empty() {
                    tracing::debug!(
                        "Found {} form(s) on {} ({:?})",
                        forms.len(),
                        result.url,
                        strategy
                    );
                    let page_metadata: &PageMetadata =
                        metadata.get_or_insert_with(|| PageMetadata::extract(&document));
                    output.records.extend(forms.into_iter().map(|form| {
                        FormRecord::form(result.url.as_str(), result.status, form, page_metadata)
                    }));
                }
            }
            PageKind::NotFound => {}
        }

        let fragments = discover_fragments(&document, &result.url);
        if !fragments.is_empty() {
            tracing::info!("Found experience fragments: {}", result.url);
            let origin = FragmentOrigin {
                referer: result.url.clone(),
                status: result.status,
                metadata: metadata
                    .take()
                    .unwrap_or_else(|| PageMetadata::extract(&document)),
            };
            output.follow_ups.extend(
                fragments
                    .into_iter()
                    .map(|url| CrawlRequest::fragment(url, origin.clone())),
            );
        }

        if self.scope.follows_links() {
            output
                .follow_ups
                .extend(self.allowed(extract_links(&document, &result.url)).map(CrawlRequest::page));
        }

        output
    }

    fn process_sitemap(&self, result: &FetchResult) -> PageOutput {
        if !result.is_success() {
            tracing::warn!("Sitemap not available: {} ({})", result.url, result.status);
            return PageOutput::with_state(PageState::NotFound);
        }

        let sitemap = parse_sitemap(&result.body, &result.url);
        tracing::info!(
            "Sitemap {} lists {} {}",
            result.url,
            sitemap.locations.len(),
            match sitemap.kind {
                SitemapKind::Index => "sitemaps",
                SitemapKind::UrlSet => "pages",
            }
        );

        let mut output = PageOutput::default();
        match sitemap.kind {
            SitemapKind::Index => output.follow_ups.extend(
                sitemap
                    .locations
                    .into_iter()
                    .filter(|url| self.scope.allows_host(url))
                    .map(CrawlRequest::sitemap),
            ),
            SitemapKind::UrlSet => output
                .follow_ups
                .extend(self.allowed(sitemap.locations).map(CrawlRequest::page)),
        }
        output
    }

    fn process_events_probe(&self, result: &FetchResult) -> PageOutput {
        let Some(events) = self.events_for(result) else {
            return PageOutput::with_state(PageState::Skipped);
        };

        match events.handle_probe(result) {
            Ok(listing) => PageOutput {
                follow_ups: listing.into_iter().collect(),
                ..PageOutput::default()
            },
            Err(e) => {
                tracing::warn!("Malformed events probe response from {}: {}", result.url, e);
                PageOutput::with_state(PageState::ContentMismatch)
            }
        }
    }

    fn process_events_listing(&self, result: &FetchResult, expected: u64) -> PageOutput {
        let Some(events) = self.events_for(result) else {
            return PageOutput::with_state(PageState::Skipped);
        };

        match events.handle_listing(result, expected) {
            Ok(urls) => {
                let total = urls.len();
                let follow_ups: Vec<CrawlRequest> = urls
                    .into_iter()
                    .filter(|url| self.scope.allows_host(url))
                    .map(CrawlRequest::page)
                    .collect();
                tracing::info!("Enqueuing {} of {} event pages", follow_ups.len(), total);
                PageOutput {
                    follow_ups,
                    ..PageOutput::default()
                }
            }
            Err(e) => {
                tracing::warn!("Malformed events listing response from {}: {}", result.url, e);
                PageOutput::with_state(PageState::ContentMismatch)
            }
        }
    }

    fn process_fragment(result: &FetchResult, origin: &FragmentOrigin) -> PageOutput {
        let state = if result.is_success() {
            PageState::Processed
        } else {
            PageState::Skipped
        };
        PageOutput {
            records: resolve_fragment(result, origin),
            follow_ups: Vec::new(),
            state: Some(state),
        }
    }

    /// Events paginator, if the response is usable JSON-API output
    fn events_for(&self, result: &FetchResult) -> Option<&EventsPaginator> {
        if !result.is_success() {
            tracing::warn!("Events search returned {} for {}", result.status, result.url);
            return None;
        }
        self.events.as_ref()
    }

    fn allowed(&self, urls: Vec<Url>) -> impl Iterator<Item = Url> + '_ {
        let filter = self.scope.link_filter();
        urls.into_iter().filter(move |url| filter.allows(url))
    }
}
