//! Crawler module for request scheduling and fetching
//!
//! This module contains the core crawling machinery:
//! - Crawl requests and their fingerprints
//! - The frontier queue and dedup store
//! - Adaptive per-domain rate limiting
//! - HTTP fetching and link extraction
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod frontier;
mod governor;
mod parser;
mod request;

pub use coordinator::{run_crawl, Coordinator};
pub use fetcher::{build_http_client, fetch, FetchError, FetchResult};
pub use frontier::Frontier;
pub use governor::RateGovernor;
pub use parser::{extract_links, resolve_link};
pub use request::{Callback, CrawlRequest, FragmentOrigin, Method};
