//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates:
//! - Seeding the frontier from the crawl scope
//! - Handing requests to worker tasks as slots free up
//! - Fetching through the rate governor
//! - Applying each page's output (follow-ups to the frontier, records to the sink)
//!
//! Workers enqueue follow-ups themselves; records travel back to the main
//! loop so the sink is only ever written from one task.

use crate::config::{validate, Config, CrawlScope, SeedKind};
use crate::crawler::fetcher::{build_http_client, fetch, FetchError};
use crate::crawler::frontier::Frontier;
use crate::crawler::governor::RateGovernor;
use crate::crawler::request::{Callback, CrawlRequest};
use crate::extract::PageProcessor;
use crate::output::{CrawlStatistics, FormRecord, RecordSink};
use crate::state::PageState;
use crate::CrawlError;
use reqwest::Client;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OwnedSemaphorePermit;
use tokio::task::JoinSet;
use url::Url;

/// What one worker task reports back
#[derive(Debug)]
struct TaskOutcome {
    url: Url,
    state: PageState,
    records: Vec<FormRecord>,
}

/// Shared handles a worker task needs
#[derive(Clone)]
struct Worker {
    client: Client,
    governor: Arc<RateGovernor>,
    processor: Arc<PageProcessor>,
    frontier: Arc<Frontier>,
    allowed_statuses: Arc<[u16]>,
}

impl Worker {
    /// Fetches one request, processes the response, and enqueues follow-ups
    ///
    /// Never fails: every recoverable error ends as a page state.
    async fn handle(self, request: CrawlRequest, _permit: OwnedSemaphorePermit) -> TaskOutcome {
        let url = request.url().clone();
        self.governor.wait_turn(&url).await;

        tracing::debug!(
            "Fetching {} {} ({})",
            request.method(),
            url,
            request.callback().label()
        );

        let started = Instant::now();
        let fetched = fetch(&self.client, &request, &self.allowed_statuses).await;
        let latency = started.elapsed();

        let result = match fetched {
            Ok(result) => result,
            Err(e) => {
                self.governor.observe(&url, latency, e.health());
                log_fetch_error(&request, &e);
                return TaskOutcome {
                    url,
                    state: e.page_state(),
                    records: Vec::new(),
                };
            }
        };

        self.governor.observe(&url, latency, result.health());

        let output = self.processor.process(&request, &result);
        let state = output.state();
        let offered = output.follow_ups.len();
        let added = self.frontier.enqueue_all(output.follow_ups);
        if offered > 0 {
            tracing::debug!(
                "{}: {} follow-up(s), {} new",
                result.url,
                offered,
                added
            );
        }

        TaskOutcome {
            url,
            state,
            records: output.records,
        }
    }
}

fn log_fetch_error(request: &CrawlRequest, error: &FetchError) {
    if let Callback::Fragment(origin) = request.callback() {
        tracing::warn!(
            "Experience fragment failed for {}: {}",
            origin.referer,
            error
        );
        return;
    }

    match error {
        FetchError::Transport { .. } => tracing::warn!("Dropping request: {}", error),
        FetchError::UnexpectedStatus { .. } => tracing::warn!("Skipping response: {}", error),
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    scope: CrawlScope,
    worker: Worker,
}

impl Coordinator {
    /// Creates a coordinator with the frontier seeded from `scope`
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `scope` - Seed URL and allow-list
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(CrawlError)` - Configuration invalid or HTTP client unavailable
    pub fn new(config: Config, scope: CrawlScope) -> Result<Self, CrawlError> {
        validate(&config)?;
        let client = build_http_client(&config)?;
        let processor = PageProcessor::new(scope.clone(), config.events.clone())?;

        let seed = match scope.kind() {
            SeedKind::StartPage => CrawlRequest::page(scope.seed().clone()),
            SeedKind::Sitemap => CrawlRequest::sitemap(scope.seed().clone()),
        };

        let worker = Worker {
            client,
            governor: Arc::new(RateGovernor::new(config.throttle.clone())),
            processor: Arc::new(processor),
            frontier: Arc::new(Frontier::with_seeds([seed])),
            allowed_statuses: config.crawler.allowed_statuses.clone().into(),
        };

        Ok(Self {
            config: Arc::new(config),
            scope,
            worker,
        })
    }

    /// The shared frontier
    pub fn frontier(&self) -> &Frontier {
        &self.worker.frontier
    }

    /// Runs the crawl until the frontier is exhausted
    ///
    /// Records are written to `sink` in completion order. Only sink failures
    /// and worker panics abort the crawl.
    pub async fn run<S: RecordSink>(&mut self, mut sink: S) -> Result<CrawlStatistics, CrawlError> {
        tracing::info!(
            "Starting crawl of {} ({}), {} worker slot(s), autothrottle {}",
            self.scope.seed(),
            match self.scope.kind() {
                SeedKind::StartPage => "start page",
                SeedKind::Sitemap => "sitemap",
            },
            self.worker.governor.concurrency(),
            if self.worker.governor.is_adaptive() {
                "on"
            } else {
                "off"
            }
        );
        if let Some(segment) = self.scope.link_filter().allow_segment() {
            tracing::info!("Following links containing {}", segment);
        }

        let start_time = Instant::now();
        let progress_interval = self.config.crawler.progress_interval.max(1);
        let mut stats = CrawlStatistics::default();
        let mut tasks: JoinSet<TaskOutcome> = JoinSet::new();
        let mut completed: u64 = 0;

        loop {
            while let Some(permit) = self.worker.governor.try_slot() {
                let Some(request) = self.worker.frontier.dequeue() else {
                    break;
                };
                tasks.spawn(self.worker.clone().handle(request, permit));
            }

            let Some(joined) = tasks.join_next().await else {
                tracing::info!("Frontier is empty, crawl complete");
                break;
            };

            let outcome = joined?;
            tracing::trace!("{} finished as {}", outcome.url, outcome.state);
            stats.record_state(outcome.state);

            for record in &outcome.records {
                sink.write_record(record)?;
                stats.records_written += 1;
                if record.from_experience_fragment == Some(true) {
                    stats.fragment_records += 1;
                }
            }

            completed += 1;
            if completed % progress_interval == 0 {
                let elapsed = start_time.elapsed();
                let rate = completed as f64 / elapsed.as_secs_f64();
                tracing::info!(
                    "Progress: {} requests done, {} in frontier, {} in flight, {} records, {:.2} pages/sec",
                    completed,
                    self.worker.frontier.len(),
                    tasks.len(),
                    stats.records_written,
                    rate
                );
                sink.flush()?;
            }
        }

        sink.flush()?;

        stats.requests_enqueued = self.worker.frontier.seen_count() as u64;
        stats.duplicates_filtered = self.worker.frontier.duplicates_filtered();
        stats.elapsed = start_time.elapsed();

        tracing::info!(
            "Crawl completed: {} requests, {} records in {:?}",
            completed,
            stats.records_written,
            stats.elapsed
        );

        Ok(stats)
    }
}

/// Runs a complete crawl with the given configuration and seed
///
/// # Example
///
/// ```no_run
/// use mkto_crawl::config::{Config, CrawlScope, SeedKind};
/// use mkto_crawl::crawler::run_crawl;
/// use mkto_crawl::FormRecord;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let scope = CrawlScope::from_seed("https://example.com/us/en/", SeedKind::StartPage)?;
/// let mut records: Vec<FormRecord> = Vec::new();
/// run_crawl(Config::default(), scope, &mut records).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl<S: RecordSink>(
    config: Config,
    scope: CrawlScope,
    sink: S,
) -> Result<CrawlStatistics, CrawlError> {
    let mut coordinator = Coordinator::new(config, scope)?;
    coordinator.run(sink).await
}
