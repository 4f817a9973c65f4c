//! Frontier queue and dedup store
//!
//! Pending requests are served strictly first-in first-out, so the crawl is
//! breadth-first by discovery time. Every request's dedup key is remembered
//! for the lifetime of the crawl; a key seen once is never queued again.

use crate::crawler::request::CrawlRequest;
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct FrontierInner {
    /// Requests waiting to be fetched, in discovery order
    queue: VecDeque<CrawlRequest>,

    /// Dedup keys of every request ever accepted
    seen: HashSet<String>,

    /// Number of enqueue attempts rejected as duplicates
    duplicates: u64,
}

/// Shared work queue of pending fetches
///
/// All methods take `&self`; the queue and the seen-set sit behind one lock,
/// so the check-and-insert in [`Frontier::enqueue`] is atomic across worker
/// tasks.
#[derive(Debug, Default)]
pub struct Frontier {
    inner: Mutex<FrontierInner>,
}

impl Frontier {
    /// Creates an empty frontier
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a frontier pre-seeded with the given requests
    pub fn with_seeds(seeds: impl IntoIterator<Item = CrawlRequest>) -> Self {
        let frontier = Self::new();
        frontier.enqueue_all(seeds);
        frontier
    }

    fn lock(&self) -> MutexGuard<'_, FrontierInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a request unless an equivalent one was accepted before
    ///
    /// Returns true if the request was newly added.
    pub fn enqueue(&self, request: CrawlRequest) -> bool {
        let key = request.dedup_key();
        let mut inner = self.lock();

        if !inner.seen.insert(key) {
            inner.duplicates += 1;
            tracing::debug!("Filtered duplicate request: {} {}", request.method(), request.url());
            return false;
        }

        tracing::trace!(
            "Enqueued {} request: {} {}",
            request.callback().label(),
            request.method(),
            request.url()
        );
        inner.queue.push_back(request);
        true
    }

    /// Enqueues every request, returning how many were newly added
    pub fn enqueue_all(&self, requests: impl IntoIterator<Item = CrawlRequest>) -> usize {
        requests
            .into_iter()
            .map(|request| self.enqueue(request))
            .filter(|added| *added)
            .count()
    }

    /// Pops the oldest pending request
    pub fn dequeue(&self) -> Option<CrawlRequest> {
        self.lock().queue.pop_front()
    }

    /// Returns the number of pending requests
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    /// Returns whether no requests are pending
    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    /// Returns how many distinct requests were ever accepted
    pub fn seen_count(&self) -> usize {
        self.lock().seen.len()
    }

    /// Returns how many enqueue attempts were rejected as duplicates
    pub fn duplicates_filtered(&self) -> u64 {
        self.lock().duplicates
    }
}
