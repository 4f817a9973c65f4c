//! Rate governor: worker slots and adaptive per-domain delay
//!
//! This module handles:
//! - Global concurrency limiting via a semaphore
//! - Per-domain request spacing (`DomainState::reserve`)
//! - Adapting the spacing to observed latency and errors ("autothrottle")
//!
//! The governor only delays requests; it never drops or reorders them.

use crate::config::ThrottleConfig;
use crate::state::{bound, DomainState, ResponseHealth};
use crate::url::domain_key;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use url::Url;

/// Shared throttle for every worker slot
pub struct RateGovernor {
    /// Throttle settings (bounds, target concurrency, slot counts)
    config: ThrottleConfig,

    /// Global semaphore limiting in-flight fetches
    semaphore: Arc<Semaphore>,

    /// Per-domain delay state
    domains: Mutex<HashMap<String, DomainState>>,
}

impl RateGovernor {
    /// Creates a governor from the throttle configuration
    pub fn new(config: ThrottleConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.effective_concurrency()));
        Self {
            config,
            semaphore,
            domains: Mutex::new(HashMap::new()),
        }
    }

    fn domains(&self) -> MutexGuard<'_, HashMap<String, DomainState>> {
        self.domains.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of worker slots
    pub fn concurrency(&self) -> usize {
        self.config.effective_concurrency()
    }

    /// Whether adaptive delay is active
    pub fn is_adaptive(&self) -> bool {
        self.config.enabled
    }

    /// Delay a domain starts with before any response was observed
    pub fn initial_delay(&self) -> Duration {
        let min = self.config.delay_floor();
        if self.config.enabled {
            bound(self.config.initial_delay(), min, self.config.delay_ceiling())
        } else {
            min
        }
    }

    /// Takes a free worker slot, if any
    ///
    /// The returned permit holds the slot until dropped.
    pub fn try_slot(&self) -> Option<OwnedSemaphorePermit> {
        self.semaphore.clone().try_acquire_owned().ok()
    }

    /// Number of worker slots not currently taken
    pub fn free_slots(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Reserves the next request slot for the URL's domain
    ///
    /// Returns how long the caller must wait before sending.
    pub fn reserve(&self, url: &Url) -> Duration {
        let initial = self.initial_delay();
        let mut domains = self.domains();
        domains
            .entry(domain_key(url))
            .or_insert_with(|| DomainState::new(initial))
            .reserve(Instant::now())
    }

    /// Reserves a slot and sleeps until it arrives
    pub async fn wait_turn(&self, url: &Url) {
        let wait = self.reserve(url);
        if !wait.is_zero() {
            tracing::trace!("Throttling {} for {:?}", url, wait);
            tokio::time::sleep(wait).await;
        }
    }

    /// Feeds an observed response back into the domain's delay
    ///
    /// Ignored when throttling is disabled: the delay stays at its floor.
    pub fn observe(&self, url: &Url, latency: Duration, health: ResponseHealth) {
        if !self.config.enabled {
            return;
        }

        let initial = self.initial_delay();
        let mut domains = self.domains();
        let state = domains
            .entry(domain_key(url))
            .or_insert_with(|| DomainState::new(initial));

        let before = state.delay;
        state.observe(latency, health, &self.config);

        if state.delay != before {
            tracing::debug!(
                "Adjusted delay for {}: {:?} -> {:?} (latency {:?}, {:?})",
                domain_key(url),
                before,
                state.delay,
                latency,
                health
            );
        }
    }

    /// Current delay for the URL's domain, if it has been seen
    pub fn current_delay(&self, url: &Url) -> Option<Duration> {
        self.domains().get(&domain_key(url)).map(|s| s.delay)
    }
}
