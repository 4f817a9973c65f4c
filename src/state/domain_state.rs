use crate::config::ThrottleConfig;
use std::time::{Duration, Instant};

/// How a response should influence the domain's delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseHealth {
    /// 2xx response: the delay may move toward the observed latency
    Healthy,
    /// Allowed non-2xx response (e.g. 404): the delay may grow but never shrink
    Degraded,
    /// Server error, rate limiting, or transport failure: back off
    Failed,
}

/// Tracks the adaptive delay of a domain during crawling
///
/// Requests to the same domain are spaced `delay` apart. The delay follows
/// observed latency while the server is healthy and doubles (up to the
/// configured maximum) when it is not.
#[derive(Debug, Clone)]
pub struct DomainState {
    /// Current spacing between requests to this domain
    pub delay: Duration,

    /// Earliest instant the next request may start
    pub next_slot: Option<Instant>,
}

impl DomainState {
    /// Creates a new DomainState with the given initial delay
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            next_slot: None,
        }
    }

    /// Reserves the next request slot for this domain
    ///
    /// Returns how long the caller must wait before issuing its request.
    /// Slots are handed out in call order, so concurrent callers queue up
    /// behind each other instead of firing together.
    pub fn reserve(&mut self, now: Instant) -> Duration {
        let slot = match self.next_slot {
            Some(next) if next > now => next,
            _ => now,
        };
        self.next_slot = Some(slot + self.delay);
        slot - now
    }

    /// Adjusts the delay after a response (or failure) was observed
    ///
    /// # Arguments
    ///
    /// * `latency` - Time from request start to response
    /// * `health` - How the response should be treated
    /// * `config` - Throttle bounds and target concurrency
    pub fn observe(&mut self, latency: Duration, health: ResponseHealth, config: &ThrottleConfig) {
        let min = config.delay_floor();
        let max = config.delay_ceiling();

        match health {
            ResponseHealth::Failed => {
                let doubled = if self.delay.is_zero() {
                    Duration::from_secs(1)
                } else {
                    self.delay.saturating_mul(2)
                };
                self.delay = bound(doubled.max(latency), min, max);
            }
            ResponseHealth::Healthy | ResponseHealth::Degraded => {
                let target = ThrottleConfig::delay_from_secs(
                    latency.as_secs_f64() / config.target_concurrency,
                );
                let averaged = self.delay.saturating_add(target) / 2;
                let proposed = bound(averaged.max(target), min, max);

                if health == ResponseHealth::Degraded && proposed <= self.delay {
                    return;
                }
                self.delay = proposed;
            }
        }
    }
}

/// Clamps `delay` into `[min, max]`; `max` wins if the bounds are inverted
pub(crate) fn bound(delay: Duration, min: Duration, max: Duration) -> Duration {
    delay.max(min).min(max)
}
