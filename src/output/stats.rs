//! Crawl statistics
//!
//! Counters are updated by the coordinator as fetches complete and printed
//! once the frontier is exhausted.

use crate::state::PageState;
use std::collections::HashMap;
use std::time::Duration;

/// Crawl statistics summary
#[derive(Debug, Clone, Default)]
pub struct CrawlStatistics {
    /// Count of fetched requests by final state
    pub pages_by_state: HashMap<PageState, u64>,

    /// Records handed to the sink
    pub records_written: u64,

    /// Records attributed through experience fragments
    pub fragment_records: u64,

    /// Distinct requests ever accepted by the frontier
    pub requests_enqueued: u64,

    /// Enqueue attempts rejected as duplicates
    pub duplicates_filtered: u64,

    /// Wall-clock duration of the crawl
    pub elapsed: Duration,
}

impl CrawlStatistics {
    /// Records the final state of one fetched request
    pub fn record_state(&mut self, state: PageState) {
        *self.pages_by_state.entry(state).or_insert(0) += 1;
    }

    /// Number of requests that reached a final state
    pub fn total_fetched(&self) -> u64 {
        self.pages_by_state.values().sum()
    }

    /// Count for one state
    pub fn count(&self, state: PageState) -> u64 {
        self.pages_by_state.get(&state).copied().unwrap_or(0)
    }

    /// Fetched requests per second over the whole crawl
    pub fn pages_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.total_fetched() as f64 / secs
        } else {
            0.0
        }
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Requests fetched: {}", stats.total_fetched());
    println!("  Requests enqueued: {}", stats.requests_enqueued);
    println!("  Duplicates filtered: {}", stats.duplicates_filtered);
    println!("  Records written: {}", stats.records_written);
    println!("  Records from experience fragments: {}", stats.fragment_records);
    println!(
        "  Duration: {:.1}s ({:.2} requests/sec)",
        stats.elapsed.as_secs_f64(),
        stats.pages_per_second()
    );
    println!();

    println!("Requests by State:");
    let total = stats.total_fetched();
    for state in PageState::all_states() {
        let count = stats.count(state);
        if count == 0 {
            continue;
        }
        let percentage = if total > 0 {
            (count as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", state, count, percentage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_state_counts() {
        let mut stats = CrawlStatistics::default();
        stats.record_state(PageState::Processed);
        stats.record_state(PageState::Processed);
        stats.record_state(PageState::NotFound);

        assert_eq!(stats.count(PageState::Processed), 2);
        assert_eq!(stats.count(PageState::NotFound), 1);
        assert_eq!(stats.count(PageState::Unreachable), 0);
        assert_eq!(stats.total_fetched(), 3);
    }

    #[test]
    fn test_pages_per_second() {
        let mut stats = CrawlStatistics::default();
        assert_eq!(stats.pages_per_second(), 0.0);

        for _ in 0..10 {
            stats.record_state(PageState::Processed);
        }
        stats.elapsed = Duration::from_secs(5);
        assert!((stats.pages_per_second() - 2.0).abs() < f64::EPSILON);
    }
}
