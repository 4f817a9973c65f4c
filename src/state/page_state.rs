//! Final outcome of one fetched request
//!
//! Each fetched request ends in exactly one of these states.

use std::fmt;

/// Represents how the crawl disposed of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PageState {
    // ===== Success States =====
    /// Response was classified and extracted
    Processed,

    /// 3xx response; the target went back to the frontier
    Redirected,

    // ===== Recovered Error States =====
    /// HTTP 404, downgraded to a "Page not found" record
    NotFound,

    /// Unexpected non-2xx status, logged and dropped
    Skipped,

    /// DNS, connection, or timeout failure; request dropped
    Unreachable,

    /// Body could not be used (non-textual content, malformed JSON)
    ContentMismatch,
}

impl PageState {
    /// Short label used in logs and statistics
    pub fn label(&self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Redirected => "redirected",
            Self::NotFound => "not_found",
            Self::Skipped => "skipped",
            Self::Unreachable => "unreachable",
            Self::ContentMismatch => "content_mismatch",
        }
    }

    /// Returns all possible page states
    pub fn all_states() -> [Self; 6] {
        [
            Self::Processed,
            Self::Redirected,
            Self::NotFound,
            Self::Skipped,
            Self::Unreachable,
            Self::ContentMismatch,
        ]
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
