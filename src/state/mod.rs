//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `DomainState`: per-domain adaptive delay and request slot reservation
//! - `PageState`: how each fetched request was finally disposed of

mod domain_state;
mod page_state;

// Re-export main types
pub(crate) use domain_state::bound;
pub use domain_state::{DomainState, ResponseHealth};
pub use page_state::PageState;
