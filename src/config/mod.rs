//! Configuration module
//!
//! This module handles loading, parsing, and validating the optional TOML
//! configuration file, and derives the crawl scope from the seed URL.
//!
//! # Example
//!
//! ```no_run
//! use mkto_crawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("mkto-crawl.toml")).unwrap();
//! println!("Throttle max delay: {}s", config.throttle.max_delay);
//! ```

mod parser;
mod scope;
mod types;
mod validation;

// Re-export types
pub use scope::{CrawlScope, SeedKind};
pub use types::{Config, CrawlerConfig, EventsConfig, ThrottleConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
