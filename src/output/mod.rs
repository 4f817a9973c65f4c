//! Output module for extracted form records
//!
//! This module handles:
//! - The `FormRecord` row and its CSV column layout
//! - Record sinks (CSV file, in-memory)
//! - Crawl statistics

mod csv_sink;
mod record;
pub mod stats;
mod traits;

pub use csv_sink::CsvSink;
pub use record::{FormId, FormRecord, CSV_HEADER, PAGE_NOT_FOUND};
pub use stats::{print_statistics, CrawlStatistics};
pub use traits::{OutputError, OutputResult, RecordSink};
