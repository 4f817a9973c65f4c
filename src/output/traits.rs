//! Record sink trait
//!
//! The coordinator hands every extracted record to a sink, one at a time
//! and from a single task, so implementations need no internal locking.

use super::record::FormRecord;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Destination for extracted records
pub trait RecordSink {
    /// Appends one record
    fn write_record(&mut self, record: &FormRecord) -> OutputResult<()>;

    /// Flushes buffered records to the underlying resource
    fn flush(&mut self) -> OutputResult<()> {
        Ok(())
    }
}

/// In-memory sink, used by tests and callers that post-process records
impl RecordSink for Vec<FormRecord> {
    fn write_record(&mut self, record: &FormRecord) -> OutputResult<()> {
        self.push(record.clone());
        Ok(())
    }
}

impl<S: RecordSink + ?Sized> RecordSink for &mut S {
    fn write_record(&mut self, record: &FormRecord) -> OutputResult<()> {
        (**self).write_record(record)
    }

    fn flush(&mut self) -> OutputResult<()> {
        (**self).flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_sink_collects() {
        let mut sink: Vec<FormRecord> = Vec::new();
        sink.write_record(&FormRecord::not_found("https://example.com/a", 404))
            .unwrap();
        sink.flush().unwrap();
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_mut_ref_sink_forwards() {
        fn write_one<S: RecordSink>(mut sink: S) {
            sink.write_record(&FormRecord::not_found("https://example.com/b", 404))
                .unwrap();
        }

        let mut records: Vec<FormRecord> = Vec::new();
        write_one(&mut records);
        assert_eq!(records[0].url, "https://example.com/b");
    }
}
