//! CSV file sink
//!
//! The output mode is chosen once, when the sink is created:
//! - append: rows are added after any existing content; the header is
//!   written only if the file is new or empty
//! - overwrite: an existing file is removed first

use super::record::FormRecord;
use super::traits::{OutputResult, RecordSink};
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Writes records as CSV rows to a file
pub struct CsvSink {
    writer: csv::Writer<File>,
    path: PathBuf,
    written: u64,
}

impl CsvSink {
    /// Opens the output file in the requested mode
    ///
    /// # Arguments
    ///
    /// * `path` - Output file
    /// * `append` - Keep existing rows instead of replacing the file
    pub fn create(path: &Path, append: bool) -> OutputResult<Self> {
        if !append {
            match fs::remove_file(path) {
                Ok(()) => tracing::debug!("Removed existing output {}", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let needs_header = file.metadata()?.len() == 0;

        let writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);

        tracing::info!(
            "Writing records to {} ({})",
            path.display(),
            if append { "append" } else { "overwrite" }
        );

        Ok(Self {
            writer,
            path: path.to_path_buf(),
            written: 0,
        })
    }

    /// The output file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records written through this sink
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl RecordSink for CsvSink {
    fn write_record(&mut self, record: &FormRecord) -> OutputResult<()> {
        self.writer.serialize(record)?;
        self.written += 1;
        Ok(())
    }

    fn flush(&mut self) -> OutputResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}
