//! CSV export of a content index.
//!
//! One row is generated for each indexed entry, bucket by bucket.
//!
//! # Columns
//!
//! - `name`: display name (`path`, or `archive|entry` for archive entries)
//! - `size`: content size in bytes
//! - `partial`: CRC-32 of the first 64 KiB, in decimal
//! - `modified`: modification time as `dd/MM/yyyy-HH:mm:ss`, local time
//!
//! The header row is optional.
//!
//! # Example
//!
//! ```no_run
//! use deldup::duplicates::Indexer;
//! use deldup::output::csv::CsvOutput;
//! use std::path::Path;
//!
//! let (index, _) = Indexer::with_defaults().index(Path::new(".")).unwrap();
//! CsvOutput::new(&index).write_to(std::io::stdout()).unwrap();
//! ```

use std::io;

use chrono::{DateTime, Local};
use serde::Serialize;
use thiserror::Error;

use crate::duplicates::ContentIndex;
use crate::scanner::fingerprint::checksum_to_string;
use crate::scanner::{FileIdentity, ReadError};

/// Timestamp format of the `modified` column.
pub const DATE_FORMAT: &str = "%d/%m/%Y-%H:%M:%S";

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// An entry's fingerprint could not be computed.
    #[error(transparent)]
    Read(#[from] ReadError),
}

/// A single row in the CSV output.
#[derive(Debug, Serialize)]
struct CsvRow {
    name: String,
    size: u64,
    partial: String,
    modified: String,
}

impl CsvRow {
    fn from_identity(identity: &FileIdentity) -> Result<Self, ReadError> {
        let key = identity.composite_key()?;
        Ok(Self {
            name: identity.to_string(),
            size: key.size,
            partial: checksum_to_string(key.partial),
            modified: identity
                .modified()
                .map_or_else(|| "unknown".to_string(), |t| format_date(&t)),
        })
    }
}

/// CSV output formatter.
pub struct CsvOutput<'a> {
    index: &'a ContentIndex,
    header: bool,
}

impl<'a> CsvOutput<'a> {
    /// Create a formatter without a header row.
    #[must_use]
    pub fn new(index: &'a ContentIndex) -> Self {
        Self {
            index,
            header: false,
        }
    }

    /// Write a header row first.
    #[must_use]
    pub fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    /// Write every entry to `writer`.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(self.header)
            .from_writer(writer);

        for identity in self.index.entries() {
            csv_writer.serialize(CsvRow::from_identity(identity)?)?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Generate CSV output as a string.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if serialization fails.
    pub fn to_string(&self) -> Result<String, CsvOutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Format a timestamp for the `modified` column.
#[must_use]
pub fn format_date(time: &DateTime<Local>) -> String {
    time.format(DATE_FORMAT).to_string()
}
