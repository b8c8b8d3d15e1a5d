//! Output formatters.
//!
//! - CSV listing of a content index, used by `deldup dump`

pub mod csv;

// Re-export main types
pub use csv::{CsvOutput, CsvOutputError};
