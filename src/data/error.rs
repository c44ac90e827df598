//! Error types for dataset loading.
//!
//! Every variant means the dataset is unavailable; the process cannot serve
//! without it, so callers surface these at startup and exit.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for dataset operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Reasons the case dataset could not be made available.
#[derive(Debug, Error)]
pub enum DataError {
    /// Source file missing or unreadable.
    #[error("dataset unavailable: failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV framing error (unbalanced quotes, ragged rows, bad UTF-8).
    #[error("dataset unavailable: malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Header does not match the provider layout (renamed or missing columns).
    #[error("dataset unavailable: unexpected schema in {path}: {reason}")]
    Schema { path: PathBuf, reason: String },

    /// A count cell that is neither blank nor an integer.
    #[error("dataset unavailable: {path} line {line}, column '{column}': invalid count '{value}'")]
    InvalidCount {
        path: PathBuf,
        line: u64,
        column: String,
        value: String,
    },

    /// The source parsed but holds no data rows.
    #[error("dataset unavailable: {path} contains no records")]
    Empty { path: PathBuf },
}
