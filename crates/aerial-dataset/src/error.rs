//! Error types for the dataset crate.

use thiserror::Error;

/// Errors that can occur while reading or reshaping building tables.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// I/O error reading or writing a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing or writing error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A column required by the operation is absent from the header.
    #[error("Missing column '{0}'")]
    MissingColumn(String),

    /// A row does not have the expected shape.
    #[error("Malformed row {line}: {reason}")]
    MalformedRow {
        /// 1-based line number in the input, if known.
        line: u64,
        /// What is wrong with the row.
        reason: String,
    },

    /// The geometry of a record cannot be turned into a point.
    #[error("Invalid geometry for building {id}: {reason}")]
    Geometry {
        /// Building identifier.
        id: String,
        /// Parser or centroid failure.
        reason: String,
    },

    /// Split ratio outside `[0, 1]`.
    #[error("Split ratio {0} must be between 0 and 1")]
    InvalidRatio(f64),
}
