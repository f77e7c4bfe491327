/// Error types for the tidyts pipeline
use crate::observation::Identity;
use chrono::NaiveDate;
use thiserror::Error;

/// Main error type for reshaping, joining and fitting
#[derive(Error, Debug)]
pub enum TidyError {
    /// Failed to parse CSV data
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    /// Failed to read an input stream
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),

    /// A column label is neither declared nor a parseable date
    #[error("Malformed date label {label:?}: {reason}")]
    MalformedDateLabel { label: String, reason: String },

    /// A declared column is not present in the table header
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// A cell could not be parsed as a number
    #[error("Invalid value {value:?} in column {column:?} (row {row})")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },

    /// The same (identity, date) appears twice within one source
    #[error("Join key collision in {metric:?}: ({identity}) on {date}")]
    JoinKeyCollision {
        metric: String,
        identity: Identity,
        date: NaiveDate,
    },

    /// Sources being joined do not share the same identity fields
    #[error("Identity fields differ between sources (expected {expected:?}, found {found:?})")]
    IdentityMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// A key field name does not match any identity field
    #[error("Unknown identity field: {0}")]
    UnknownField(String),

    /// A metric name does not match any joined source
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    /// A lookup table lists the same key twice
    #[error("Duplicate lookup key: ({0})")]
    DuplicateLookupKey(Identity),

    /// Not enough distinct points for a trend fit
    #[error("Insufficient data (needed: {needed} distinct dates, found: {found})")]
    InsufficientData { needed: usize, found: usize },

    /// Normalization range of a year has zero width
    #[error("Degenerate normalization range in {year}: min == max == {value}")]
    DegenerateRange { year: i32, value: f64 },
}

/// Type alias for Results using TidyError
pub type Result<T> = std::result::Result<T, TidyError>;
