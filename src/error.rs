//! Error types for trade log reconstruction.
//!
//! Two layers, both defined with `thiserror`:
//!
//! - [`ReconError`]: run-level failures (input unavailable, serialization).
//!   These abort a parse before any record is processed.
//! - [`RecordError`]: why a single line was dropped. These never escape the
//!   per-line loop; they are counted and optionally tracked as warnings.

use thiserror::Error;

use crate::warnings::WarningCategory;

/// Result type alias for run-level operations.
pub type Result<T> = std::result::Result<T, ReconError>;

/// Main error type for a reconstruction run.
#[derive(Error, Debug, Clone)]
pub enum ReconError {
    /// Input path is missing or unreadable
    #[error("Log file unavailable: {path}: {reason}")]
    FileUnavailable { path: String, reason: String },

    /// I/O failure outside of the initial read (e.g. writing output)
    #[error("IO error: {0}")]
    Io(String),

    /// Dataset could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic error with context
    #[error("Error: {0}")]
    Generic(String),
}

impl ReconError {
    /// Create a generic error from any string-like type.
    pub fn generic(msg: impl Into<String>) -> Self {
        ReconError::Generic(msg.into())
    }

    /// Build a `FileUnavailable` error for `path`.
    pub fn file_unavailable(path: impl AsRef<std::path::Path>, reason: impl ToString) -> Self {
        ReconError::FileUnavailable {
            path: path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<std::io::Error> for ReconError {
    fn from(err: std::io::Error) -> Self {
        ReconError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ReconError {
    fn from(err: serde_json::Error) -> Self {
        ReconError::Serialization(err.to_string())
    }
}

impl From<String> for ReconError {
    fn from(err: String) -> Self {
        ReconError::Generic(err)
    }
}

impl From<&str> for ReconError {
    fn from(err: &str) -> Self {
        ReconError::Generic(err.to_string())
    }
}

/// Reason a single log line was dropped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    /// Line contains no `|` separator
    #[error("Missing field separator")]
    MissingSeparator,

    /// Time-of-day field could not be parsed
    #[error("Invalid timestamp: {0:?}")]
    InvalidTimestamp(String),

    /// Event tag not recognized
    #[error("Unknown event type: {0:?}")]
    UnknownEventType(String),

    /// Record has fewer fields than its event type requires
    #[error("{event} requires {required} fields, found {found}")]
    TooFewFields {
        event: &'static str,
        required: usize,
        found: usize,
    },

    /// Numeric field could not be coerced
    #[error("Invalid number in {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    /// Side did not normalize to Buy/Sell
    #[error("Invalid side: {0:?}")]
    InvalidSide(String),

    /// Top symbol is neither a spot nor a linear instrument
    #[error("Unknown venue for symbol: {0:?}")]
    UnknownVenue(String),
}

impl RecordError {
    /// Warning category used when this drop is tracked.
    pub fn category(&self) -> WarningCategory {
        match self {
            RecordError::InvalidTimestamp(_) => WarningCategory::MalformedTimestamp,
            RecordError::UnknownEventType(_) => WarningCategory::UnknownEvent,
            RecordError::UnknownVenue(_) => WarningCategory::UnknownVenue,
            RecordError::MissingSeparator
            | RecordError::TooFewFields { .. }
            | RecordError::InvalidNumber { .. }
            | RecordError::InvalidSide(_) => WarningCategory::MalformedRecord,
        }
    }
}
