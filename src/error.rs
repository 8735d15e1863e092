//! Error types for the grid journal.

use thiserror::Error;

/// Errors that can occur while compiling or exchanging pending edits.
///
/// Edits addressed at rows the journal does not track are not errors; they
/// are silently ignored. Only commit-time rendering and the JSON boundary
/// can fail.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JournalError {
    /// A cell value has no SQL literal form (e.g. a nested object).
    #[error("Unsupported value type: {type_name}")]
    UnsupportedValueType {
        /// Runtime type name of the offending value
        type_name: String,
    },

    /// A timestamp string could not be parsed
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Error serializing/deserializing JSON
    #[error("JSON error: {0}")]
    JsonError(String),
}

impl From<serde_json::Error> for JournalError {
    fn from(err: serde_json::Error) -> Self {
        JournalError::JsonError(err.to_string())
    }
}

/// Result type alias for journal operations.
pub type JournalResult<T> = Result<T, JournalError>;
