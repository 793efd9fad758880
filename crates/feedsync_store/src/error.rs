//! Error types for storage operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing database file does not exist.
    #[error("database file not found: {}", .0.display())]
    Unavailable(PathBuf),

    /// A SQLite error occurred.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON encoding failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A change log entry could not be decoded.
    #[error("corrupted log entry {id}: {reason}")]
    Corrupted {
        /// Raw id of the offending entry.
        id: i64,
        /// What was wrong with it.
        reason: String,
    },

    /// A TEXT column holds bytes that are not valid UTF-8.
    #[error("text value is not valid UTF-8: {0}")]
    InvalidText(#[from] std::str::Utf8Error),

    /// A registered table does not exist in the store.
    #[error("no such table: {0}")]
    MissingTable(String),

    /// A table or column name failed identifier validation.
    #[error("invalid identifier {0:?}")]
    InvalidIdentifier(String),

    /// A key value cannot be bound as a lookup parameter.
    #[error("key value {0} is not a scalar")]
    InvalidKeyValue(String),

    /// Key columns and key values differ in length.
    #[error("key arity mismatch: {columns} columns, {values} values")]
    KeyArity {
        /// Number of key columns.
        columns: usize,
        /// Number of key values.
        values: usize,
    },

    /// An appended id does not exceed the current log tail.
    #[error("log id {id} is not greater than tail {tail}")]
    NonMonotonicId {
        /// Rejected id.
        id: u64,
        /// Current tail.
        tail: u64,
    },
}

impl StoreError {
    /// Returns true if the backing storage could not be reached at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = StoreError::Corrupted {
            id: 9,
            reason: "unknown op".into(),
        };
        assert_eq!(err.to_string(), "corrupted log entry 9: unknown op");

        let err = StoreError::Unavailable(PathBuf::from("/tmp/missing.db"));
        assert!(err.to_string().contains("missing.db"));
        assert!(err.is_unavailable());

        let err = StoreError::MissingTable("Ghost".into());
        assert_eq!(err.to_string(), "no such table: Ghost");
        assert!(!err.is_unavailable());
    }
}
