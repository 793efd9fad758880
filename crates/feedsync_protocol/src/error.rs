//! Error types for the sync protocol.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while parsing protocol input or building a schema.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The client cursor is not a non-negative integer.
    #[error("invalid last_id {0:?}, must be a non-negative integer")]
    InvalidCursor(String),

    /// A table or column name is not a plain SQL identifier.
    #[error("invalid identifier {0:?}")]
    InvalidIdentifier(String),

    /// A table was registered without key columns.
    #[error("table {0:?} has no key columns")]
    EmptyKey(String),

    /// A table was registered twice.
    #[error("table {0:?} registered more than once")]
    DuplicateTable(String),

    /// A key schema document does not have the expected shape.
    #[error("invalid key schema: {0}")]
    InvalidSchema(String),

    /// A stored record key is not a JSON object.
    #[error("record key is not a JSON object: {0}")]
    InvalidRecordKey(String),

    /// Unknown operation code.
    #[error("unknown operation code {0:?}")]
    UnknownOperation(String),

    /// JSON encoding or decoding failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ProtocolError::InvalidCursor("abc".into());
        assert!(err.to_string().contains("\"abc\""));

        let err = ProtocolError::EmptyKey("Price".into());
        assert_eq!(err.to_string(), "table \"Price\" has no key columns");
    }
}
