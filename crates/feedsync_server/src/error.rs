//! Error types for the sync server.

use feedsync_protocol::ProtocolError;
use feedsync_store::StoreError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can fail a whole sync request.
///
/// Per-entry anomalies (unregistered table, malformed key, vanished row) are
/// not errors; they are dropped from the response.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The client cursor is malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The backing database could not be found.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Storage failed while serving the request.
    #[error("storage error: {0}")]
    Storage(StoreError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(self, ServerError::InvalidRequest(_))
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }

    /// Returns the HTTP-equivalent status code.
    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::InvalidRequest(_) => 400,
            ServerError::StorageUnavailable(_) => 503,
            ServerError::Storage(_) | ServerError::Internal(_) => 500,
        }
    }
}

impl From<StoreError> for ServerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(path) => ServerError::StorageUnavailable(format!(
                "database file not found: {}",
                path.display()
            )),
            other => ServerError::Storage(other),
        }
    }
}

impl From<ProtocolError> for ServerError {
    fn from(err: ProtocolError) -> Self {
        match &err {
            ProtocolError::InvalidCursor(_) => ServerError::InvalidRequest(err.to_string()),
            _ => ServerError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn error_classification() {
        assert!(ServerError::InvalidRequest("bad".into()).is_client_error());
        assert!(ServerError::Internal("oops".into()).is_server_error());
        assert!(!ServerError::InvalidRequest("bad".into()).is_server_error());
    }

    #[test]
    fn status_codes() {
        assert_eq!(ServerError::InvalidRequest("x".into()).status_code(), 400);
        assert_eq!(ServerError::StorageUnavailable("x".into()).status_code(), 503);
        assert_eq!(ServerError::Internal("x".into()).status_code(), 500);
    }

    #[test]
    fn from_store_error() {
        let err: ServerError = StoreError::Unavailable(PathBuf::from("Finance.db")).into();
        assert!(matches!(err, ServerError::StorageUnavailable(_)));

        let err: ServerError = StoreError::Corrupted {
            id: 3,
            reason: "bad".into(),
        }
        .into();
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn from_protocol_error() {
        let err: ServerError = ProtocolError::InvalidCursor("abc".into()).into();
        assert!(err.is_client_error());
        assert!(err.to_string().contains("abc"));
    }
}
