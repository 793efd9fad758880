//! Main sync server.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::{SyncHandler, SyncOutcome};
use feedsync_protocol::{ErrorBody, KeySchemaRegistry, SyncRequest, SyncResponse};
use feedsync_store::{SqliteSource, SyncSource};
use std::sync::Arc;
use tracing::{error, warn};

/// An HTTP-equivalent reply: status code plus JSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    /// Status code (200, 400, 500 or 503).
    pub status: u16,
    /// JSON body.
    pub body: String,
}

impl HttpReply {
    fn from_error(err: &ServerError) -> Self {
        Self {
            status: err.status_code(),
            body: ErrorBody::new(err.to_string()).to_json(),
        }
    }

    /// Returns true for a 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The sync server.
///
/// Handles sync requests by opening a fresh storage session per request and
/// running a [`SyncHandler`] pass over it. The server keeps no per-client
/// state and can be shared across threads.
///
/// # Example
///
/// ```
/// use feedsync_protocol::{KeySchemaRegistry, Operation, SyncRequest};
/// use feedsync_server::SyncServer;
/// use feedsync_store::InMemoryStore;
/// use serde_json::json;
/// use std::sync::Arc;
///
/// let registry = KeySchemaRegistry::new([("Price", vec!["symbol"])]).unwrap();
/// let store = InMemoryStore::new();
/// let server = SyncServer::new(Arc::new(registry), store.clone());
///
/// store.append("Price", Operation::Delete, json!({"symbol": "X"}).as_object().cloned().unwrap());
///
/// let response = server.handle_sync(SyncRequest::new(0)).unwrap();
/// assert_eq!(response.last_id, 1);
/// assert_eq!(response.changes.len(), 1);
/// ```
pub struct SyncServer<S: SyncSource> {
    handler: SyncHandler,
    source: S,
}

impl SyncServer<SqliteSource> {
    /// Creates a server reading the SQLite database named by `config`.
    pub fn from_config(config: &ServerConfig) -> ServerResult<Self> {
        let source = config.sqlite_source()?;
        Ok(Self::new(Arc::clone(&config.registry), source))
    }
}

impl<S: SyncSource> SyncServer<S> {
    /// Creates a new sync server.
    pub fn new(registry: Arc<KeySchemaRegistry>, source: S) -> Self {
        Self {
            handler: SyncHandler::new(registry),
            source,
        }
    }

    /// Returns the storage source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Runs a sync pass and returns the response with its report.
    pub fn sync(&self, request: SyncRequest) -> ServerResult<SyncOutcome> {
        let session = self.source.session()?;
        self.handler.sync(&session, request)
    }

    /// Handles a parsed sync request.
    pub fn handle_sync(&self, request: SyncRequest) -> ServerResult<SyncResponse> {
        self.sync(request).map(|outcome| outcome.response)
    }

    /// Handles a raw `last_id` query parameter and produces a reply.
    pub fn handle_query(&self, last_id: Option<&str>) -> HttpReply {
        let result = SyncRequest::parse(last_id)
            .map_err(ServerError::from)
            .and_then(|request| self.handle_sync(request))
            .and_then(|response| response.to_json().map_err(ServerError::from));

        match result {
            Ok(body) => HttpReply { status: 200, body },
            Err(err) => {
                if err.is_client_error() {
                    warn!(last_id = ?last_id, "rejected sync request: {err}");
                } else {
                    error!(last_id = ?last_id, "sync failed: {err}");
                }
                HttpReply::from_error(&err)
            }
        }
    }
}
