//! Protocol messages for sync.

use crate::change::ChangeRecord;
use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};

/// Sync request from a client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRequest {
    /// Highest log id the client has already applied.
    #[serde(default)]
    pub last_id: u64,
}

impl SyncRequest {
    /// Creates a new sync request.
    pub fn new(last_id: u64) -> Self {
        Self { last_id }
    }

    /// Parses the raw `last_id` parameter.
    ///
    /// An absent or blank value means "send me everything" (cursor 0).
    /// Anything else must be a non-negative integer.
    pub fn parse(raw: Option<&str>) -> ProtocolResult<Self> {
        let raw = match raw.map(str::trim) {
            None | Some("") => return Ok(Self::default()),
            Some(raw) => raw,
        };

        raw.parse::<u64>()
            .map(Self::new)
            .map_err(|_| ProtocolError::InvalidCursor(raw.to_string()))
    }
}

/// Sync response from the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncResponse {
    /// The log's tail position when the sync started. Clients send this back
    /// as their next cursor.
    pub last_id: u64,
    /// Emitted changes in ascending log order.
    pub changes: Vec<ChangeRecord>,
}

impl SyncResponse {
    /// Creates a new sync response.
    pub fn new(last_id: u64, changes: Vec<ChangeRecord>) -> Self {
        Self { last_id, changes }
    }

    /// Encodes to JSON.
    pub fn to_json(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes from JSON.
    pub fn from_json(text: &str) -> ProtocolResult<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Structured error payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable error message.
    pub error: String,
}

impl ErrorBody {
    /// Creates a new error body.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }

    /// Encodes to JSON.
    pub fn to_json(&self) -> String {
        serde_json::json!({ "error": self.error }).to_string()
    }
}
