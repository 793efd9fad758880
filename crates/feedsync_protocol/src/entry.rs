//! Change log entries.

use crate::error::{ProtocolError, ProtocolResult};
use crate::operation::Operation;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A full row snapshot: column name → value, in table column order.
pub type Row = Map<String, Value>;

/// A natural key: key column name → key value, in key column order.
pub type RecordKey = Map<String, Value>;

/// One record of a single row-level mutation.
///
/// Entries are created by whatever process mutates the live tables and are
/// never modified by the sync protocol.
///
/// # Invariants
///
/// - `id` is unique and strictly increasing in commit order
/// - `record_key` identifies the row by its natural key, not a surrogate id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Log position assigned at append time.
    pub id: u64,
    /// Logical table the mutation applies to.
    pub table_name: String,
    /// Mutation kind.
    pub op: Operation,
    /// Natural key of the affected row.
    pub record_key: RecordKey,
}

impl LogEntry {
    /// Creates a new log entry.
    pub fn new(
        id: u64,
        table_name: impl Into<String>,
        op: Operation,
        record_key: RecordKey,
    ) -> Self {
        Self {
            id,
            table_name: table_name.into(),
            op,
            record_key,
        }
    }

    /// Extracts key values for `columns`, in that order.
    ///
    /// Returns `None` if any column is missing from the record key, is
    /// `null`, or is not a scalar (array or object).
    pub fn key_values(&self, columns: &[String]) -> Option<Vec<&Value>> {
        columns
            .iter()
            .map(|col| {
                self.record_key
                    .get(col)
                    .filter(|v| !(v.is_null() || v.is_array() || v.is_object()))
            })
            .collect()
    }
}

/// Parses a serialized record key.
///
/// The stored form is a JSON object; anything else is rejected.
pub fn parse_record_key(text: &str) -> ProtocolResult<RecordKey> {
    match serde_json::from_str::<Value>(text)? {
        Value::Object(map) => Ok(map),
        other => Err(ProtocolError::InvalidRecordKey(other.to_string())),
    }
}
