//! Change records sent to clients.

use crate::entry::{LogEntry, RecordKey, Row};
use crate::operation::Operation;
use serde::{Deserialize, Serialize};

/// A single change as delivered to a client.
///
/// `data` is present iff `op` is `Insert` or `Update` and the row could be
/// resolved; it is always the row's current state at resolution time, not a
/// historical snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Log position of the originating entry.
    pub log_id: u64,
    /// Table name.
    pub table: String,
    /// Mutation kind.
    pub op: Operation,
    /// Echo of the entry's record key.
    pub key: RecordKey,
    /// Current row snapshot (Insert/Update only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Row>,
}

impl ChangeRecord {
    /// Creates a record without row data, as used for deletes.
    pub fn without_data(entry: LogEntry) -> Self {
        Self {
            log_id: entry.id,
            table: entry.table_name,
            op: entry.op,
            key: entry.record_key,
            data: None,
        }
    }

    /// Creates a record carrying a resolved row snapshot.
    pub fn with_data(entry: LogEntry, row: Row) -> Self {
        Self {
            data: Some(row),
            ..Self::without_data(entry)
        }
    }
}
