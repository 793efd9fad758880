//! Client-side replay of change records.

use crate::change::ChangeRecord;
use crate::entry::{RecordKey, Row};
use crate::messages::SyncResponse;
use crate::operation::Operation;
use serde_json::Value;
use std::collections::BTreeMap;

/// An in-memory replica that applies sync responses the way a client does.
///
/// Changes are applied in delivery order: inserts and updates upsert the
/// attached row, deletes remove it. Records at or below the replica's
/// cursor have already been applied and are ignored, so applying the same
/// response twice is harmless.
#[derive(Debug, Clone, Default)]
pub struct Replica {
    cursor: u64,
    rows: BTreeMap<(String, String), Row>,
}

impl Replica {
    /// Creates an empty replica with cursor 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cursor to send with the next sync request.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Applies a sync response and advances the cursor.
    pub fn apply(&mut self, response: &SyncResponse) {
        for change in &response.changes {
            if change.log_id <= self.cursor {
                continue;
            }
            self.apply_change(change);
        }
        self.cursor = self.cursor.max(response.last_id);
    }

    fn apply_change(&mut self, change: &ChangeRecord) {
        let slot = (change.table.clone(), canonical_key(&change.key));
        match (change.op, &change.data) {
            (Operation::Delete, _) => {
                self.rows.remove(&slot);
            }
            (_, Some(row)) => {
                self.rows.insert(slot, row.clone());
            }
            (_, None) => {}
        }
    }

    /// Returns the replicated row for `table` / `key`.
    pub fn get(&self, table: &str, key: &RecordKey) -> Option<&Row> {
        self.rows.get(&(table.to_string(), canonical_key(key)))
    }

    /// Returns all replicated rows of `table`.
    pub fn rows(&self, table: &str) -> Vec<&Row> {
        self.rows
            .iter()
            .filter(|((t, _), _)| t == table)
            .map(|(_, row)| row)
            .collect()
    }

    /// Returns the total number of replicated rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the replica holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Key identity independent of column order.
fn canonical_key(key: &RecordKey) -> String {
    let sorted: BTreeMap<&String, &Value> = key.iter().collect();
    serde_json::to_string(&sorted).unwrap_or_default()
}
