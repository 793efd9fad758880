//! In-memory change log and tables.

use crate::error::{StoreError, StoreResult};
use crate::store::{ChangeLogStore, RowResolver, SyncSource};
use feedsync_protocol::{LogEntry, Operation, RecordKey, Row};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// An in-memory store holding both the change log and the live tables.
///
/// This store is suitable for:
/// - Unit and integration tests
/// - Embedding the sync protocol without a database file
///
/// Clones share the same underlying data, so a clone handed out as a
/// session observes later writes.
///
/// # Example
///
/// ```rust
/// use feedsync_protocol::Operation;
/// use feedsync_store::{InMemoryStore, RowResolver};
/// use serde_json::json;
///
/// let store = InMemoryStore::new();
/// let row = json!({"symbol": "X", "price": 10}).as_object().cloned().unwrap();
/// store.insert_row("Price", row);
///
/// let found = store
///     .resolve("Price", &["symbol".to_string()], &[&json!("X")])
///     .unwrap();
/// assert_eq!(found.unwrap()["price"], 10);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    /// Entries in ascending id order.
    log: Vec<LogEntry>,
    /// Table name -> rows in insertion order.
    tables: HashMap<String, Vec<Row>>,
}

impl Inner {
    fn tail(&self) -> u64 {
        self.log.last().map_or(0, |e| e.id)
    }
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a log entry with the next id and returns that id.
    pub fn append(&self, table: impl Into<String>, op: Operation, key: RecordKey) -> u64 {
        let mut inner = self.inner.write();
        let id = inner.tail() + 1;
        inner.log.push(LogEntry::new(id, table, op, key));
        id
    }

    /// Appends a log entry with an explicit id.
    ///
    /// Ids may skip values but must exceed the current tail.
    pub fn append_with_id(
        &self,
        id: u64,
        table: impl Into<String>,
        op: Operation,
        key: RecordKey,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write();
        let tail = inner.tail();
        if id <= tail {
            return Err(StoreError::NonMonotonicId { id, tail });
        }
        inner.log.push(LogEntry::new(id, table, op, key));
        Ok(())
    }

    /// Creates `table` with no rows. Existing tables are left untouched.
    pub fn create_table(&self, table: impl Into<String>) {
        self.inner.write().tables.entry(table.into()).or_default();
    }

    /// Appends a row to `table`, creating the table if needed.
    pub fn insert_row(&self, table: impl Into<String>, row: Row) {
        self.inner
            .write()
            .tables
            .entry(table.into())
            .or_default()
            .push(row);
    }

    /// Overwrites columns of every row matching `key`. Returns the number of
    /// rows changed.
    pub fn update_rows(&self, table: &str, key: &RecordKey, changes: &Row) -> usize {
        let mut inner = self.inner.write();
        let Some(rows) = inner.tables.get_mut(table) else {
            return 0;
        };

        let mut count = 0;
        for row in rows.iter_mut().filter(|row| matches_key(row, key)) {
            for (col, value) in changes {
                row.insert(col.clone(), value.clone());
            }
            count += 1;
        }
        count
    }

    /// Deletes every row matching `key`. Returns the number of rows removed.
    pub fn delete_rows(&self, table: &str, key: &RecordKey) -> usize {
        let mut inner = self.inner.write();
        let Some(rows) = inner.tables.get_mut(table) else {
            return 0;
        };

        let before = rows.len();
        rows.retain(|row| !matches_key(row, key));
        before - rows.len()
    }

    /// Returns the number of log entries.
    pub fn log_len(&self) -> usize {
        self.inner.read().log.len()
    }

    /// Returns the number of rows in `table`.
    pub fn row_count(&self, table: &str) -> usize {
        self.inner.read().tables.get(table).map_or(0, Vec::len)
    }
}

fn matches_key(row: &Row, key: &RecordKey) -> bool {
    key.iter().all(|(col, value)| row.get(col) == Some(value))
}

impl ChangeLogStore for InMemoryStore {
    fn latest_position(&self) -> StoreResult<u64> {
        Ok(self.inner.read().tail())
    }

    fn entries_after(&self, cursor: u64) -> StoreResult<Vec<LogEntry>> {
        let inner = self.inner.read();
        let start = inner.log.partition_point(|e| e.id <= cursor);
        Ok(inner.log[start..].to_vec())
    }
}

impl RowResolver for InMemoryStore {
    fn resolve(
        &self,
        table: &str,
        key_columns: &[String],
        key_values: &[&Value],
    ) -> StoreResult<Option<Row>> {
        if key_columns.len() != key_values.len() {
            return Err(StoreError::KeyArity {
                columns: key_columns.len(),
                values: key_values.len(),
            });
        }

        let inner = self.inner.read();
        let rows = inner
            .tables
            .get(table)
            .ok_or_else(|| StoreError::MissingTable(table.to_string()))?;
        let found = rows.iter().find(|row| {
            key_columns
                .iter()
                .zip(key_values)
                .all(|(col, value)| row.get(col) == Some(*value))
        });
        Ok(found.cloned())
    }
}

impl SyncSource for InMemoryStore {
    type Session = InMemoryStore;

    fn session(&self) -> StoreResult<Self::Session> {
        Ok(self.clone())
    }
}
