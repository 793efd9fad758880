//! The sync pass over the change log.

use crate::error::ServerResult;
use feedsync_protocol::{
    ChangeRecord, KeySchemaRegistry, LogEntry, Operation, SyncRequest, SyncResponse,
};
use feedsync_store::{ChangeLogStore, RowResolver};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Why a log entry was left out of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The entry's table has no registered key schema.
    UnregisteredTable,
    /// The record key lacks a key column, or has a null or compound value.
    MalformedKey,
    /// The row no longer exists in the live table.
    MissingRow,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::UnregisteredTable => "table has no registered key schema",
            SkipReason::MalformedKey => "record key does not match key schema",
            SkipReason::MissingRow => "row no longer exists",
        })
    }
}

/// Counters describing one sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Entries read after the client cursor, up to the tail.
    pub scanned: usize,
    /// Change records emitted.
    pub delivered: usize,
    /// Entries dropped for an unregistered table.
    pub skipped_unregistered: usize,
    /// Entries dropped for a malformed record key.
    pub skipped_malformed_key: usize,
    /// Entries dropped because the row was gone.
    pub skipped_missing_row: usize,
}

impl SyncReport {
    /// Total number of dropped entries.
    pub fn skipped(&self) -> usize {
        self.skipped_unregistered + self.skipped_malformed_key + self.skipped_missing_row
    }

    fn record_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::UnregisteredTable => self.skipped_unregistered += 1,
            SkipReason::MalformedKey => self.skipped_malformed_key += 1,
            SkipReason::MissingRow => self.skipped_missing_row += 1,
        }
    }
}

/// Result of a sync pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutcome {
    /// Wire response for the client.
    pub response: SyncResponse,
    /// Pass statistics.
    pub report: SyncReport,
}

enum Resolution {
    Emit(ChangeRecord),
    Skip(SkipReason),
}

/// Runs the sync pass against a store.
///
/// The handler holds only the immutable key schema registry and can be
/// shared across threads.
#[derive(Debug, Clone)]
pub struct SyncHandler {
    registry: Arc<KeySchemaRegistry>,
}

impl SyncHandler {
    /// Creates a new handler.
    pub fn new(registry: Arc<KeySchemaRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the key schema registry.
    pub fn registry(&self) -> &KeySchemaRegistry {
        &self.registry
    }

    /// Serves one sync request.
    ///
    /// The returned `last_id` is the log tail read before any entries,
    /// never the client's cursor. Entries appended after that read are left
    /// for the next sync so nothing is delivered twice.
    ///
    /// # Errors
    ///
    /// Any storage failure fails the whole request; no partial response is
    /// produced.
    pub fn sync<S>(&self, store: &S, request: SyncRequest) -> ServerResult<SyncOutcome>
    where
        S: ChangeLogStore + RowResolver + ?Sized,
    {
        let latest = store.latest_position()?;
        let entries = store.entries_after(request.last_id)?;

        let mut report = SyncReport::default();
        let mut changes = Vec::new();

        for entry in entries.into_iter().take_while(|e| e.id <= latest) {
            report.scanned += 1;
            let (log_id, table) = (entry.id, entry.table_name.clone());

            match self.resolve_entry(store, entry)? {
                Resolution::Emit(record) => {
                    debug!(log_id, table = %table, op = %record.op, "emitting change");
                    changes.push(record);
                }
                Resolution::Skip(reason) => {
                    if reason == SkipReason::MissingRow {
                        debug!(log_id, table = %table, "dropping entry: {reason}");
                    } else {
                        warn!(log_id, table = %table, "dropping entry: {reason}");
                    }
                    report.record_skip(reason);
                }
            }
        }

        report.delivered = changes.len();
        info!(
            cursor = request.last_id,
            last_id = latest,
            scanned = report.scanned,
            delivered = report.delivered,
            skipped = report.skipped(),
            "sync complete"
        );

        Ok(SyncOutcome {
            response: SyncResponse::new(latest, changes),
            report,
        })
    }

    fn resolve_entry<S>(&self, store: &S, entry: LogEntry) -> ServerResult<Resolution>
    where
        S: RowResolver + ?Sized,
    {
        if entry.op == Operation::Delete {
            return Ok(Resolution::Emit(ChangeRecord::without_data(entry)));
        }

        let Some(columns) = self.registry.key_columns(&entry.table_name) else {
            return Ok(Resolution::Skip(SkipReason::UnregisteredTable));
        };
        let Some(values) = entry.key_values(columns) else {
            return Ok(Resolution::Skip(SkipReason::MalformedKey));
        };

        let row = store.resolve(&entry.table_name, columns, &values)?;
        Ok(match row {
            Some(row) => Resolution::Emit(ChangeRecord::with_data(entry, row)),
            None => Resolution::Skip(SkipReason::MissingRow),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServerError;
    use feedsync_protocol::{RecordKey, Replica, Row};
    use feedsync_store::{InMemoryStore, StoreError, StoreResult};
    use serde_json::{json, Value};

    fn obj(value: Value) -> serde_json::Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn handler() -> SyncHandler {
        let registry = KeySchemaRegistry::new([("Price", vec!["symbol", "date"])]).unwrap();
        SyncHandler::new(Arc::new(registry))
    }

    fn price_key(symbol: &str) -> RecordKey {
        obj(json!({"symbol": symbol, "date": "2024-01-01"}))
    }

    fn price_row(symbol: &str, price: i64) -> Row {
        obj(json!({"symbol": symbol, "date": "2024-01-01", "price": price}))
    }

    fn sync(store: &InMemoryStore, last_id: u64) -> SyncOutcome {
        handler().sync(store, SyncRequest::new(last_id)).unwrap()
    }

    fn log_ids(outcome: &SyncOutcome) -> Vec<u64> {
        outcome.response.changes.iter().map(|c| c.log_id).collect()
    }

    #[test]
    fn empty_log() {
        let store = InMemoryStore::new();
        let outcome = sync(&store, 0);

        assert_eq!(outcome.response.last_id, 0);
        assert!(outcome.response.changes.is_empty());
    }

    #[test]
    fn insert_then_update_both_carry_current_row() {
        let store = InMemoryStore::new();
        store.insert_row("Price", price_row("X", 10));
        store.append("Price", Operation::Insert, price_key("X"));
        store.append("Price", Operation::Update, price_key("X"));

        let outcome = sync(&store, 0);
        let response = &outcome.response;

        assert_eq!(response.last_id, 2);
        assert_eq!(log_ids(&outcome), vec![1, 2]);
        assert_eq!(response.changes[0].op, Operation::Insert);
        assert_eq!(response.changes[1].op, Operation::Update);
        for change in &response.changes {
            assert_eq!(change.key, price_key("X"));
            assert_eq!(change.data.as_ref(), Some(&price_row("X", 10)));
        }
    }

    #[test]
    fn no_gap_delivery() {
        let store = InMemoryStore::new();
        store.insert_row("Price", price_row("X", 1));
        for id in [5, 6, 7] {
            store
                .append_with_id(id, "Price", Operation::Update, price_key("X"))
                .unwrap();
        }

        let outcome = sync(&store, 4);
        assert_eq!(log_ids(&outcome), vec![5, 6, 7]);
        assert_eq!(outcome.response.last_id, 7);
    }

    #[test]
    fn cursor_is_tail_not_client_value() {
        let store = InMemoryStore::new();
        store.append("Price", Operation::Delete, price_key("X"));

        // A client claiming to be ahead of the log gets the real tail back.
        let outcome = sync(&store, 50);
        assert_eq!(outcome.response.last_id, 1);
        assert!(outcome.response.changes.is_empty());
    }

    #[test]
    fn delete_has_no_data_and_needs_no_lookup() {
        let store = InMemoryStore::new();
        store.append("Unregistered", Operation::Delete, obj(json!({"id": 1})));

        let outcome = sync(&store, 0);
        assert_eq!(outcome.response.changes.len(), 1);
        let change = &outcome.response.changes[0];
        assert_eq!(change.op, Operation::Delete);
        assert!(change.data.is_none());
    }

    #[test]
    fn unregistered_table_is_skipped() {
        let store = InMemoryStore::new();
        store.insert_row("Price", price_row("X", 1));
        store.insert_row("Volume", obj(json!({"symbol": "X"})));
        store.append("Volume", Operation::Insert, obj(json!({"symbol": "X"})));
        store.append("Price", Operation::Insert, price_key("X"));

        let outcome = sync(&store, 0);
        assert_eq!(log_ids(&outcome), vec![2]);
        assert_eq!(outcome.response.last_id, 2);
        assert_eq!(outcome.report.skipped_unregistered, 1);
    }

    #[test]
    fn malformed_key_is_skipped() {
        let store = InMemoryStore::new();
        store.insert_row("Price", price_row("X", 1));
        store.append("Price", Operation::Update, obj(json!({"symbol": "X"})));
        store.append(
            "Price",
            Operation::Update,
            obj(json!({"symbol": "X", "date": null})),
        );
        store.append("Price", Operation::Update, price_key("X"));

        let outcome = sync(&store, 0);
        assert_eq!(log_ids(&outcome), vec![3]);
        assert_eq!(outcome.report.skipped_malformed_key, 2);
    }

    #[test]
    fn vanished_row_is_skipped() {
        let store = InMemoryStore::new();
        store.create_table("Price");
        store.append("Price", Operation::Insert, price_key("X"));

        let outcome = sync(&store, 0);
        assert!(outcome.response.changes.is_empty());
        assert_eq!(outcome.response.last_id, 1);
        assert_eq!(outcome.report.skipped_missing_row, 1);
    }

    #[test]
    fn registered_table_never_created_fails_request() {
        let store = InMemoryStore::new();
        store.append("Price", Operation::Insert, price_key("X"));

        let err = handler().sync(&store, SyncRequest::new(0)).unwrap_err();
        assert!(matches!(err, ServerError::Storage(StoreError::MissingTable(_))));
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn resurrection_immunity() {
        let store = InMemoryStore::new();
        store.insert_row("Price", price_row("X", 10));
        store.append("Price", Operation::Insert, price_key("X"));
        store.delete_rows("Price", &price_key("X"));
        store.append("Price", Operation::Delete, price_key("X"));

        let outcome = sync(&store, 0);
        assert_eq!(log_ids(&outcome), vec![2]);
        assert_eq!(outcome.response.changes[0].op, Operation::Delete);

        let mut replica = Replica::new();
        replica.apply(&outcome.response);
        assert!(replica.get("Price", &price_key("X")).is_none());
    }

    #[test]
    fn idempotent_empty_tail() {
        let store = InMemoryStore::new();
        store.insert_row("Price", price_row("X", 10));
        store.append("Price", Operation::Insert, price_key("X"));

        let first = sync(&store, 0);
        assert_eq!(first.response.changes.len(), 1);

        let second = sync(&store, first.response.last_id);
        assert!(second.response.changes.is_empty());
        assert_eq!(second.response.last_id, first.response.last_id);
    }

    #[test]
    fn report_counts() {
        let store = InMemoryStore::new();
        store.insert_row("Price", price_row("X", 1));
        store.append("Price", Operation::Insert, price_key("X"));
        store.append("Price", Operation::Insert, price_key("Y"));
        store.append("Other", Operation::Update, obj(json!({"id": 1})));
        store.append("Price", Operation::Delete, price_key("Z"));

        let report = sync(&store, 0).report;
        assert_eq!(report.scanned, 4);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.skipped(), 2);
        assert_eq!(report.skipped_missing_row, 1);
        assert_eq!(report.skipped_unregistered, 1);
    }

    /// Store whose log grows between the tail read and the entry read.
    struct RacingStore {
        inner: InMemoryStore,
    }

    impl ChangeLogStore for RacingStore {
        fn latest_position(&self) -> StoreResult<u64> {
            let latest = self.inner.latest_position()?;
            self.inner.append("Price", Operation::Delete, price_key("late"));
            Ok(latest)
        }

        fn entries_after(&self, cursor: u64) -> StoreResult<Vec<LogEntry>> {
            self.inner.entries_after(cursor)
        }
    }

    impl RowResolver for RacingStore {
        fn resolve(
            &self,
            table: &str,
            key_columns: &[String],
            key_values: &[&Value],
        ) -> StoreResult<Option<Row>> {
            self.inner.resolve(table, key_columns, key_values)
        }
    }

    #[test]
    fn entries_beyond_tail_wait_for_next_sync() {
        let store = RacingStore {
            inner: InMemoryStore::new(),
        };
        store.inner.append("Price", Operation::Delete, price_key("X"));

        let first = handler().sync(&store, SyncRequest::new(0)).unwrap();
        assert_eq!(first.response.last_id, 1);
        assert_eq!(log_ids(&first), vec![1]);

        let second = handler()
            .sync(&store.inner, SyncRequest::new(first.response.last_id))
            .unwrap();
        assert_eq!(log_ids(&second), vec![2]);
    }

    /// Store whose row lookups always fail.
    struct BrokenResolver {
        inner: InMemoryStore,
    }

    impl ChangeLogStore for BrokenResolver {
        fn latest_position(&self) -> StoreResult<u64> {
            self.inner.latest_position()
        }

        fn entries_after(&self, cursor: u64) -> StoreResult<Vec<LogEntry>> {
            self.inner.entries_after(cursor)
        }
    }

    impl RowResolver for BrokenResolver {
        fn resolve(&self, _: &str, _: &[String], _: &[&Value]) -> StoreResult<Option<Row>> {
            Err(StoreError::Io(std::io::Error::other("disk gone")))
        }
    }

    #[test]
    fn resolution_failure_fails_request() {
        let store = BrokenResolver {
            inner: InMemoryStore::new(),
        };
        store.inner.append("Price", Operation::Insert, price_key("X"));

        let err = handler().sync(&store, SyncRequest::new(0)).unwrap_err();
        assert!(matches!(err, ServerError::Storage(_)));
        assert_eq!(err.status_code(), 500);
    }
}
