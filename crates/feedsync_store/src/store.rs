//! Storage capability traits.

use crate::error::StoreResult;
use feedsync_protocol::{LogEntry, Row};
use serde_json::Value;

/// Read access to the append-only change log.
///
/// # Invariants
///
/// - `latest_position` is the highest id present, or 0 for an empty log
/// - `entries_after` returns every entry with `id > cursor`, ascending,
///   without holes, even while an upstream writer is appending
pub trait ChangeLogStore {
    /// Returns the highest log id currently present, or 0 if the log is empty.
    fn latest_position(&self) -> StoreResult<u64>;

    /// Returns all entries with `id > cursor` in ascending id order.
    fn entries_after(&self, cursor: u64) -> StoreResult<Vec<LogEntry>>;
}

/// Keyed equality lookup on live tables.
///
/// `table` and `key_columns` must come from a
/// [`KeySchemaRegistry`](feedsync_protocol::KeySchemaRegistry); they are
/// never taken from request input.
pub trait RowResolver {
    /// Returns the current row of `table` whose `key_columns` equal
    /// `key_values` (pairwise, in order), or `None` if no row matches.
    ///
    /// If several rows match, the first in the table's scan order is
    /// returned. A table that does not exist is an error, not `None`.
    fn resolve(
        &self,
        table: &str,
        key_columns: &[String],
        key_values: &[&Value],
    ) -> StoreResult<Option<Row>>;
}

/// Hands out an independent read session per sync request.
pub trait SyncSource: Send + Sync {
    /// Session type holding whatever a single request needs.
    type Session: ChangeLogStore + RowResolver;

    /// Opens a session.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`](crate::StoreError::Unavailable)
    /// if the backing storage does not exist.
    fn session(&self) -> StoreResult<Self::Session>;
}
