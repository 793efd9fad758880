//! SQLite-backed change log and live tables.
//!
//! The change log lives in a table of the same database file as the live
//! tables:
//!
//! ```sql
//! CREATE TABLE sync_log (
//!     id         INTEGER PRIMARY KEY AUTOINCREMENT,
//!     table_name TEXT NOT NULL,
//!     op         TEXT NOT NULL,   -- 'I' | 'U' | 'D'
//!     record_key TEXT NOT NULL    -- JSON object of natural key columns
//! );
//! ```
//!
//! Id assignment is left to SQLite's `AUTOINCREMENT`, which never reuses
//! ids.

use crate::error::{StoreError, StoreResult};
use crate::store::{ChangeLogStore, RowResolver, SyncSource};
use crate::value::{json_to_sql, sql_to_json};
use feedsync_protocol::{is_identifier, parse_record_key, LogEntry, Operation, RecordKey, Row};
use rusqlite::{params, params_from_iter, Connection, OpenFlags, OptionalExtension};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Default name of the change log table.
pub const DEFAULT_LOG_TABLE: &str = "sync_log";

/// Opens a fresh read-only [`SqliteStore`] for every sync request.
#[derive(Debug, Clone)]
pub struct SqliteSource {
    path: PathBuf,
    log_table: String,
    busy_timeout: Duration,
}

impl SqliteSource {
    /// Creates a source for the database at `path` using the default log
    /// table name.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            log_table: DEFAULT_LOG_TABLE.to_string(),
            busy_timeout: Duration::from_secs(5),
        }
    }

    /// Sets the change log table name.
    pub fn with_log_table(mut self, log_table: impl Into<String>) -> StoreResult<Self> {
        let log_table = log_table.into();
        if !is_identifier(&log_table) {
            return Err(StoreError::InvalidIdentifier(log_table));
        }
        self.log_table = log_table;
        Ok(self)
    }

    /// Sets how long a session waits on a locked database.
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Returns the database path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the change log table name.
    pub fn log_table(&self) -> &str {
        &self.log_table
    }
}

impl SyncSource for SqliteSource {
    type Session = SqliteStore;

    fn session(&self) -> StoreResult<Self::Session> {
        let store = SqliteStore::open_read_only(&self.path, &self.log_table)?;
        store.conn.busy_timeout(self.busy_timeout)?;
        Ok(store)
    }
}

/// A connection to a SQLite database holding a change log and live tables.
pub struct SqliteStore {
    conn: Connection,
    log_table: String,
}

impl SqliteStore {
    /// Opens an existing database read-only.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the file does not exist.
    pub fn open_read_only(path: &Path, log_table: &str) -> StoreResult<Self> {
        if !path.is_file() {
            return Err(StoreError::Unavailable(path.to_path_buf()));
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Self::with_connection(conn, log_table)
    }

    /// Opens a database read-write, creating the file if needed.
    ///
    /// This is the writer surface; the sync protocol only reads.
    pub fn open(path: &Path, log_table: &str) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn, log_table)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?, DEFAULT_LOG_TABLE)
    }

    fn with_connection(conn: Connection, log_table: &str) -> StoreResult<Self> {
        if !is_identifier(log_table) {
            return Err(StoreError::InvalidIdentifier(log_table.to_string()));
        }
        Ok(Self {
            conn,
            log_table: log_table.to_string(),
        })
    }

    /// Returns the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Creates the change log table if it does not exist.
    pub fn create_log_table(&self) -> StoreResult<()> {
        self.conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                table_name TEXT NOT NULL,
                op TEXT NOT NULL,
                record_key TEXT NOT NULL
            )",
            self.log_table
        ))?;
        Ok(())
    }

    /// Appends an entry to the change log and returns its id.
    pub fn append(&self, table: &str, op: Operation, key: &RecordKey) -> StoreResult<u64> {
        let record_key = serde_json::to_string(key)?;
        self.conn.execute(
            &format!(
                "INSERT INTO \"{}\" (table_name, op, record_key) VALUES (?1, ?2, ?3)",
                self.log_table
            ),
            params![table, op.code(), record_key],
        )?;
        decode_id(self.conn.last_insert_rowid())
    }

    /// Returns the number of rows in `table`, or `None` if the table does
    /// not exist.
    pub fn row_count(&self, table: &str) -> StoreResult<Option<u64>> {
        check_identifier(table)?;
        let exists: Option<String> = self
            .conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Ok(None);
        }

        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| {
                row.get(0)
            })?;
        Ok(Some(count.max(0) as u64))
    }
}

impl ChangeLogStore for SqliteStore {
    fn latest_position(&self) -> StoreResult<u64> {
        let max: Option<i64> = self.conn.query_row(
            &format!("SELECT MAX(id) FROM \"{}\"", self.log_table),
            [],
            |row| row.get(0),
        )?;
        max.map_or(Ok(0), decode_id)
    }

    fn entries_after(&self, cursor: u64) -> StoreResult<Vec<LogEntry>> {
        let after = i64::try_from(cursor).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, table_name, op, record_key FROM \"{}\" WHERE id > ?1 ORDER BY id ASC",
            self.log_table
        ))?;

        let rows = stmt.query_map([after], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, table_name, op, record_key) = row?;
            entries.push(decode_entry(id, table_name, &op, &record_key)?);
        }
        debug!(cursor, count = entries.len(), "read log entries");
        Ok(entries)
    }
}

impl RowResolver for SqliteStore {
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
        check_identifier(table)?;
        for col in key_columns {
            check_identifier(col)?;
        }

        let bound = key_values
            .iter()
            .map(|v| json_to_sql(v).ok_or_else(|| StoreError::InvalidKeyValue(v.to_string())))
            .collect::<StoreResult<Vec<_>>>()?;

        let predicate = key_columns
            .iter()
            .enumerate()
            .map(|(i, col)| format!("\"{col}\" = ?{}", i + 1))
            .collect::<Vec<_>>()
            .join(" AND ");
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM \"{table}\" WHERE {predicate} LIMIT 1"))?;

        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.query(params_from_iter(bound))?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let mut snapshot = Row::new();
        for (i, name) in names.into_iter().enumerate() {
            snapshot.insert(name, sql_to_json(row.get_ref(i)?)?);
        }
        Ok(Some(snapshot))
    }
}

fn check_identifier(name: &str) -> StoreResult<()> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}

fn decode_id(id: i64) -> StoreResult<u64> {
    u64::try_from(id).map_err(|_| StoreError::Corrupted {
        id,
        reason: "negative log id".into(),
    })
}

fn decode_entry(id: i64, table_name: String, op: &str, record_key: &str) -> StoreResult<LogEntry> {
    let op = Operation::from_code(op).ok_or_else(|| StoreError::Corrupted {
        id,
        reason: format!("unknown op code {op:?}"),
    })?;
    let record_key = parse_record_key(record_key).map_err(|e| StoreError::Corrupted {
        id,
        reason: e.to_string(),
    })?;
    Ok(LogEntry::new(decode_id(id)?, table_name, op, record_key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn obj(value: Value) -> serde_json::Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn price_store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_log_table().unwrap();
        store
            .connection()
            .execute_batch(
                "CREATE TABLE Price (symbol TEXT, date TEXT, price REAL, raw BLOB);
                 INSERT INTO Price VALUES ('X', '2024-01-01', 10.0, x'0102');
                 INSERT INTO Price VALUES ('X', '2024-01-02', 11.5, NULL);",
            )
            .unwrap();
        store
    }

    fn price_key() -> Vec<String> {
        vec!["symbol".to_string(), "date".to_string()]
    }

    #[test]
    fn empty_log() {
        let store = price_store();
        assert_eq!(store.latest_position().unwrap(), 0);
        assert!(store.entries_after(0).unwrap().is_empty());
    }

    #[test]
    fn append_and_read_back() {
        let store = price_store();
        let key = obj(json!({"symbol": "X", "date": "2024-01-01"}));
        let first = store.append("Price", Operation::Insert, &key).unwrap();
        let second = store.append("Price", Operation::Update, &key).unwrap();

        assert_eq!((first, second), (1, 2));
        assert_eq!(store.latest_position().unwrap(), 2);

        let entries = store.entries_after(1).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, 2);
        assert_eq!(entries[0].op, Operation::Update);
        assert_eq!(entries[0].record_key, key);
    }

    #[test]
    fn resolve_row_snapshot() {
        let store = price_store();
        let row = store
            .resolve("Price", &price_key(), &[&json!("X"), &json!("2024-01-01")])
            .unwrap()
            .unwrap();

        assert_eq!(
            Value::Object(row),
            json!({"symbol": "X", "date": "2024-01-01", "price": 10.0, "raw": "AQI="})
        );
    }

    #[test]
    fn resolve_missing_row() {
        let store = price_store();
        let found = store
            .resolve("Price", &price_key(), &[&json!("Y"), &json!("2024-01-01")])
            .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn resolve_rejects_bad_identifiers() {
        let store = price_store();
        let err = store
            .resolve("Price\" --", &["symbol".to_string()], &[&json!("X")])
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidIdentifier(_)));
    }

    #[test]
    fn resolve_missing_table_is_error() {
        let store = price_store();
        let err = store
            .resolve("Volume", &["symbol".to_string()], &[&json!("X")])
            .unwrap_err();
        assert!(matches!(err, StoreError::Sqlite(_)));
    }

    #[test]
    fn resolve_rejects_text_that_is_not_utf8() {
        let store = price_store();
        store
            .connection()
            .execute_batch(
                "CREATE TABLE Note (symbol TEXT, note TEXT);
                 INSERT INTO Note VALUES ('X', CAST(x'ff41' AS TEXT));",
            )
            .unwrap();

        let err = store
            .resolve("Note", &["symbol".to_string()], &[&json!("X")])
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidText(_)));
    }

    #[test]
    fn corrupted_entries() {
        let store = price_store();
        store
            .connection()
            .execute(
                "INSERT INTO sync_log (table_name, op, record_key) VALUES ('Price', 'X', '{}')",
                [],
            )
            .unwrap();
        let err = store.entries_after(0).unwrap_err();
        assert!(matches!(err, StoreError::Corrupted { id: 1, .. }));

        store.connection().execute("DELETE FROM sync_log", []).unwrap();
        store
            .connection()
            .execute(
                "INSERT INTO sync_log (table_name, op, record_key) VALUES ('Price', 'I', 'nope')",
                [],
            )
            .unwrap();
        assert!(matches!(
            store.entries_after(0),
            Err(StoreError::Corrupted { .. })
        ));
    }

    #[test]
    fn row_count() {
        let store = price_store();
        assert_eq!(store.row_count("Price").unwrap(), Some(2));
        assert_eq!(store.row_count("Volume").unwrap(), None);
    }

    #[test]
    fn source_missing_file_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let source = SqliteSource::new(dir.path().join("missing.db"));
        let err = source.session().err().unwrap();
        assert!(err.is_unavailable());
    }

    #[test]
    fn source_opens_read_only_sessions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("feed.db");
        {
            let writer = SqliteStore::open(&path, DEFAULT_LOG_TABLE).unwrap();
            writer.create_log_table().unwrap();
            writer
                .append("Price", Operation::Delete, &obj(json!({"symbol": "X"})))
                .unwrap();
        }

        let session = SqliteSource::new(&path).session().unwrap();
        assert_eq!(session.latest_position().unwrap(), 1);
        assert!(session
            .append("Price", Operation::Delete, &obj(json!({"symbol": "Y"})))
            .is_err());
    }

    #[test]
    fn custom_log_table() {
        assert!(SqliteSource::new("x.db").with_log_table("changes").is_ok());
        assert!(SqliteSource::new("x.db").with_log_table("bad name").is_err());
    }
}
