//! Dump change log command implementation.

use super::OutputFormat;
use feedsync_protocol::{KeySchemaRegistry, LogEntry};
use feedsync_store::{ChangeLogStore, SqliteStore};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

/// Change log entry representation for output.
#[derive(Debug, Serialize)]
pub struct LogEntryInfo {
    /// Log id.
    pub id: u64,
    /// Table the mutation touched.
    pub table: String,
    /// Operation code (`I`, `U`, `D`).
    pub op: String,
    /// Stored record key.
    pub key: Value,
    /// Whether the table is in the key schema registry.
    pub registered: bool,
    /// Whether the record key covers every registered key column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_complete: Option<bool>,
}

impl LogEntryInfo {
    fn new(entry: LogEntry, registry: &KeySchemaRegistry) -> Self {
        let columns = registry.key_columns(&entry.table_name);
        let key_complete = columns.map(|columns| entry.key_values(columns).is_some());
        Self {
            id: entry.id,
            op: entry.op.code().to_string(),
            registered: columns.is_some(),
            key_complete,
            key: Value::Object(entry.record_key),
            table: entry.table_name,
        }
    }
}

/// Runs the dump-log command.
pub fn run(
    path: &Path,
    log_table: &str,
    registry: &KeySchemaRegistry,
    after: u64,
    limit: Option<usize>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let format = OutputFormat::parse(format)?;
    let store = SqliteStore::open_read_only(path, log_table)?;
    let tail = store.latest_position()?;
    let entries = read_entries(&store, registry, after, limit)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        OutputFormat::Text => {
            print_text_output(tail, &entries);
        }
    }

    Ok(())
}

fn read_entries(
    store: &dyn ChangeLogStore,
    registry: &KeySchemaRegistry,
    after: u64,
    limit: Option<usize>,
) -> Result<Vec<LogEntryInfo>, Box<dyn std::error::Error>> {
    let max_entries = limit.unwrap_or(usize::MAX);
    Ok(store
        .entries_after(after)?
        .into_iter()
        .take(max_entries)
        .map(|entry| LogEntryInfo::new(entry, registry))
        .collect())
}

fn print_text_output(tail: u64, entries: &[LogEntryInfo]) {
    println!("Change Log ({} shown, tail={})", entries.len(), tail);
    println!("================");
    println!();

    for entry in entries {
        print!("[{:08}] {} {:12} key={}", entry.id, entry.op, entry.table, entry.key);
        if !entry.registered {
            print!(" (unregistered)");
        }
        if entry.key_complete == Some(false) {
            print!(" (malformed key)");
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedsync_protocol::Operation;
    use feedsync_store::InMemoryStore;
    use serde_json::json;

    fn obj(value: Value) -> serde_json::Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn store() -> InMemoryStore {
        let store = InMemoryStore::new();
        store.append("Price", Operation::Insert, obj(json!({"symbol": "X", "date": "d"})));
        store.append("Volume", Operation::Insert, obj(json!({"symbol": "X"})));
        store.append("Price", Operation::Update, obj(json!({"symbol": "X"})));
        store
    }

    #[test]
    fn entries_are_annotated() {
        let registry = KeySchemaRegistry::new([("Price", vec!["symbol", "date"])]).unwrap();
        let entries = read_entries(&store(), &registry, 0, None).unwrap();

        assert_eq!(entries.len(), 3);
        assert!(entries[0].registered);
        assert_eq!(entries[0].key_complete, Some(true));
        assert!(!entries[1].registered);
        assert_eq!(entries[1].key_complete, None);
        assert_eq!(entries[2].op, "U");
        assert_eq!(entries[2].key_complete, Some(false));
    }

    #[test]
    fn after_and_limit() {
        let registry = KeySchemaRegistry::default();
        let entries = read_entries(&store(), &registry, 1, Some(1)).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, 2);
    }

    #[test]
    fn json_shape() {
        let registry = KeySchemaRegistry::default();
        let entries = read_entries(&store(), &registry, 1, Some(1)).unwrap();
        let value = serde_json::to_value(&entries).unwrap();

        assert_eq!(
            value,
            json!([{"id": 2, "table": "Volume", "op": "I",
                    "key": {"symbol": "X"}, "registered": false}])
        );
    }
}
