//! Tables command implementation.

use super::OutputFormat;
use feedsync_protocol::KeySchemaRegistry;
use feedsync_store::SqliteStore;
use serde::Serialize;
use std::path::Path;
use tracing::warn;

/// A registered table as seen in the database.
#[derive(Debug, Serialize)]
pub struct TableInfo {
    /// Table name.
    pub name: String,
    /// Natural-key columns.
    pub key_columns: Vec<String>,
    /// Row count, or `None` if the table is missing from the database.
    pub rows: Option<u64>,
}

/// Runs the tables command.
pub fn run(
    path: &Path,
    log_table: &str,
    registry: &KeySchemaRegistry,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let format = OutputFormat::parse(format)?;
    let store = SqliteStore::open_read_only(path, log_table)?;
    let tables = collect_tables(&store, registry)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&tables)?);
        }
        OutputFormat::Text => {
            println!("Registered tables ({})", tables.len());
            println!("================");
            for table in &tables {
                let rows = table
                    .rows
                    .map_or_else(|| "missing".to_string(), |n| format!("{n} rows"));
                println!(
                    "{:24} [{}] {}",
                    table.name,
                    table.key_columns.join(", "),
                    rows
                );
            }
        }
    }

    Ok(())
}

fn collect_tables(
    store: &SqliteStore,
    registry: &KeySchemaRegistry,
) -> Result<Vec<TableInfo>, Box<dyn std::error::Error>> {
    let mut tables = Vec::with_capacity(registry.len());
    for (name, columns) in registry.iter() {
        let rows = store.row_count(name)?;
        if rows.is_none() {
            warn!(table = name, "registered table is missing from the database");
        }
        tables.push(TableInfo {
            name: name.to_string(),
            key_columns: columns.to_vec(),
            rows,
        });
    }
    Ok(tables)
}
