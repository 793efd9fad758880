//! Table key schema registry.
//!
//! Maps each synced table to the ordered list of columns forming its
//! natural key. The registry is built once at startup and never mutated;
//! every table and column name in it is validated as a plain SQL
//! identifier, so storage backends may quote and embed them in queries.

use crate::error::{ProtocolError, ProtocolResult};
use serde_json::Value;
use std::collections::BTreeMap;

/// Tables of the original finance deployment keyed by `(name, date)`.
const FINANCE_NAME_DATE_TABLES: &[&str] = &[
    "Earning",
    "Energy",
    "Commodities",
    "Indices",
    "Crypto",
    "Currencies",
    "Bonds",
    "Basic_Materials",
    "Communication_Services",
    "Consumer_Cyclical",
    "Consumer_Defensive",
    "Financial_Services",
    "Utilities",
    "Real_Estate",
    "Industrials",
    "Healthcare",
    "Technology",
    "Economics",
    "ETFs",
];

/// Immutable mapping from table name to natural-key columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySchemaRegistry {
    tables: BTreeMap<String, Vec<String>>,
}

impl KeySchemaRegistry {
    /// Creates a registry from `(table, key_columns)` pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if a name is not a plain identifier, a table has no
    /// key columns, or a table appears twice.
    pub fn new<I, T, C>(tables: I) -> ProtocolResult<Self>
    where
        I: IntoIterator<Item = (T, Vec<C>)>,
        T: Into<String>,
        C: Into<String>,
    {
        let mut builder = Self::builder();
        for (table, columns) in tables {
            builder = builder.table(table, columns);
        }
        builder.build()
    }

    /// Returns a builder.
    pub fn builder() -> KeySchemaRegistryBuilder {
        KeySchemaRegistryBuilder::default()
    }

    /// Loads a registry from a JSON object `{"Table": ["col", ...], ...}`.
    pub fn from_json(text: &str) -> ProtocolResult<Self> {
        let value: Value = serde_json::from_str(text)?;
        let object = value.as_object().ok_or_else(|| {
            ProtocolError::InvalidSchema("expected a JSON object of table -> key columns".into())
        })?;

        let mut builder = Self::builder();
        for (table, columns) in object {
            let columns: Vec<String> = serde_json::from_value(columns.clone())?;
            builder = builder.table(table.as_str(), columns);
        }
        builder.build()
    }

    /// The table set of the original finance deployment.
    pub fn finance() -> Self {
        let mut tables: BTreeMap<String, Vec<String>> = FINANCE_NAME_DATE_TABLES
            .iter()
            .map(|t| (t.to_string(), vec!["name".to_string(), "date".to_string()]))
            .collect();
        tables.insert("MNSPP".to_string(), vec!["symbol".to_string()]);
        Self { tables }
    }

    /// Returns the key columns for `table`, or `None` if it is not registered.
    pub fn key_columns(&self, table: &str) -> Option<&[String]> {
        self.tables.get(table).map(Vec::as_slice)
    }

    /// Returns true if `table` is registered.
    pub fn contains(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    /// Iterates registered tables in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.tables.iter().map(|(t, c)| (t.as_str(), c.as_slice()))
    }

    /// Returns the number of registered tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns true if no tables are registered.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Builder for [`KeySchemaRegistry`].
///
/// Validation is deferred to [`build`](Self::build) so that the first
/// offending entry is reported.
#[derive(Debug, Default)]
pub struct KeySchemaRegistryBuilder {
    tables: Vec<(String, Vec<String>)>,
}

impl KeySchemaRegistryBuilder {
    /// Registers a table and its key columns.
    pub fn table<T, C>(mut self, table: T, columns: Vec<C>) -> Self
    where
        T: Into<String>,
        C: Into<String>,
    {
        self.tables
            .push((table.into(), columns.into_iter().map(Into::into).collect()));
        self
    }

    /// Validates and builds the registry.
    pub fn build(self) -> ProtocolResult<KeySchemaRegistry> {
        let mut tables = BTreeMap::new();
        for (table, columns) in self.tables {
            if !is_identifier(&table) {
                return Err(ProtocolError::InvalidIdentifier(table));
            }
            if columns.is_empty() {
                return Err(ProtocolError::EmptyKey(table));
            }
            if let Some(bad) = columns.iter().find(|c| !is_identifier(c)) {
                return Err(ProtocolError::InvalidIdentifier(bad.clone()));
            }
            if tables.contains_key(&table) {
                return Err(ProtocolError::DuplicateTable(table));
            }
            tables.insert(table, columns);
        }
        Ok(KeySchemaRegistry { tables })
    }
}

/// Returns true if `name` matches `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
