//! # feedsync Store
//!
//! Storage traits and backends for the feedsync change feed.
//!
//! The sync protocol needs two read capabilities from its storage engine:
//! - [`ChangeLogStore`] - id-ordered reads of the append-only change log
//! - [`RowResolver`] - keyed equality lookups on live tables
//!
//! A [`SyncSource`] hands out one read session per request. Sessions hold
//! no state shared with other requests.
//!
//! ## Available Backends
//!
//! - [`InMemoryStore`] - For testing and embedding
//! - [`SqliteSource`] / [`SqliteStore`] - SQLite database file
//!
//! ## Example
//!
//! ```rust
//! use feedsync_protocol::Operation;
//! use feedsync_store::{ChangeLogStore, InMemoryStore};
//! use serde_json::json;
//!
//! let store = InMemoryStore::new();
//! let key = json!({"symbol": "X"}).as_object().cloned().unwrap();
//! store.append("Price", Operation::Insert, key);
//!
//! assert_eq!(store.latest_position().unwrap(), 1);
//! assert_eq!(store.entries_after(0).unwrap().len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod error;
mod memory;
mod sqlite;
mod store;
mod value;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use sqlite::{SqliteSource, SqliteStore, DEFAULT_LOG_TABLE};
pub use store::{ChangeLogStore, RowResolver, SyncSource};
pub use value::{json_to_sql, sql_to_json};
