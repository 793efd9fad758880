//! # feedsync Protocol
//!
//! Wire types and pure logic for the feedsync change-data-capture protocol.
//!
//! This crate provides:
//! - [`LogEntry`] and [`Operation`] for change log records
//! - [`ChangeRecord`] for the server → client wire shape
//! - [`SyncRequest`] / [`SyncResponse`] / [`ErrorBody`] messages
//! - [`KeySchemaRegistry`] mapping tables to their natural-key columns
//! - [`Replica`] for replaying change records on the client side
//!
//! This is a pure protocol crate with no I/O operations.
//!
//! ## Wire format
//!
//! ```text
//! { "last_id": 42,
//!   "changes": [ { "log_id": 41, "table": "Price", "op": "U",
//!                  "key": {"symbol": "X", "date": "2024-01-01"},
//!                  "data": {"symbol": "X", "date": "2024-01-01", "price": 10} } ] }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod change;
mod entry;
mod error;
mod messages;
mod operation;
mod replica;
mod schema;

pub use change::ChangeRecord;
pub use entry::{parse_record_key, LogEntry, RecordKey, Row};
pub use error::{ProtocolError, ProtocolResult};
pub use messages::{ErrorBody, SyncRequest, SyncResponse};
pub use operation::Operation;
pub use replica::Replica;
pub use schema::{is_identifier, KeySchemaRegistry, KeySchemaRegistryBuilder};

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
