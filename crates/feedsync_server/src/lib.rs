//! # feedsync Server
//!
//! Cursor-based change feed server.
//!
//! This crate provides:
//! - [`SyncHandler`] - the sync pass over the change log
//! - [`SyncServer`] - request entry point producing a status and JSON body
//! - [`ServerConfig`] - database location and key schema registry
//!
//! # Architecture
//!
//! The server keeps no per-client state. A client sends the highest log id
//! it has applied; the server answers with every change logged after it,
//! each materialized into the row's current data, plus the log's tail
//! position as the next cursor.
//!
//! HTTP routing is left to the embedding application:
//!
//! ```rust,ignore
//! use feedsync_protocol::KeySchemaRegistry;
//! use feedsync_server::{ServerConfig, SyncServer};
//!
//! let config = ServerConfig::new("Finance.db").with_registry(KeySchemaRegistry::finance());
//! let server = SyncServer::from_config(&config)?;
//!
//! // GET /api/Finance/sync?last_id=42
//! let reply = server.handle_query(query.get("last_id").map(String::as_str));
//! respond(reply.status, reply.body);
//! ```
//!
//! # Protocol
//!
//! 1. Read the log tail position (the response cursor)
//! 2. Read entries after the client cursor, ascending
//! 3. Emit deletes as-is; resolve inserts/updates to current row data,
//!    dropping entries that cannot be resolved
//! 4. Return `{ last_id, changes }`

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{SkipReason, SyncHandler, SyncOutcome, SyncReport};
pub use server::{HttpReply, SyncServer};
