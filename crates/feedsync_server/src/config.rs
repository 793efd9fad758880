//! Server configuration.

use feedsync_protocol::KeySchemaRegistry;
use feedsync_store::{SqliteSource, StoreResult, DEFAULT_LOG_TABLE};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for the sync server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path of the SQLite database holding the change log and live tables.
    pub database_path: PathBuf,
    /// Name of the change log table.
    pub log_table: String,
    /// How long a request waits on a locked database.
    pub busy_timeout: Duration,
    /// Natural-key columns per synced table.
    pub registry: Arc<KeySchemaRegistry>,
}

impl ServerConfig {
    /// Creates a new server configuration using the built-in finance key
    /// schema. Replace it with [`with_registry`](Self::with_registry).
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            log_table: DEFAULT_LOG_TABLE.to_string(),
            busy_timeout: Duration::from_secs(5),
            registry: Arc::new(KeySchemaRegistry::finance()),
        }
    }

    /// Sets the change log table name.
    pub fn with_log_table(mut self, log_table: impl Into<String>) -> Self {
        self.log_table = log_table.into();
        self
    }

    /// Sets the busy timeout.
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Sets the key schema registry.
    pub fn with_registry(mut self, registry: KeySchemaRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Builds the SQLite source described by this configuration.
    pub fn sqlite_source(&self) -> StoreResult<SqliteSource> {
        Ok(SqliteSource::new(&self.database_path)
            .with_log_table(&self.log_table)?
            .with_busy_timeout(self.busy_timeout))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("Resources/Finance/Finance.db"))
    }
}
