//! CLI command implementations.

pub mod dump_log;
pub mod sync;
pub mod tables;

use feedsync_protocol::{KeySchemaRegistry, ProtocolError};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors raised by the CLI itself, before any command runs.
#[derive(Error, Debug)]
pub enum CliError {
    /// `--format` named something other than `text` or `json`.
    #[error("unknown output format '{0}' (expected text or json)")]
    UnknownFormat(String),

    /// The key schema file could not be read.
    #[error("failed to read key schema {path}: {source}")]
    SchemaIo {
        /// Schema file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The key schema file is not a valid registry.
    #[error("invalid key schema {path}: {source}")]
    Schema {
        /// Schema file path.
        path: PathBuf,
        /// Underlying protocol error.
        source: ProtocolError,
    },
}

/// Output format shared by all commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable lines.
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Parses a `--format` value.
    pub fn parse(format: &str) -> Result<Self, CliError> {
        match format.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(CliError::UnknownFormat(format.to_string())),
        }
    }
}

/// Loads the key schema registry from `path`, or falls back to the built-in
/// finance tables.
pub fn load_registry(path: Option<&Path>) -> Result<KeySchemaRegistry, CliError> {
    let Some(path) = path else {
        debug!("using built-in finance key schema");
        return Ok(KeySchemaRegistry::finance());
    };

    let text = std::fs::read_to_string(path).map_err(|source| CliError::SchemaIo {
        path: path.to_path_buf(),
        source,
    })?;
    let registry = KeySchemaRegistry::from_json(&text).map_err(|source| CliError::Schema {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), tables = registry.len(), "loaded key schema");
    Ok(registry)
}
