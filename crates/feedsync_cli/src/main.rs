//! feedsync CLI
//!
//! Command-line tools for a feedsync SQLite database.
//!
//! # Commands
//!
//! - `sync` - Run one sync pass from a cursor and print the response
//! - `dump-log` - Dump change log entries for debugging
//! - `tables` - List registered tables with their key columns
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use feedsync_server::ServerConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// feedsync command-line tools.
#[derive(Parser)]
#[command(name = "feedsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the SQLite database file
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// JSON file mapping tables to their natural-key columns
    #[arg(global = true, short, long)]
    schema: Option<PathBuf>,

    /// Name of the change log table
    #[arg(global = true, long, default_value = feedsync_store::DEFAULT_LOG_TABLE)]
    log_table: String,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sync pass and print the response
    Sync {
        /// Client cursor (defaults to 0)
        #[arg(short, long)]
        last_id: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "json")]
        format: String,
    },

    /// Dump change log entries for debugging
    DumpLog {
        /// Only show entries after this id
        #[arg(short, long, default_value = "0")]
        after: u64,

        /// Maximum number of entries to dump
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List registered tables and their row counts
    Tables {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let path = cli
        .path
        .unwrap_or_else(|| ServerConfig::default().database_path);

    match cli.command {
        Commands::Sync { last_id, format } => {
            let registry = commands::load_registry(cli.schema.as_deref())?;
            let config = ServerConfig::new(&path)
                .with_log_table(cli.log_table)
                .with_registry(registry);
            commands::sync::run(&config, last_id.as_deref(), &format)?;
        }
        Commands::DumpLog {
            after,
            limit,
            format,
        } => {
            let registry = commands::load_registry(cli.schema.as_deref())?;
            commands::dump_log::run(&path, &cli.log_table, &registry, after, limit, &format)?;
        }
        Commands::Tables { format } => {
            let registry = commands::load_registry(cli.schema.as_deref())?;
            commands::tables::run(&path, &cli.log_table, &registry, &format)?;
        }
        Commands::Version => {
            println!("feedsync CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("feedsync protocol v{}", feedsync_protocol::VERSION);
        }
    }

    Ok(())
}
