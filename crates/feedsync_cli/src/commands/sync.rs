//! Sync command implementation.

use super::OutputFormat;
use feedsync_protocol::{ChangeRecord, SyncRequest};
use feedsync_server::{ServerConfig, SyncOutcome, SyncServer};
use serde_json::Value;

/// Runs the sync command.
pub fn run(
    config: &ServerConfig,
    last_id: Option<&str>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let format = OutputFormat::parse(format)?;
    let server = SyncServer::from_config(config)?;
    let request = SyncRequest::parse(last_id)?;
    let outcome = server.sync(request)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&outcome.response)?);
        }
        OutputFormat::Text => {
            print!("{}", render_text(request, &outcome));
        }
    }

    Ok(())
}

fn render_text(request: SyncRequest, outcome: &SyncOutcome) -> String {
    let response = &outcome.response;
    let report = &outcome.report;

    let mut out = format!(
        "Sync {} -> {} ({} changes)\n",
        request.last_id,
        response.last_id,
        response.changes.len()
    );
    out.push_str("================\n");
    for change in &response.changes {
        out.push_str(&render_change(change));
        out.push('\n');
    }
    out.push_str(&format!(
        "\nscanned={} delivered={} skipped={} (unregistered={} malformed_key={} missing_row={})\n",
        report.scanned,
        report.delivered,
        report.skipped(),
        report.skipped_unregistered,
        report.skipped_malformed_key,
        report.skipped_missing_row,
    ));
    out
}

fn render_change(change: &ChangeRecord) -> String {
    let mut line = format!(
        "[{:08}] {} {:12} key={}",
        change.log_id,
        change.op,
        change.table,
        Value::Object(change.key.clone())
    );
    if let Some(data) = &change.data {
        line.push_str(&format!(" data={}", Value::Object(data.clone())));
    }
    line
}
