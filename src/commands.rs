//! Command execution.

use chrono::{DateTime, SecondsFormat};
use colored::Colorize;
use framelog_wal::recovery::verify_log;
use framelog_wal::{LogFile, RawCodec, Record, RecoveryStatus, Wal, WalConfig};
use serde_json::{json, Value};
use std::path::Path;

/// Appends a value. JSON values are validated and stored compact; raw
/// values are stored as their UTF-8 bytes.
pub fn append(
    wal: &mut Wal<RawCodec>,
    value: &str,
    raw: bool,
) -> Result<String, Box<dyn std::error::Error>> {
    let payload = if raw {
        value.as_bytes().to_vec()
    } else {
        serde_json::to_vec(&parse_json_arg(value)?)?
    };

    let timestamp = wal.append(&payload)?;
    Ok(format!(
        "{} {} bytes at {}",
        "Appended".green(),
        payload.len(),
        format_timestamp(timestamp).cyan()
    ))
}

/// Opens an existing log without repairing it. A missing file is an error
/// rather than being created.
pub fn open_existing(config: WalConfig) -> Result<Wal<RawCodec>, Box<dyn std::error::Error>> {
    if !config.path.is_file() {
        return Err(format!("log file '{}' does not exist", config.path.display()).into());
    }
    Ok(Wal::open(config.with_repair_on_open(false), RawCodec)?)
}

/// Recovers every record and renders them, followed by the recovery status.
pub fn dump(wal: &mut Wal<RawCodec>, as_json: bool) -> Result<String, Box<dyn std::error::Error>> {
    let recovery = wal.recover()?;
    let mut lines = Vec::with_capacity(recovery.records.len() + 1);

    if as_json {
        for record in &recovery.records {
            lines.push(record_json(record).to_string());
        }
        lines.push(
            json!({
                "status": recovery.status.to_string(),
                "records": recovery.records.len(),
            })
            .to_string(),
        );
    } else {
        if recovery.records.is_empty() {
            lines.push("No records".yellow().to_string());
        }
        for record in &recovery.records {
            lines.push(format!(
                "{}  {}",
                format_timestamp(record.timestamp).cyan(),
                render_payload(&record.value)
            ));
        }
        lines.push(format!(
            "{} records, {}",
            recovery.records.len(),
            format_status(&recovery.status)
        ));
    }

    Ok(lines.join("\n"))
}

/// Scans the log read-only. Returns the report and whether the log is clean.
pub fn verify(path: &Path) -> Result<(String, bool), Box<dyn std::error::Error>> {
    let outcome = verify_log(path)?;
    let file_len = std::fs::metadata(path)?.len();

    let report = [
        format!("{} {}", "Log:".bold(), path.display()),
        format!("  Frames:      {}", outcome.frames.len()),
        format!("  Valid bytes: {}", outcome.valid_len),
        format!("  File bytes:  {}", file_len),
        format!("  Status:      {}", format_status(&outcome.status)),
    ]
    .join("\n");

    Ok((report, outcome.status.is_complete()))
}

/// Truncates everything after the last valid frame.
pub fn repair(wal: &mut Wal<RawCodec>) -> Result<String, Box<dyn std::error::Error>> {
    let status = wal.open_status().clone();
    let discarded = wal.repair()?;
    if discarded == 0 {
        return Ok(format!("{} nothing to repair", "OK:".green()));
    }
    Ok(format!(
        "{} discarded {} bytes ({})",
        "Repaired:".yellow(),
        discarded,
        format_status(&status)
    ))
}

/// Deletes the log file.
pub fn remove(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    LogFile::delete(path)?;
    Ok(format!("{} {}", "Removed".green(), path.display()))
}

/// Parses a JSON argument, supporting @file syntax.
fn parse_json_arg(arg: &str) -> Result<Value, Box<dyn std::error::Error>> {
    if let Some(path) = arg.strip_prefix('@') {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    } else {
        Ok(serde_json::from_str(arg)?)
    }
}

/// Decodes a payload for display: JSON when it parses, lossy text otherwise.
fn payload_value(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

fn render_payload(bytes: &[u8]) -> String {
    match payload_value(bytes) {
        Value::String(s) if serde_json::from_slice::<Value>(bytes).is_err() => s,
        other => other.to_string(),
    }
}

fn record_json(record: &Record<Vec<u8>>) -> Value {
    json!({
        "timestamp": record.timestamp,
        "time": format_timestamp(record.timestamp),
        "payload": payload_value(&record.value),
    })
}

fn format_timestamp(micros: u64) -> String {
    i64::try_from(micros)
        .ok()
        .and_then(DateTime::from_timestamp_micros)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Micros, true))
        .unwrap_or_else(|| micros.to_string())
}

fn format_status(status: &RecoveryStatus) -> String {
    match status {
        RecoveryStatus::Complete => "complete".green().to_string(),
        s if s.is_corruption() => s.to_string().red().to_string(),
        s => s.to_string().yellow().to_string(),
    }
}
