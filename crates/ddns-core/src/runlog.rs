// # Run Log
//
// Plain-text, most-recent-run-first log of every run's outcomes.
//
// ## Format
//
// ```text
// === Starting DDNS update run: 2026-10-19 06:00:01 ===
// [2026-10-19 06:00:02] www.example.com (A)
//     IP:     192.0.2.1 > 192.0.2.2
//     TTL:    600
//     Result: UPDATED
//
// [2026-10-19 06:00:04] ERROR
//     Scope:     example.com (AAAA)
//     Operation: retrieve
//     Cause:     2 matching AAAA records; manual cleanup required
//
// === DDNS update run complete: 2026-10-19 06:00:05 ===
// ```
//
// ## Rotation
//
// - The current run is buffered in memory and written once, at the end
// - Older runs beyond the retention limit are dropped from the tail
// - Atomic writes: the new log is written to a temporary file, then renamed

use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::engine::ReconciliationOutcome;
use crate::error::{Error, Result};

/// Every run block starts with a line beginning with this text
pub const START_MARKER_PREFIX: &str = "=== Starting DDNS update run";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DETAIL_INDENT: &str = "               ";

/// One error entry in the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorBlock {
    pub timestamp: DateTime<Local>,
    /// What the error applies to: a record (`name (TYPE)`) or `GLOBAL`
    pub scope: String,
    pub operation: String,
    pub cause: String,
    pub detail: Option<String>,
}

impl ErrorBlock {
    /// An error that concerns the whole run rather than one record
    pub fn global(operation: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            scope: "GLOBAL".to_string(),
            operation: operation.into(),
            cause: cause.into(),
            detail: None,
        }
    }
}

/// Render `old > new`, or just `new` when nothing changed
fn transition(old: &str, new: &str) -> String {
    if old == new {
        new.to_string()
    } else {
        format!("{} > {}", old, new)
    }
}

/// Render an error block
pub fn format_error(block: &ErrorBlock) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[{}] ERROR", block.timestamp.format(TIMESTAMP_FORMAT));
    let _ = writeln!(out, "    Scope:     {}", block.scope);
    let _ = writeln!(out, "    Operation: {}", block.operation);
    let _ = writeln!(out, "    Cause:     {}", block.cause);
    if let Some(detail) = block.detail.as_deref().filter(|d| !d.trim().is_empty()) {
        // Continuation lines are indented so a raw body can never pose as a run marker
        let mut lines = detail.trim().lines();
        if let Some(first) = lines.next() {
            let _ = writeln!(out, "    Detail:    {}", first.trim_end());
        }
        for line in lines {
            let _ = writeln!(out, "{}{}", DETAIL_INDENT, line.trim_end());
        }
    }
    out.push('\n');
    out
}

/// Render a reconciliation outcome as a record block or an error block
pub fn format_outcome(outcome: &ReconciliationOutcome) -> String {
    let entry = outcome.entry();
    let scope = format!("{} ({})", entry.fqdn, entry.record_type);

    let (ip, ttl, result) = match outcome {
        ReconciliationOutcome::Created(_) => {
            (entry.ip.clone(), entry.ttl.to_string(), "CREATED")
        }
        ReconciliationOutcome::Unchanged(_) => {
            (entry.ip.clone(), entry.ttl.to_string(), "UNCHANGED")
        }
        ReconciliationOutcome::Updated {
            previous_ip,
            previous_ttl,
            ..
        } => {
            let new_ttl = entry.ttl.to_string();
            let old_ttl = previous_ttl.map_or_else(|| "?".to_string(), |t| t.to_string());
            (
                transition(previous_ip, &entry.ip),
                transition(&old_ttl, &new_ttl),
                "UPDATED",
            )
        }
        ReconciliationOutcome::Ambiguous { match_count, .. } => {
            return format_error(&ErrorBlock {
                timestamp: entry.timestamp,
                scope,
                operation: "retrieve".to_string(),
                cause: format!(
                    "{} matching {} records; manual cleanup required",
                    match_count, entry.record_type
                ),
                detail: None,
            });
        }
        ReconciliationOutcome::ApiError {
            operation,
            cause,
            detail,
            ..
        } => {
            return format_error(&ErrorBlock {
                timestamp: entry.timestamp,
                scope,
                operation: operation.to_string(),
                cause: cause.clone(),
                detail: detail.clone(),
            });
        }
    };

    let mut out = String::new();
    let _ = writeln!(out, "[{}] {}", entry.timestamp.format(TIMESTAMP_FORMAT), scope);
    let _ = writeln!(out, "    IP:     {}", ip);
    let _ = writeln!(out, "    TTL:    {}", ttl);
    let _ = writeln!(out, "    Result: {}", result);
    out.push('\n');
    out
}

/// Byte offsets of every run start marker in `log`
fn run_starts(log: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut offset = 0;
    for line in log.split_inclusive('\n') {
        if line.starts_with(START_MARKER_PREFIX) {
            starts.push(offset);
        }
        offset += line.len();
    }
    starts
}

/// Number of runs in `log`
pub fn count_runs(log: &str) -> usize {
    run_starts(log).len()
}

/// Keep only the `keep` most recent (leading) runs of `log`
pub fn retain_runs(log: &str, keep: usize) -> &str {
    let starts = run_starts(log);
    match starts.get(keep) {
        Some(&cut) => &log[..cut],
        None => log,
    }
}

/// Accumulates one run's log entries, then merges them into the log file
#[derive(Debug)]
pub struct RunLogger {
    path: PathBuf,
    retention: usize,
    buffer: String,
}

impl RunLogger {
    /// Begin a run: the start marker is buffered immediately
    ///
    /// # Parameters
    ///
    /// - `path`: Persistent log file
    /// - `retention`: Maximum number of runs kept after [`RunLogger::finalize`]
    pub fn start(path: impl Into<PathBuf>, retention: usize) -> Self {
        let mut buffer = String::new();
        let _ = writeln!(
            buffer,
            "{}: {} ===",
            START_MARKER_PREFIX,
            Local::now().format(TIMESTAMP_FORMAT)
        );

        Self {
            path: path.into(),
            retention: retention.max(1),
            buffer,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one reconciliation outcome
    pub fn record(&mut self, outcome: &ReconciliationOutcome) {
        self.buffer.push_str(&format_outcome(outcome));
    }

    /// Append one error block
    pub fn record_error(&mut self, block: &ErrorBlock) {
        self.buffer.push_str(&format_error(block));
    }

    /// The current run as buffered so far
    pub fn current_run(&self) -> &str {
        &self.buffer
    }

    /// Close the run and merge it in front of the persistent log
    ///
    /// At most `retention - 1` older runs are kept behind the current one.
    /// The result is written to a temporary file next to the log and
    /// renamed over it, so readers never see a half-written log.
    pub async fn finalize(mut self) -> Result<()> {
        let _ = writeln!(
            self.buffer,
            "=== DDNS update run complete: {} ===",
            Local::now().format(TIMESTAMP_FORMAT)
        );
        self.buffer.push('\n');

        // Create parent directory if it doesn't exist
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::Other(format!(
                    "Failed to create log directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let existing = match fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let older = retain_runs(&existing, self.retention - 1);
        let dropped = count_runs(&existing) - count_runs(older);
        if dropped > 0 {
            tracing::debug!("Rotating run log: dropping {} old run(s)", dropped);
        }

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::Other(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            file.write_all(self.buffer.as_bytes()).await?;
            file.write_all(older.as_bytes()).await?;
            file.flush().await?;
            file.sync_all().await?;
        }

        // Atomic rename (temp -> actual)
        if let Err(e) = fs::rename(&temp_path, &self.path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(Error::Other(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            )));
        }

        tracing::trace!("Run log written: {}", self.path.display());
        Ok(())
    }

    /// Get path to temporary file for atomic writes
    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
