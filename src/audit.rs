//! Audit log
//!
//! Records every broker invocation for compliance and debugging, one JSON
//! object per line.

use crate::permissions::Capability;
use crate::types::CallerIdentity;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Entry in the audit log
#[derive(Debug, Serialize)]
struct AuditEntry<'a> {
    timestamp: DateTime<Utc>,
    entry_type: &'static str,
    caller: &'a CallerIdentity,
    capability: Capability,
    args: Value,
    result: Option<Value>,
    error: Option<String>,
    duration_ms: u64,
    status: &'static str,
}

/// Writer for audit log entries
struct AuditLogWriter {
    path: PathBuf,
}

impl AuditLogWriter {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn write(&self, entry: &AuditEntry<'_>) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }
}

/// Append-only JSONL log of broker calls
///
/// Write failures are logged and swallowed: auditing never blocks a call.
#[derive(Clone)]
pub struct AuditLog {
    writer: Arc<Mutex<AuditLogWriter>>,
}

impl AuditLog {
    /// # Arguments
    /// * `log_path` - Path to the audit log file (JSONL format)
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            writer: Arc::new(Mutex::new(AuditLogWriter::new(log_path.into()))),
        }
    }

    pub async fn call_started(&self, caller: &CallerIdentity, capability: Capability, args: &Value) {
        self.append(AuditEntry {
            timestamp: Utc::now(),
            entry_type: "broker_call_start",
            caller,
            capability,
            args: truncate_value(args, 500),
            result: None,
            error: None,
            duration_ms: 0,
            status: "pending",
        })
        .await;
    }

    pub async fn call_completed(
        &self,
        caller: &CallerIdentity,
        capability: Capability,
        args: &Value,
        outcome: Result<Value, String>,
        duration_ms: u64,
    ) {
        let (result, error, status) = match outcome {
            Ok(v) => (Some(truncate_value(&v, 1000)), None, "success"),
            Err(e) => (None, Some(e), "error"),
        };

        self.append(AuditEntry {
            timestamp: Utc::now(),
            entry_type: "broker_call_complete",
            caller,
            capability,
            args: truncate_value(args, 500),
            result,
            error,
            duration_ms,
            status,
        })
        .await;
    }

    /// A call refused by the permission check; it never started
    pub async fn call_denied(&self, caller: &CallerIdentity, capability: Capability, args: &Value) {
        self.append(AuditEntry {
            timestamp: Utc::now(),
            entry_type: "broker_call_denied",
            caller,
            capability,
            args: truncate_value(args, 500),
            result: None,
            error: Some("permission denied".to_string()),
            duration_ms: 0,
            status: "denied",
        })
        .await;
    }

    async fn append(&self, entry: AuditEntry<'_>) {
        let writer = self.writer.lock().await;
        if let Err(e) = writer.write(&entry) {
            tracing::warn!(error = %e, "Failed to write audit log entry");
        }
    }
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog").finish_non_exhaustive()
    }
}

/// Truncate large values (typed data, calldata) before they hit the log
fn truncate_value(value: &Value, max_len: usize) -> Value {
    let s = serde_json::to_string(value).unwrap_or_default();
    if s.len() <= max_len {
        return value.clone();
    }
    let cut = s
        .char_indices()
        .map(|(i, _)| i)
        .take_while(|i| *i <= max_len)
        .last()
        .unwrap_or(0);
    serde_json::json!(format!("{}... [truncated]", &s[..cut]))
}
