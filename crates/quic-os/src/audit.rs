//! Audit log: append-only, newline-delimited JSON.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// One audit record, serialized as a single JSON line.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub details: Value,
}

impl AuditRecord {
    pub fn new(event_type: impl Into<String>, details: Value) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type: event_type.into(),
            details,
        }
    }
}

/// Sink for audit records. A trait so tests can assert on emitted records
/// without touching disk; production wiring supplies [`FileAuditSink`].
#[async_trait::async_trait]
pub trait AuditSink: Send + Sync {
    async fn write(&self, record: AuditRecord);
}

/// Real `AuditSink` that appends newline-delimited JSON to a file.
///
/// Open-for-append failures are logged and swallowed: an audit write must
/// never abort a lifecycle operation (spec §4.B, §7).
pub struct FileAuditSink {
    path: PathBuf,
}

impl FileAuditSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl AuditSink for FileAuditSink {
    async fn write(&self, record: AuditRecord) {
        if let Err(e) = append_line(&self.path, &record).await {
            warn!(error = %e, event_type = %record.event_type, "failed to write audit record");
        }
    }
}

async fn append_line(path: &Path, record: &AuditRecord) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut line = serde_json::to_string(record)?;
    line.push('\n');

    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    options.mode(0o644);

    let mut file = options.open(path).await?;
    file.write_all(line.as_bytes()).await?;
    Ok(())
}
