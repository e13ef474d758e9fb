//! On-disk metadata and request/response shapes for template setup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Inputs to `TemplateSetup` (spec §4.C).
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateSetupRequest {
    pub template_name: String,
    pub database: String,
    pub pg_version: String,
    pub backup_token: String,
    pub pgbackrest_config: String,
}

/// `.quic-init-meta.json`, written once by template setup and read by
/// every subsequent branch create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateMetadata {
    pub template: String,
    pub stanza: String,
    pub database: String,
    pub mount_path: PathBuf,
    pub port: u16,
    pub service_name: String,
    pub created_at: DateTime<Utc>,
}

/// Successful result of `TemplateSetup`.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateSetupResult {
    pub template_name: String,
    pub connection_string: String,
    pub mount_path: PathBuf,
    pub port: u16,
    pub service_name: String,
}

impl TemplateSetupResult {
    pub fn from_metadata(meta: &TemplateMetadata) -> Self {
        Self {
            template_name: meta.template.clone(),
            connection_string: format!(
                "postgresql://localhost:{}/{}",
                meta.port, meta.database
            ),
            mount_path: meta.mount_path.clone(),
            port: meta.port,
            service_name: meta.service_name.clone(),
        }
    }
}

/// A line in the streamed progress log (spec §4.C, §6 `Log`).
#[derive(Debug, Clone, Serialize)]
pub struct LogLine {
    pub line: String,
    pub level: LogLevel,
    pub ts: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
}
