//! TOML configuration for the agent process (spec §7 defaults).

use anyhow::{Context, Result};
use quic_branch::BranchEngineConfig;
use quic_template::TemplateEngineConfig;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Unix socket the dispatch loop listens on.
    pub socket_path: String,
    /// Append-only newline-delimited JSON audit log (spec §3).
    pub audit_log_path: String,
    /// ZFS pool name, e.g. `tank`.
    pub pool: String,
    /// Root of all template/branch mountpoints.
    pub mount_root: String,
    /// PostgreSQL system user that owns data directories.
    pub pg_user: String,
    pub ssl_cert_file: String,
    pub ssl_key_file: String,
    pub pgbackrest_config_path: String,
    pub branch_port_range: PortRange,
    pub template_port_range: PortRange,
    /// Static bearer-token -> caller-identity map (see `StaticTokenResolver`).
    pub tokens: HashMap<String, String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            socket_path: "/run/quic/agent.sock".to_string(),
            audit_log_path: "/var/log/quic/audit.log".to_string(),
            pool: "tank".to_string(),
            mount_root: "/opt/quic".to_string(),
            pg_user: "postgres".to_string(),
            ssl_cert_file: "/etc/quic/tls/server.crt".to_string(),
            ssl_key_file: "/etc/quic/tls/server.key".to_string(),
            pgbackrest_config_path: "/etc/pgbackrest.conf".to_string(),
            branch_port_range: PortRange { start: 15432, end: 16432 },
            template_port_range: PortRange { start: 15432, end: 16432 },
            tokens: HashMap::new(),
        }
    }
}

impl AgentConfig {
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: AgentConfig = toml::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    pub fn branch_engine_config(&self) -> BranchEngineConfig {
        BranchEngineConfig {
            pool: self.pool.clone(),
            mount_root: self.mount_root.clone(),
            port_range: (self.branch_port_range.start, self.branch_port_range.end),
            pg_user: self.pg_user.clone(),
            ssl_cert_file: self.ssl_cert_file.clone(),
            ssl_key_file: self.ssl_key_file.clone(),
        }
    }

    pub fn template_engine_config(&self) -> TemplateEngineConfig {
        TemplateEngineConfig {
            pool: self.pool.clone(),
            mount_root: self.mount_root.clone(),
            pg_user: self.pg_user.clone(),
            ssl_cert_file: self.ssl_cert_file.clone(),
            ssl_key_file: self.ssl_key_file.clone(),
            port_range: (self.template_port_range.start, self.template_port_range.end),
            pgbackrest_config_path: self.pgbackrest_config_path.clone(),
        }
    }
}
