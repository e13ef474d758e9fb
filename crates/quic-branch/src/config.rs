//! Configuration for the branch lifecycle engine (spec §6, §7 defaults).

/// Host-wide configuration the branch engine needs; sourced from
/// `quic-agent`'s config file.
#[derive(Debug, Clone)]
pub struct BranchEngineConfig {
    /// ZFS pool name, e.g. `tank`.
    pub pool: String,
    /// Root of all template/branch mountpoints, e.g. `/opt/quic`.
    pub mount_root: String,
    /// Inclusive TCP port range branches are allocated from.
    pub port_range: (u16, u16),
    /// PostgreSQL system user that owns data directories and runs `pg_ctl`.
    pub pg_user: String,
    /// Path to the host-installed TLS certificate used by branch instances.
    pub ssl_cert_file: String,
    /// Path to the host-installed TLS private key used by branch instances.
    pub ssl_key_file: String,
}

impl Default for BranchEngineConfig {
    fn default() -> Self {
        Self {
            pool: "tank".to_string(),
            mount_root: "/opt/quic".to_string(),
            port_range: (15432, 16432),
            pg_user: "postgres".to_string(),
            ssl_cert_file: "/etc/quic/tls/server.crt".to_string(),
            ssl_key_file: "/etc/quic/tls/server.key".to_string(),
        }
    }
}
