//! Host configuration for the template engine.

#[derive(Debug, Clone)]
pub struct TemplateEngineConfig {
    pub pool: String,
    pub mount_root: String,
    pub pg_user: String,
    pub ssl_cert_file: String,
    pub ssl_key_file: String,
    pub port_range: (u16, u16),
    pub pgbackrest_config_path: String,
}

impl Default for TemplateEngineConfig {
    fn default() -> Self {
        Self {
            pool: "tank".to_string(),
            mount_root: "/opt/quic".to_string(),
            pg_user: "postgres".to_string(),
            ssl_cert_file: "/etc/quic/tls/server.crt".to_string(),
            ssl_key_file: "/etc/quic/tls/server.key".to_string(),
            port_range: (15432, 16432),
            pgbackrest_config_path: "/etc/pgbackrest.conf".to_string(),
        }
    }
}
