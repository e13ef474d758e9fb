//! The branch lifecycle engine (spec §4.D).

use crate::config::BranchEngineConfig;
use quic_os::{AuditSink, FirewallAdapter, PostgresAdapter, SystemdAdapter, ZfsAdapter};
use std::sync::Arc;

/// Branch overrides applied to `postgresql.conf` in the clone (spec §4.D.1).
pub const BRANCH_CONF_OVERRIDES: &[(&str, &str)] = &[
    ("max_connections", "5"),
    ("wal_level", "minimal"),
    ("max_wal_senders", "0"),
    ("archive_mode", "off"),
    ("max_wal_size", "64MB"),
    ("maintenance_work_mem", "64MB"),
    ("effective_cache_size", "256MB"),
    ("shared_buffers", "128MB"),
    ("work_mem", "256MB"),
    ("random_page_cost", "1.1"),
    ("max_worker_processes", "4"),
    ("max_parallel_workers", "2"),
    ("max_parallel_workers_per_gather", "2"),
    ("synchronous_commit", "off"),
    ("listen_addresses", "'*'"),
    ("shared_preload_libraries", "''"),
    ("ssl", "on"),
    ("autovacuum", "off"),
];

/// `postgresql.auto.conf` is fully overwritten (not merged) in the clone.
pub fn render_branch_auto_conf() -> String {
    "archive_mode = 'off'\nrestore_command = ''\n# Clone instance\n".to_string()
}

/// `pg_hba.conf` is fully overwritten (not merged) in the clone.
pub fn render_branch_hba_conf() -> String {
    "\
local   postgres       postgres                                peer
local   all             all                                     md5
host    all             all             127.0.0.1/32            md5
host    all             all             ::1/128                 md5
host    all             admin           0.0.0.0/0               md5
"
    .to_string()
}

/// Owns the OS adapter handles and host configuration for the branch
/// lifecycle engine. Cheap to clone: every field is an `Arc`.
#[derive(Clone)]
pub struct BranchEngine {
    pub(crate) config: BranchEngineConfig,
    pub(crate) zfs: Arc<dyn ZfsAdapter>,
    pub(crate) systemd: Arc<dyn SystemdAdapter>,
    pub(crate) firewall: Arc<dyn FirewallAdapter>,
    pub(crate) postgres: Arc<dyn PostgresAdapter>,
    pub(crate) audit: Arc<dyn AuditSink>,
}

impl BranchEngine {
    pub fn new(
        config: BranchEngineConfig,
        zfs: Arc<dyn ZfsAdapter>,
        systemd: Arc<dyn SystemdAdapter>,
        firewall: Arc<dyn FirewallAdapter>,
        postgres: Arc<dyn PostgresAdapter>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            config,
            zfs,
            systemd,
            firewall,
            postgres,
            audit,
        }
    }

    pub fn config(&self) -> &BranchEngineConfig {
        &self.config
    }
}
