//! Branch lifecycle engine (spec §4.D): create, list, delete branches;
//! port allocation, admin password generation, metadata, and the branch
//! state machine.

mod config;
mod create;
mod delete;
mod engine;
mod error;
mod list;
mod model;
mod password;
mod port;
mod validate;

pub use config::BranchEngineConfig;
pub use engine::{BranchEngine, BRANCH_CONF_OVERRIDES};
pub use error::{Error, ErrorKind, Result};
pub use model::{BranchInfo, BranchMetadata, BranchState, BranchSummary};
pub use password::generate_admin_password;
pub use port::allocate_port;
pub use validate::validate_branch_name;

#[cfg(test)]
mod tests {
    use super::*;
    use quic_os::audit::AuditRecord;
    use quic_os::{AuditSink, FirewallAdapter, PostgresAdapter, Result as OsResult, SystemdAdapter, ZfsAdapter};
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct FakeZfs {
        datasets: Mutex<HashSet<String>>,
        snapshots: Mutex<HashSet<String>>,
        mountpoints: Mutex<HashMap<String, PathBuf>>,
    }

    #[async_trait]
    impl ZfsAdapter for FakeZfs {
        async fn dataset_exists(&self, dataset: &str) -> OsResult<bool> {
            Ok(self.datasets.lock().unwrap().contains(dataset))
        }
        async fn snapshot_exists(&self, snapshot: &str) -> OsResult<bool> {
            Ok(self.snapshots.lock().unwrap().contains(snapshot))
        }
        async fn list_descendants(&self, dataset: &str) -> OsResult<Vec<String>> {
            Ok(self
                .datasets
                .lock()
                .unwrap()
                .iter()
                .filter(|d| d.starts_with(&format!("{dataset}/")))
                .cloned()
                .collect())
        }
        async fn create_dataset(&self, dataset: &str, mountpoint: &Path) -> OsResult<()> {
            self.datasets.lock().unwrap().insert(dataset.to_string());
            self.mountpoints
                .lock()
                .unwrap()
                .insert(dataset.to_string(), mountpoint.to_path_buf());
            Ok(())
        }
        async fn snapshot(&self, snapshot: &str) -> OsResult<()> {
            self.snapshots.lock().unwrap().insert(snapshot.to_string());
            Ok(())
        }
        async fn clone(&self, _snapshot: &str, dataset: &str, mountpoint: &Path) -> OsResult<()> {
            self.datasets.lock().unwrap().insert(dataset.to_string());
            self.mountpoints
                .lock()
                .unwrap()
                .insert(dataset.to_string(), mountpoint.to_path_buf());
            std::fs::create_dir_all(mountpoint).ok();
            Ok(())
        }
        async fn destroy(&self, target: &str, recursive: bool) -> OsResult<()> {
            self.datasets.lock().unwrap().remove(target);
            self.snapshots.lock().unwrap().remove(target);
            if recursive {
                let dataset_prefix = format!("{target}@");
                self.datasets
                    .lock()
                    .unwrap()
                    .retain(|d| !d.starts_with(&dataset_prefix));
            }
            Ok(())
        }
        async fn get_mountpoint(&self, dataset: &str) -> OsResult<PathBuf> {
            self.mountpoints
                .lock()
                .unwrap()
                .get(dataset)
                .cloned()
                .ok_or_else(|| quic_os::Error::MountpointUnset {
                    dataset: dataset.to_string(),
                })
        }
    }

    #[derive(Default)]
    struct FakeSystemd {
        units: Mutex<HashMap<String, String>>,
        active: Mutex<HashSet<String>>,
    }

    #[async_trait]
    impl SystemdAdapter for FakeSystemd {
        async fn write_unit(&self, name: &str, content: &str) -> OsResult<()> {
            self.units.lock().unwrap().insert(name.to_string(), content.to_string());
            Ok(())
        }
        async fn start(&self, name: &str) -> OsResult<()> {
            self.active.lock().unwrap().insert(name.to_string());
            Ok(())
        }
        async fn stop(&self, name: &str) -> OsResult<()> {
            self.active.lock().unwrap().remove(name);
            Ok(())
        }
        async fn is_active(&self, name: &str) -> OsResult<bool> {
            Ok(self.active.lock().unwrap().contains(name))
        }
        async fn remove(&self, name: &str) -> OsResult<()> {
            self.active.lock().unwrap().remove(name);
            self.units.lock().unwrap().remove(name);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeFirewall {
        rules: Mutex<HashSet<u16>>,
    }

    #[async_trait]
    impl FirewallAdapter for FakeFirewall {
        async fn open(&self, port: u16) -> OsResult<()> {
            self.rules.lock().unwrap().insert(port);
            Ok(())
        }
        async fn close(&self, port: u16) -> OsResult<()> {
            self.rules.lock().unwrap().remove(&port);
            Ok(())
        }
        async fn has_rule(&self, port: u16) -> OsResult<bool> {
            Ok(self.rules.lock().unwrap().contains(&port))
        }
    }

    #[derive(Default)]
    struct FakePostgres;

    #[async_trait]
    impl PostgresAdapter for FakePostgres {
        async fn psql(&self, _port: u16, _db: &str, _sql: &str) -> OsResult<String> {
            Ok(String::new())
        }
        async fn pg_ctl_status(&self, _data_dir: &Path) -> OsResult<bool> {
            Ok(true)
        }
        async fn pg_is_ready(&self, _port: u16) -> OsResult<bool> {
            Ok(true)
        }
        async fn pg_reset_wal(&self, _data_dir: &Path) -> OsResult<()> {
            Ok(())
        }
        async fn chown_recursive(&self, _dir: &Path) -> OsResult<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeAudit {
        records: Mutex<Vec<AuditRecord>>,
    }

    #[async_trait]
    impl AuditSink for FakeAudit {
        async fn write(&self, record: AuditRecord) {
            self.records.lock().unwrap().push(record);
        }
    }

    fn test_engine(mount_root: &Path) -> (BranchEngine, Arc<FakeZfs>, Arc<FakeAudit>) {
        let zfs = Arc::new(FakeZfs::default());
        let systemd = Arc::new(FakeSystemd::default());
        let firewall = Arc::new(FakeFirewall::default());
        let postgres = Arc::new(FakePostgres::default());
        let audit = Arc::new(FakeAudit::default());

        let mut config = BranchEngineConfig::default();
        config.mount_root = mount_root.display().to_string();
        config.port_range = (19000, 19010);

        zfs.datasets.lock().unwrap().insert(quic_naming::template_dataset(&config.pool, "proj1"));

        let engine = BranchEngine::new(
            config,
            zfs.clone(),
            systemd,
            firewall,
            postgres,
            audit.clone(),
        );
        (engine, zfs, audit)
    }

    #[tokio::test]
    async fn create_branch_happy_path() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, _zfs, audit) = test_engine(dir.path());

        let info = engine
            .create_branch("dev1", "proj1", "alice")
            .await
            .unwrap();

        assert_eq!(info.branch_name, "dev1");
        assert!(info.is_fully_materialized());
        let conn = info.connection_string().unwrap();
        assert!(conn.starts_with("postgresql://admin:"));
        assert!(conn.contains("@localhost:"));

        let records = audit.records.lock().unwrap();
        assert!(records.iter().any(|r| r.event_type == "branch_create"));
    }

    #[tokio::test]
    async fn create_branch_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, _zfs, _audit) = test_engine(dir.path());

        let first = engine.create_branch("dev1", "proj1", "alice").await.unwrap();
        let second = engine.create_branch("dev1", "proj1", "alice").await.unwrap();

        assert_eq!(first.port, second.port);
        assert_eq!(first.admin_password, second.admin_password);
        assert_eq!(first.connection_string(), second.connection_string());
    }

    #[tokio::test]
    async fn create_branch_rejects_reserved_name() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, _zfs, _audit) = test_engine(dir.path());

        let err = engine
            .create_branch("_restore", "proj1", "alice")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidName);
        assert!(err.to_string().contains("'_restore' is reserved"));
    }

    #[tokio::test]
    async fn create_branch_fails_on_missing_template() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, _zfs, _audit) = test_engine(dir.path());

        let err = engine
            .create_branch("dev1", "missing", "alice")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TemplateNotFound);
    }

    #[tokio::test]
    async fn delete_then_create_allocates_fresh_port_and_password() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, _zfs, _audit) = test_engine(dir.path());

        let first = engine.create_branch("dev1", "proj1", "alice").await.unwrap();
        let deleted = engine.delete_branch("dev1", "proj1").await.unwrap();
        assert!(deleted);

        let second = engine.create_branch("dev1", "proj1", "alice").await.unwrap();
        // Ports may collide by chance in a 10-wide range across two runs,
        // but the password must always be freshly generated.
        assert_ne!(first.admin_password, second.admin_password);
    }

    #[tokio::test]
    async fn delete_absent_branch_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, _zfs, _audit) = test_engine(dir.path());

        let deleted = engine.delete_branch("never", "proj1").await.unwrap();
        assert!(!deleted);
    }

    #[tokio::test]
    async fn list_branches_skips_restore_leaf() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, zfs, _audit) = test_engine(dir.path());

        zfs.datasets
            .lock()
            .unwrap()
            .insert(quic_naming::branch_dataset(&engine.config().pool, "proj1", "_restore"));

        let branches = engine.list_branches(Some("proj1")).await;
        assert!(branches.iter().all(|b| b.branch_name != "_restore"));
    }

    #[tokio::test]
    async fn list_branches_for_nonexistent_template_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, _zfs, _audit) = test_engine(dir.path());

        let branches = engine.list_branches(Some("nonexistent")).await;
        assert!(branches.is_empty());
    }
}
