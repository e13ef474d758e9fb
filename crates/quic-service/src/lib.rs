//! The service facade (spec §4.E): validates inputs, attributes calls to
//! an authenticated caller, serializes mutating work behind a single
//! shutdown-aware lock, and exposes the shapes an RPC layer dispatches
//! into.

mod error;
mod facade;
mod gate;

pub use error::{Error, ErrorKind, Result};
pub use facade::ServiceFacade;
pub use gate::ConcurrencyGate;

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quic_branch::{BranchEngine, BranchEngineConfig};
    use quic_os::audit::AuditRecord;
    use quic_os::{
        AuditSink, BackupToolAdapter, FirewallAdapter, JournalAdapter, JournalFollow, PostgresAdapter,
        RestoreProcess, Result as OsResult, SystemdAdapter, ZfsAdapter,
    };
    use quic_template::{LogLevel, ProgressSink, TemplateEngine, TemplateEngineConfig, TemplateSetupResult};
    use std::collections::{HashMap, HashSet};
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct FakeZfs {
        datasets: Mutex<HashMap<String, PathBuf>>,
        snapshots: Mutex<HashSet<String>>,
    }

    #[async_trait]
    impl ZfsAdapter for FakeZfs {
        async fn dataset_exists(&self, dataset: &str) -> OsResult<bool> {
            Ok(self.datasets.lock().unwrap().contains_key(dataset))
        }
        async fn snapshot_exists(&self, snapshot: &str) -> OsResult<bool> {
            Ok(self.snapshots.lock().unwrap().contains(snapshot))
        }
        async fn list_descendants(&self, dataset: &str) -> OsResult<Vec<String>> {
            Ok(self
                .datasets
                .lock()
                .unwrap()
                .keys()
                .filter(|d| d.starts_with(&format!("{dataset}/")))
                .cloned()
                .collect())
        }
        async fn create_dataset(&self, dataset: &str, mountpoint: &Path) -> OsResult<()> {
            std::fs::create_dir_all(mountpoint).ok();
            self.datasets.lock().unwrap().insert(dataset.to_string(), mountpoint.to_path_buf());
            Ok(())
        }
        async fn snapshot(&self, snapshot: &str) -> OsResult<()> {
            self.snapshots.lock().unwrap().insert(snapshot.to_string());
            Ok(())
        }
        async fn clone(&self, _snapshot: &str, dataset: &str, mountpoint: &Path) -> OsResult<()> {
            std::fs::create_dir_all(mountpoint).ok();
            self.datasets.lock().unwrap().insert(dataset.to_string(), mountpoint.to_path_buf());
            Ok(())
        }
        async fn destroy(&self, target: &str, _recursive: bool) -> OsResult<()> {
            self.datasets.lock().unwrap().remove(target);
            self.snapshots.lock().unwrap().remove(target);
            Ok(())
        }
        async fn get_mountpoint(&self, dataset: &str) -> OsResult<PathBuf> {
            self.datasets
                .lock()
                .unwrap()
                .get(dataset)
                .cloned()
                .ok_or_else(|| quic_os::Error::MountpointUnset { dataset: dataset.to_string() })
        }
    }

    #[derive(Default)]
    struct FakeSystemd {
        active: Mutex<HashSet<String>>,
    }

    #[async_trait]
    impl SystemdAdapter for FakeSystemd {
        async fn write_unit(&self, _name: &str, _content: &str) -> OsResult<()> {
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

    #[derive(Default)]
    struct FakeBackupTool;

    #[async_trait]
    impl BackupToolAdapter for FakeBackupTool {
        async fn write_config(&self, _path: &Path, _content: &str) -> OsResult<()> {
            Ok(())
        }
        async fn spawn_restore(&self, _stanza: &str, _data_dir: &Path, _token: &str) -> OsResult<RestoreProcess> {
            let mut child = tokio::process::Command::new("true")
                .stdout(std::process::Stdio::piped())
                .stderr(std::process::Stdio::piped())
                .spawn()
                .unwrap();
            let stdout = child.stdout.take().unwrap();
            let stderr = child.stderr.take().unwrap();
            drop(stdout);
            drop(stderr);
            let (_stx, srx) = tokio::sync::mpsc::channel(1);
            let (_etx, erx) = tokio::sync::mpsc::channel(1);
            Ok(RestoreProcess::from_parts(srx, erx, child))
        }
    }

    #[derive(Default)]
    struct FakeJournal;

    #[async_trait]
    impl JournalAdapter for FakeJournal {
        async fn follow(&self, _unit: &str) -> OsResult<JournalFollow> {
            let child = tokio::process::Command::new("true")
                .stdout(std::process::Stdio::piped())
                .spawn()
                .unwrap();
            let (_tx, rx) = tokio::sync::mpsc::channel(1);
            Ok(JournalFollow::from_parts(rx, child))
        }
    }

    #[derive(Default)]
    struct NullSink;

    #[async_trait]
    impl ProgressSink for NullSink {
        async fn log(&mut self, _line: &str, _level: LogLevel) {}
        async fn error(&mut self, _step: &str, _message: &str) {}
        async fn result(&mut self, _result: TemplateSetupResult) {}
    }

    fn test_facade(mount_root: &Path) -> ServiceFacade {
        let zfs = Arc::new(FakeZfs::default());
        let systemd = Arc::new(FakeSystemd::default());
        let firewall = Arc::new(FakeFirewall::default());
        let postgres = Arc::new(FakePostgres::default());
        let audit = Arc::new(FakeAudit::default());
        let backup = Arc::new(FakeBackupTool::default());
        let journal = Arc::new(FakeJournal::default());

        let mut branch_config = BranchEngineConfig::default();
        branch_config.mount_root = mount_root.display().to_string();
        branch_config.port_range = (19800, 19810);

        zfs.datasets
            .lock()
            .unwrap()
            .insert(quic_naming::template_dataset(&branch_config.pool, "proj1"), mount_root.to_path_buf());

        let branch_engine = BranchEngine::new(
            branch_config,
            zfs.clone(),
            systemd.clone(),
            firewall.clone(),
            postgres.clone(),
            audit,
        );

        let mut template_config = TemplateEngineConfig::default();
        template_config.mount_root = mount_root.display().to_string();
        template_config.port_range = (19820, 19830);

        let template_engine = TemplateEngine::new(template_config, zfs, systemd, firewall, postgres, backup, journal);

        ServiceFacade::new(branch_engine, template_engine)
    }

    #[tokio::test]
    async fn create_branch_happy_path() {
        let dir = tempfile::tempdir().unwrap();
        let facade = test_facade(dir.path());

        let info = facade.create_branch("dev1", "proj1", "alice").await.unwrap();
        assert_eq!(info.branch_name, "dev1");

        let summaries = facade.list_branches(Some("proj1")).await;
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].created_by, "alice");
    }

    #[tokio::test]
    async fn create_branch_fails_while_shutting_down() {
        let dir = tempfile::tempdir().unwrap();
        let facade = test_facade(dir.path());

        facade.shutdown(Duration::from_secs(1)).await.unwrap();

        let err = facade.create_branch("dev1", "proj1", "alice").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShutdownInProgress);
    }

    #[tokio::test]
    async fn delete_branch_after_create_reclaims_it() {
        let dir = tempfile::tempdir().unwrap();
        let facade = test_facade(dir.path());

        facade.create_branch("dev1", "proj1", "alice").await.unwrap();
        let deleted = facade.delete_branch("dev1", "proj1").await.unwrap();
        assert!(deleted);

        let summaries = facade.list_branches(Some("proj1")).await;
        assert!(summaries.is_empty());
    }
}
