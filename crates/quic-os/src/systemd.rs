//! systemd adapter: thin wrapper over `systemctl` and unit-file management.

use crate::error::{systemd_failure, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Narrow contract over the subset of systemd unit lifecycle management the
/// branch engine needs.
#[async_trait]
pub trait SystemdAdapter: Send + Sync {
    /// Atomically write a unit file, reload the daemon, and enable the unit.
    async fn write_unit(&self, name: &str, content: &str) -> Result<()>;

    /// Start a unit.
    async fn start(&self, name: &str) -> Result<()>;

    /// Stop a unit.
    async fn stop(&self, name: &str) -> Result<()>;

    /// Whether `systemctl is-active` reports `active`.
    async fn is_active(&self, name: &str) -> Result<bool>;

    /// Stop, disable, delete the unit file, and reload the daemon.
    async fn remove(&self, name: &str) -> Result<()>;
}

/// Real `SystemdAdapter` that shells out to `systemctl`.
#[derive(Default, Clone, Copy)]
pub struct ShellSystemdAdapter;

impl ShellSystemdAdapter {
    pub fn new() -> Self {
        Self
    }

    async fn systemctl(&self, args: &[&str]) -> Result<std::process::Output> {
        let output = Command::new("systemctl")
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;
        Ok(output)
    }
}

#[async_trait]
impl SystemdAdapter for ShellSystemdAdapter {
    async fn write_unit(&self, name: &str, content: &str) -> Result<()> {
        let path = quic_naming::service_file(name);
        let tmp_path = path.with_extension("service.tmp");

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        {
            let mut file = tokio::fs::File::create(&tmp_path).await?;
            file.write_all(content.as_bytes()).await?;
            file.sync_all().await?;
        }
        tokio::fs::rename(&tmp_path, &path).await?;

        let reload = self.systemctl(&["daemon-reload"]).await?;
        if !reload.status.success() {
            return Err(systemd_failure("daemon-reload", &reload));
        }

        let enable = self.systemctl(&["enable", name]).await?;
        if !enable.status.success() {
            return Err(systemd_failure("enable", &enable));
        }

        Ok(())
    }

    async fn start(&self, name: &str) -> Result<()> {
        let output = self.systemctl(&["start", name]).await?;
        if !output.status.success() {
            return Err(systemd_failure("start", &output));
        }
        Ok(())
    }

    async fn stop(&self, name: &str) -> Result<()> {
        let output = self.systemctl(&["stop", name]).await?;
        if !output.status.success() {
            return Err(systemd_failure("stop", &output));
        }
        Ok(())
    }

    async fn is_active(&self, name: &str) -> Result<bool> {
        let output = self.systemctl(&["is-active", name]).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.trim() == "active")
    }

    async fn remove(&self, name: &str) -> Result<()> {
        let _ = self.stop(name).await;
        let _ = self.systemctl(&["disable", name]).await;

        let path = quic_naming::service_file(name);
        if path.exists() {
            tokio::fs::remove_file(&path).await?;
        }

        let reload = self.systemctl(&["daemon-reload"]).await?;
        if !reload.status.success() {
            return Err(systemd_failure("daemon-reload", &reload));
        }
        Ok(())
    }
}

/// Render a forking-style unit for `pg_ctl start`, per spec §4.C/§4.D.
pub fn render_pg_ctl_unit(
    description: &str,
    pg_user: &str,
    data_dir: &Path,
    port: u16,
    restart_policy: &str,
    restart_sec: u32,
) -> String {
    format!(
        "[Unit]\n\
         Description={description}\n\
         After=network.target zfs-unlock.service\n\
         \n\
         [Service]\n\
         Type=forking\n\
         User={pg_user}\n\
         ExecStart=/usr/lib/postgresql/bin/pg_ctl start -D {data_dir} -o \"--port={port}\"\n\
         ExecStop=/usr/lib/postgresql/bin/pg_ctl stop -D {data_dir} -m fast\n\
         Restart={restart_policy}\n\
         RestartSec={restart_sec}\n\
         TimeoutStartSec=120\n\
         TimeoutStopSec=60\n\
         \n\
         [Install]\n\
         WantedBy=multi-user.target\n",
        data_dir = data_dir.display(),
    )
}
