//! Adapter over the physical-backup restore tool (`pgbackrest`).
//!
//! Restore runs for minutes and its stdout/stderr are streamed to the
//! caller as they arrive rather than collected with `.output()`.

use crate::error::{format_status, Error, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

#[async_trait]
pub trait BackupToolAdapter: Send + Sync {
    /// Persist the restore tool's configuration file (privileged write).
    async fn write_config(&self, path: &Path, content: &str) -> Result<()>;

    /// Start a standby-mode restore into `data_dir`, returning a handle
    /// whose channels stream stdout/stderr lines as the process runs.
    /// `token` carries the cloud-backup-provider credential (minted by an
    /// external collaborator, spec §1) through to the tool's environment.
    async fn spawn_restore(&self, stanza: &str, data_dir: &Path, token: &str) -> Result<RestoreProcess>;
}

/// A running restore, with its output streamed line-by-line.
pub struct RestoreProcess {
    pub stdout: mpsc::Receiver<String>,
    pub stderr: mpsc::Receiver<String>,
    child: Child,
}

impl RestoreProcess {
    /// Build a handle directly from its parts. Exposed for test-double
    /// `BackupToolAdapter` implementations in downstream crates that need
    /// to hand back a `RestoreProcess` without actually shelling out.
    pub fn from_parts(stdout: mpsc::Receiver<String>, stderr: mpsc::Receiver<String>, child: Child) -> Self {
        Self { stdout, stderr, child }
    }

    /// Wait for the restore to exit, failing with the given captured
    /// stderr lines if it did not exit successfully. Callers are expected
    /// to have drained `stdout`/`stderr` themselves (e.g. while also
    /// emitting a heartbeat) before calling this.
    pub async fn finish(mut self, stderr_tail: &[String]) -> Result<()> {
        let status = self.child.wait().await.map_err(Error::Io)?;
        if status.success() {
            Ok(())
        } else {
            Err(Error::BackupTool {
                status: format_status(status),
                stderr: stderr_tail.join("\n"),
            })
        }
    }
}

#[derive(Default, Clone, Copy)]
pub struct PgBackRestAdapter;

#[async_trait]
impl BackupToolAdapter for PgBackRestAdapter {
    async fn write_config(&self, path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn spawn_restore(&self, stanza: &str, data_dir: &Path, token: &str) -> Result<RestoreProcess> {
        let mut child = Command::new("pgbackrest")
            .arg(format!("--stanza={stanza}"))
            .arg("--type=standby")
            .arg("--delta")
            .arg(format!("--pg1-path={}", data_dir.display()))
            .arg("restore")
            .env("PGBACKREST_REPO1_TOKEN", token)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(Error::Io)?;

        let stdout = child.stdout.take().expect("stdout piped");
        let stderr = child.stderr.take().expect("stderr piped");

        let (stdout_tx, stdout_rx) = mpsc::channel(64);
        let (stderr_tx, stderr_rx) = mpsc::channel(64);

        tokio::spawn(stream_lines(stdout, stdout_tx));
        tokio::spawn(stream_lines(stderr, stderr_tx));

        Ok(RestoreProcess {
            stdout: stdout_rx,
            stderr: stderr_rx,
            child,
        })
    }
}

async fn stream_lines<R: tokio::io::AsyncRead + Unpin>(reader: R, tx: mpsc::Sender<String>) {
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if tx.send(line).await.is_err() {
            break;
        }
    }
}
