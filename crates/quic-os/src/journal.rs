//! Adapter for tailing `journalctl` output while a unit starts.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

#[async_trait]
pub trait JournalAdapter: Send + Sync {
    /// Start following a unit's journal from "now", returning a handle
    /// whose channel streams lines as they are written.
    async fn follow(&self, unit: &str) -> Result<JournalFollow>;
}

/// A running `journalctl -f` process, streaming lines.
pub struct JournalFollow {
    pub lines: mpsc::Receiver<String>,
    child: Child,
}

impl JournalFollow {
    /// Build a handle directly from its parts. Exposed for test-double
    /// `JournalAdapter` implementations in downstream crates.
    pub fn from_parts(lines: mpsc::Receiver<String>, child: Child) -> Self {
        Self { lines, child }
    }

    /// Stop following; best-effort kill, since the process never exits on
    /// its own.
    pub async fn stop(mut self) {
        let _ = self.child.kill().await;
    }
}

#[derive(Default, Clone, Copy)]
pub struct JournalctlAdapter;

#[async_trait]
impl JournalAdapter for JournalctlAdapter {
    async fn follow(&self, unit: &str) -> Result<JournalFollow> {
        let mut child = Command::new("journalctl")
            .args(["-u", unit, "-f", "-n", "0", "--no-pager"])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(Error::Io)?;

        let stdout = child.stdout.take().expect("stdout piped");
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tx.send(line).await.is_err() {
                    break;
                }
            }
        });

        Ok(JournalFollow { lines: rx, child })
    }
}
