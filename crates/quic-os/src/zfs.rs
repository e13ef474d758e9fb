//! ZFS adapter: thin, testable wrapper over the `zfs` command line tool.

use crate::error::{zfs_failure, Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Narrow contract over the subset of `zfs(8)` the branch engine needs.
#[async_trait]
pub trait ZfsAdapter: Send + Sync {
    /// Whether a dataset (filesystem or clone) exists.
    async fn dataset_exists(&self, dataset: &str) -> Result<bool>;

    /// Whether a snapshot exists.
    async fn snapshot_exists(&self, snapshot: &str) -> Result<bool>;

    /// List all descendant dataset names of `dataset` (not including itself).
    async fn list_descendants(&self, dataset: &str) -> Result<Vec<String>>;

    /// Create a new dataset with an explicit mountpoint.
    async fn create_dataset(&self, dataset: &str, mountpoint: &Path) -> Result<()>;

    /// Take a snapshot, e.g. `tank/proj1@dev1`.
    async fn snapshot(&self, snapshot: &str) -> Result<()>;

    /// Clone a snapshot into a new dataset with an explicit mountpoint.
    async fn clone(&self, snapshot: &str, dataset: &str, mountpoint: &Path) -> Result<()>;

    /// Destroy a dataset or snapshot. `recursive` maps to `zfs destroy -R`.
    async fn destroy(&self, target: &str, recursive: bool) -> Result<()>;

    /// Read the `mountpoint` property of a dataset. Fails if the value is
    /// `none`, `-`, or empty.
    async fn get_mountpoint(&self, dataset: &str) -> Result<PathBuf>;
}

/// Real `ZfsAdapter` that shells out to the `zfs` binary.
#[derive(Default, Clone, Copy)]
pub struct ShellZfsAdapter;

impl ShellZfsAdapter {
    pub fn new() -> Self {
        Self
    }

    async fn run(&self, args: &[&str]) -> Result<std::process::Output> {
        let output = Command::new("zfs")
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;
        Ok(output)
    }
}

#[async_trait]
impl ZfsAdapter for ShellZfsAdapter {
    async fn dataset_exists(&self, dataset: &str) -> Result<bool> {
        let output = self.run(&["list", "-H", "-o", "name", dataset]).await?;
        Ok(output.status.success())
    }

    async fn snapshot_exists(&self, snapshot: &str) -> Result<bool> {
        let output = self
            .run(&["list", "-H", "-t", "snapshot", "-o", "name", snapshot])
            .await?;
        Ok(output.status.success())
    }

    async fn list_descendants(&self, dataset: &str) -> Result<Vec<String>> {
        let output = self
            .run(&["list", "-H", "-r", "-o", "name", dataset])
            .await?;
        if !output.status.success() {
            return Err(zfs_failure("list -r", &output));
        }
        let names: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty() && l != dataset)
            .collect();
        Ok(names)
    }

    async fn create_dataset(&self, dataset: &str, mountpoint: &Path) -> Result<()> {
        let mp = mountpoint.display().to_string();
        let output = self
            .run(&["create", "-o", &format!("mountpoint={mp}"), dataset])
            .await?;
        if !output.status.success() {
            return Err(zfs_failure("create", &output));
        }
        Ok(())
    }

    async fn snapshot(&self, snapshot: &str) -> Result<()> {
        let output = self.run(&["snapshot", snapshot]).await?;
        if !output.status.success() {
            return Err(zfs_failure("snapshot", &output));
        }
        Ok(())
    }

    async fn clone(&self, snapshot: &str, dataset: &str, mountpoint: &Path) -> Result<()> {
        let mp = mountpoint.display().to_string();
        let output = self
            .run(&[
                "clone",
                "-o",
                &format!("mountpoint={mp}"),
                snapshot,
                dataset,
            ])
            .await?;
        if !output.status.success() {
            return Err(zfs_failure("clone", &output));
        }
        Ok(())
    }

    async fn destroy(&self, target: &str, recursive: bool) -> Result<()> {
        let output = if recursive {
            self.run(&["destroy", "-R", target]).await?
        } else {
            self.run(&["destroy", target]).await?
        };
        if !output.status.success() {
            return Err(zfs_failure("destroy", &output));
        }
        Ok(())
    }

    async fn get_mountpoint(&self, dataset: &str) -> Result<PathBuf> {
        let output = self
            .run(&["get", "-H", "-o", "value", "mountpoint", dataset])
            .await?;
        if !output.status.success() {
            return Err(zfs_failure("get mountpoint", &output));
        }
        let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if value.is_empty() || value == "none" || value == "-" {
            return Err(Error::MountpointUnset {
                dataset: dataset.to_string(),
            });
        }
        Ok(PathBuf::from(value))
    }
}
