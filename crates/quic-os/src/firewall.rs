//! Firewall adapter: thin wrapper over `ufw`.

use crate::error::{firewall_failure, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

/// Narrow contract over the subset of `ufw(8)` the branch engine needs.
#[async_trait]
pub trait FirewallAdapter: Send + Sync {
    /// `ufw allow <port>/tcp`.
    async fn open(&self, port: u16) -> Result<()>;

    /// `ufw delete allow <port>/tcp`.
    async fn close(&self, port: u16) -> Result<()>;

    /// Whether a rule for `<port>/tcp` is present in `ufw status`.
    async fn has_rule(&self, port: u16) -> Result<bool>;
}

/// Real `FirewallAdapter` that shells out to `ufw`.
#[derive(Default, Clone, Copy)]
pub struct UfwAdapter;

impl UfwAdapter {
    pub fn new() -> Self {
        Self
    }

    async fn ufw(&self, args: &[&str]) -> Result<std::process::Output> {
        let output = Command::new("ufw")
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;
        Ok(output)
    }
}

#[async_trait]
impl FirewallAdapter for UfwAdapter {
    async fn open(&self, port: u16) -> Result<()> {
        let rule = format!("{port}/tcp");
        let output = self.ufw(&["allow", &rule]).await?;
        if !output.status.success() {
            return Err(firewall_failure("allow", &output));
        }
        Ok(())
    }

    async fn close(&self, port: u16) -> Result<()> {
        let rule = format!("{port}/tcp");
        let output = self.ufw(&["delete", "allow", &rule]).await?;
        if !output.status.success() {
            return Err(firewall_failure("delete allow", &output));
        }
        Ok(())
    }

    async fn has_rule(&self, port: u16) -> Result<bool> {
        let output = self.ufw(&["status"]).await?;
        if !output.status.success() {
            return Err(firewall_failure("status", &output));
        }
        let needle = format!("{port}/tcp");
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().any(|line| line.contains(&needle)))
    }
}
