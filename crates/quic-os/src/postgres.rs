//! PostgreSQL control adapter: thin wrapper over `psql`, `pg_ctl`,
//! `pg_isready`, `pg_resetwal`, and the `chown` that hands a restored or
//! cloned data directory to the PostgreSQL system user.

use crate::error::{postgres_failure, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Narrow contract over the PostgreSQL control tools the branch engine needs.
#[async_trait]
pub trait PostgresAdapter: Send + Sync {
    /// Run `sql` against `db` on `port` as the PostgreSQL system user, over
    /// the local Unix socket directory.
    async fn psql(&self, port: u16, db: &str, sql: &str) -> Result<String>;

    /// Whether `pg_ctl status -D <dir>` reports the server running.
    async fn pg_ctl_status(&self, data_dir: &Path) -> Result<bool>;

    /// Whether `pg_isready -h localhost -p <port>` succeeds.
    async fn pg_is_ready(&self, port: u16) -> Result<bool>;

    /// Run `pg_resetwal -f` against a data directory to skip recovery.
    async fn pg_reset_wal(&self, data_dir: &Path) -> Result<()>;

    /// Recursively set `dir`'s ownership to the PostgreSQL system user, so
    /// it can open a data directory materialized by another user (e.g. the
    /// agent's own restore or clone step).
    async fn chown_recursive(&self, dir: &Path) -> Result<()>;
}

/// Real `PostgresAdapter` that shells out to the PostgreSQL binaries.
pub struct ShellPostgresAdapter {
    pg_user: String,
}

impl ShellPostgresAdapter {
    pub fn new(pg_user: impl Into<String>) -> Self {
        Self {
            pg_user: pg_user.into(),
        }
    }

    fn as_pg_user(&self, program: &str) -> Command {
        let mut cmd = Command::new("sudo");
        cmd.args(["-u", &self.pg_user, program]);
        cmd
    }
}

#[async_trait]
impl PostgresAdapter for ShellPostgresAdapter {
    async fn psql(&self, port: u16, db: &str, sql: &str) -> Result<String> {
        let port_str = port.to_string();
        let output = self
            .as_pg_user("psql")
            .args(["-h", "/var/run/postgresql", "-p", &port_str, "-d", db, "-c", sql])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            return Err(postgres_failure("psql", &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn pg_ctl_status(&self, data_dir: &Path) -> Result<bool> {
        let dir = data_dir.display().to_string();
        let output = self
            .as_pg_user("pg_ctl")
            .args(["status", "-D", &dir])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;
        Ok(output.status.success())
    }

    async fn pg_is_ready(&self, port: u16) -> Result<bool> {
        let port_str = port.to_string();
        let output = Command::new("pg_isready")
            .args(["-h", "localhost", "-p", &port_str])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;
        Ok(output.status.success())
    }

    async fn pg_reset_wal(&self, data_dir: &Path) -> Result<()> {
        let dir = data_dir.display().to_string();
        let output = self
            .as_pg_user("pg_resetwal")
            .args(["-f", &dir])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;
        if !output.status.success() {
            return Err(postgres_failure("pg_resetwal", &output));
        }
        Ok(())
    }

    async fn chown_recursive(&self, dir: &Path) -> Result<()> {
        let owner = format!("{0}:{0}", self.pg_user);
        let output = Command::new("sudo")
            .args(["chown", "-R", &owner])
            .arg(dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;
        if !output.status.success() {
            return Err(postgres_failure("chown", &output));
        }
        Ok(())
    }
}
