//! `CreateBranch` (spec §4.D.1).

use crate::engine::{render_branch_auto_conf, render_branch_hba_conf, BranchEngine, BRANCH_CONF_OVERRIDES};
use crate::error::{Error, Result};
use crate::model::{BranchInfo, BranchMetadata};
use crate::password::generate_admin_password;
use crate::port::allocate_port;
use crate::validate::validate_branch_name;
use chrono::Utc;
use quic_os::audit::AuditRecord;
use quic_os::pgconf;
use quic_os::systemd::render_pg_ctl_unit;
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};

const STARTUP_POLL_INTERVAL: Duration = Duration::from_millis(500);
const STARTUP_TIMEOUT: Duration = Duration::from_secs(30);

impl BranchEngine {
    /// Create (or idempotently return) a branch.
    pub async fn create_branch(
        &self,
        branch_name: &str,
        template_name: &str,
        created_by: &str,
    ) -> Result<BranchInfo> {
        let branch = validate_branch_name(branch_name)?;

        let dataset = quic_naming::branch_dataset(&self.config.pool, template_name, &branch);
        let branch_path =
            quic_naming::branch_mountpoint(&self.config.mount_root, template_name, &branch);

        // Idempotence probe (step 3).
        if self.zfs.dataset_exists(&dataset).await? {
            return self.discover_existing(template_name, &branch, &dataset, &branch_path).await;
        }

        // Template must exist (step 4).
        let template_dataset = quic_naming::template_dataset(&self.config.pool, template_name);
        if !self.zfs.dataset_exists(&template_dataset).await? {
            return Err(Error::TemplateNotFound {
                template: template_name.to_string(),
            });
        }

        // Port allocation (step 5).
        let port = allocate_port(
            self.firewall.as_ref(),
            self.config.port_range.0,
            self.config.port_range.1,
        )
        .await?;

        // Admin password (step 6).
        let admin_password = generate_admin_password();

        // Snapshot with consistency (step 7).
        let snapshot = quic_naming::snapshot_name(&self.config.pool, template_name, &branch);
        if !self.zfs.snapshot_exists(&snapshot).await? {
            self.checkpoint_template_if_running(template_name).await;
            self.zfs.snapshot(&snapshot).await?;
            self.audit
                .write(AuditRecord::new(
                    "zfs_snapshot_create",
                    json!({"template": template_name, "branch": branch, "snapshot": snapshot}),
                ))
                .await;
        }

        // Clone (step 8).
        if !self.zfs.dataset_exists(&dataset).await? {
            self.zfs.clone(&snapshot, &dataset, &branch_path).await?;
            self.audit
                .write(AuditRecord::new(
                    "zfs_clone_create",
                    json!({"template": template_name, "branch": branch, "dataset": dataset}),
                ))
                .await;
        }

        // Clone preparation (step 9).
        self.prepare_clone(&branch_path).await?;

        // Metadata (step 10).
        let now = Utc::now();
        let metadata = BranchMetadata {
            branch_name: branch.clone(),
            port,
            branch_path: branch_path.clone(),
            admin_password: admin_password.clone(),
            created_by: created_by.to_string(),
            created_at: now,
            updated_at: now,
        };
        write_branch_metadata(&branch_path, &metadata).await?;

        // Service install + start (step 11).
        let service_name = quic_naming::branch_service(template_name, &branch);
        let unit = render_pg_ctl_unit(
            &format!("Quic branch {template_name}/{branch}"),
            &self.config.pg_user,
            &branch_path,
            port,
            "always",
            2,
        );
        self.systemd.write_unit(&service_name, &unit).await?;
        self.systemd.start(&service_name).await?;
        self.audit
            .write(AuditRecord::new(
                "systemd_service_start",
                json!({"service": service_name}),
            ))
            .await;
        self.wait_until_ready(port, &service_name).await?;

        // Firewall (step 12).
        self.firewall.open(port).await?;

        // Admin role provisioning (step 13).
        self.provision_admin(port, &admin_password).await?;

        // Audit + return (step 14).
        self.audit
            .write(AuditRecord::new(
                "branch_create",
                json!({
                    "template": template_name,
                    "branch": branch,
                    "port": port,
                    "created_by": created_by,
                }),
            ))
            .await;

        Ok(BranchInfo::from_metadata(template_name, &metadata))
    }

    async fn discover_existing(
        &self,
        template_name: &str,
        branch: &str,
        _dataset: &str,
        branch_path: &std::path::Path,
    ) -> Result<BranchInfo> {
        match read_branch_metadata(branch_path).await {
            Ok(meta) => Ok(BranchInfo::from_metadata(template_name, &meta)),
            Err(e) => {
                warn!(branch, error = %e, "existing branch dataset has unreadable metadata; returning partial info");
                Ok(BranchInfo::partial(template_name, branch, branch_path.to_path_buf()))
            }
        }
    }

    async fn checkpoint_template_if_running(&self, template_name: &str) {
        let template_path =
            quic_naming::template_mountpoint(&self.config.mount_root, template_name);
        let Some(port) = pgconf::read_postmaster_port(&template_path).await else {
            return;
        };
        if !self.postgres.pg_is_ready(port).await.unwrap_or(false) {
            return;
        }
        if let Err(e) = self.postgres.psql(port, "postgres", "CHECKPOINT;").await {
            warn!(template = template_name, error = %e, "CHECKPOINT before snapshot failed; proceeding anyway");
        }
    }

    async fn prepare_clone(&self, branch_path: &std::path::Path) -> Result<()> {
        pgconf::remove_recovery_markers(branch_path).await?;
        self.postgres.pg_reset_wal(branch_path).await?;

        tokio::fs::write(
            branch_path.join("postgresql.auto.conf"),
            render_branch_auto_conf(),
        )
        .await?;

        let conf_path = branch_path.join("postgresql.conf");
        let conf_overrides: Vec<(&str, &str)> = {
            let mut overrides = BRANCH_CONF_OVERRIDES.to_vec();
            overrides.push(("ssl_cert_file", &self.config.ssl_cert_file));
            overrides.push(("ssl_key_file", &self.config.ssl_key_file));
            overrides
        };
        let current = tokio::fs::read_to_string(&conf_path).await.unwrap_or_default();
        let updated = pgconf::apply_overrides(&current, &conf_overrides);
        tokio::fs::write(&conf_path, updated).await?;

        tokio::fs::write(
            branch_path.join("pg_hba.conf"),
            render_branch_hba_conf(),
        )
        .await?;

        Ok(())
    }

    async fn wait_until_ready(&self, port: u16, service_name: &str) -> Result<()> {
        let deadline = tokio::time::Instant::now() + STARTUP_TIMEOUT;
        loop {
            if self.postgres.pg_is_ready(port).await.unwrap_or(false) {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(Error::StartupTimeout {
                    service: service_name.to_string(),
                });
            }
            tokio::time::sleep(STARTUP_POLL_INTERVAL).await;
        }
    }

    async fn provision_admin(&self, port: u16, password: &str) -> Result<()> {
        let escaped = password.replace('\'', "''");
        let sql = format!(
            "DO $$ BEGIN \
             CREATE ROLE admin WITH LOGIN SUPERUSER PASSWORD '{escaped}'; \
             EXCEPTION WHEN duplicate_object THEN \
             ALTER ROLE admin WITH PASSWORD '{escaped}'; \
             END $$;"
        );
        self.postgres
            .psql(port, "postgres", &sql)
            .await
            .map_err(|e| Error::AdminProvisionFailed {
                message: e.to_string(),
            })?;

        self.postgres
            .psql(port, "postgres", "GRANT ALL PRIVILEGES ON DATABASE postgres TO admin;")
            .await
            .map_err(|e| Error::AdminProvisionFailed {
                message: e.to_string(),
            })?;

        info!(port, "admin role provisioned");
        Ok(())
    }
}

pub(crate) async fn write_branch_metadata(
    branch_path: &std::path::Path,
    metadata: &BranchMetadata,
) -> Result<()> {
    let path = branch_path.join(".quic-meta.json");
    let json = serde_json::to_string_pretty(metadata)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, &path).await?;
    Ok(())
}

pub(crate) async fn read_branch_metadata(branch_path: &std::path::Path) -> Result<BranchMetadata> {
    let path = branch_path.join(".quic-meta.json");
    let content = tokio::fs::read_to_string(&path).await?;
    Ok(serde_json::from_str(&content)?)
}
