//! `DeleteBranch` (spec §4.D.2).

use crate::create::read_branch_metadata;
use crate::engine::BranchEngine;
use crate::error::Result;
use crate::validate::validate_branch_name;
use quic_os::audit::AuditRecord;
use serde_json::json;
use tracing::warn;

impl BranchEngine {
    /// Delete a branch, reclaiming every resource it owns. Idempotent:
    /// returns `Ok(false)` if nothing was found to destroy.
    pub async fn delete_branch(&self, branch_name: &str, template_name: &str) -> Result<bool> {
        let branch = validate_branch_name(branch_name)?;

        let dataset = quic_naming::branch_dataset(&self.config.pool, template_name, &branch);
        let snapshot = quic_naming::snapshot_name(&self.config.pool, template_name, &branch);
        let branch_path =
            quic_naming::branch_mountpoint(&self.config.mount_root, template_name, &branch);
        let service_name = quic_naming::branch_service(template_name, &branch);

        let mut destroyed_something = false;

        // Recover bound port, best-effort (step 2).
        let port = read_branch_metadata(&branch_path).await.ok().map(|m| m.port);

        // Close firewall port (step 3).
        if let Some(port) = port {
            if let Err(e) = self.firewall.close(port).await {
                warn!(branch, port, error = %e, "failed to close firewall rule during delete");
            }
        }

        // Remove systemd unit (step 4).
        let service_file = quic_naming::service_file(&service_name);
        if tokio::fs::metadata(&service_file).await.is_ok() {
            if let Err(e) = self.systemd.remove(&service_name).await {
                warn!(branch, service = %service_name, error = %e, "failed to remove systemd unit during delete");
            } else {
                destroyed_something = true;
            }
        }

        // Destroy snapshot (and its derived clone) recursively (step 5).
        if self.zfs.snapshot_exists(&snapshot).await.unwrap_or(false) {
            self.zfs.destroy(&snapshot, true).await?;
            destroyed_something = true;
            self.audit
                .write(AuditRecord::new(
                    "zfs_clone_destroy",
                    json!({"template": template_name, "branch": branch, "dataset": dataset}),
                ))
                .await;
            self.audit
                .write(AuditRecord::new(
                    "zfs_snapshot_destroy",
                    json!({"template": template_name, "branch": branch, "snapshot": snapshot}),
                ))
                .await;
        } else if self.zfs.dataset_exists(&dataset).await.unwrap_or(false) {
            // No snapshot but a stray clone dataset: reclaim it directly
            // (partially-materialized branch, spec §4.D.4).
            self.zfs.destroy(&dataset, true).await?;
            destroyed_something = true;
        }

        // Best-effort rmdir of the mountpoint (step 6).
        match tokio::fs::remove_dir(&branch_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(branch, error = %e, "failed to remove branch mountpoint directory"),
        }

        // Audit (step 7).
        if destroyed_something {
            self.audit
                .write(AuditRecord::new(
                    "branch_delete",
                    json!({"template": template_name, "branch": branch}),
                ))
                .await;
        }

        Ok(destroyed_something)
    }
}
