//! `ListBranches` (spec §4.D.3).

use crate::create::read_branch_metadata;
use crate::engine::BranchEngine;
use crate::model::BranchInfo;
use quic_naming::RESTORE_RESERVED_NAME;
use tracing::warn;

impl BranchEngine {
    /// Enumerate branches, optionally filtered to a single template. A
    /// non-existent template filter returns an empty list, never an error
    /// (this call never takes the mutating-operation lock; see spec §5).
    pub async fn list_branches(&self, template_filter: Option<&str>) -> Vec<BranchInfo> {
        let root = match template_filter {
            Some(template) => quic_naming::template_dataset(&self.config.pool, template),
            None => self.config.pool.clone(),
        };

        let descendants = match self.zfs.list_descendants(&root).await {
            Ok(d) => d,
            Err(_) => return Vec::new(),
        };

        let mut branches = Vec::new();
        for dataset in descendants {
            let segments: Vec<&str> = dataset.split('/').collect();
            // `<pool>/<template>/<branch>`: exactly three segments.
            if segments.len() != 3 {
                continue;
            }
            let (pool, template, branch) = (segments[0], segments[1], segments[2]);
            if pool != self.config.pool {
                continue;
            }
            if branch == RESTORE_RESERVED_NAME {
                continue;
            }
            if let Some(filter) = template_filter {
                if template != filter {
                    continue;
                }
            }

            let branch_path = quic_naming::branch_mountpoint(&self.config.mount_root, template, branch);
            match read_branch_metadata(&branch_path).await {
                Ok(meta) => branches.push(BranchInfo::from_metadata(template, &meta)),
                Err(e) => {
                    warn!(dataset, error = %e, "skipping branch dataset with unparseable metadata");
                }
            }
        }

        branches
    }
}
