//! `ServiceFacade`: the entry point an RPC layer calls into (spec §4.E).

use crate::error::{Error, Result};
use crate::gate::ConcurrencyGate;
use quic_branch::{BranchEngine, BranchInfo, BranchSummary};
use quic_template::{ProgressSink, TemplateEngine, TemplateSetupRequest, TemplateSetupResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Composes the branch and template engines behind validation, the
/// concurrency gate, and caller attribution.
#[derive(Clone)]
pub struct ServiceFacade {
    branch_engine: BranchEngine,
    template_engine: TemplateEngine,
    gate: Arc<ConcurrencyGate>,
}

impl ServiceFacade {
    pub fn new(branch_engine: BranchEngine, template_engine: TemplateEngine) -> Self {
        Self {
            branch_engine,
            template_engine,
            gate: Arc::new(ConcurrencyGate::new()),
        }
    }

    /// Create (or idempotently return) a branch. `caller` is the
    /// authenticated identity resolved by the RPC layer's interceptor
    /// (spec §4.E.3, §6).
    pub async fn create_branch(&self, branch_name: &str, template_name: &str, caller: &str) -> Result<BranchInfo> {
        let _permit = self.gate.try_lock_with_shutdown_check().await.ok_or(Error::ShutdownInProgress)?;
        let info = self.branch_engine.create_branch(branch_name, template_name, caller).await?;
        Ok(info)
    }

    /// Delete a branch. Returns `true` if any resource was reclaimed.
    pub async fn delete_branch(&self, branch_name: &str, template_name: &str) -> Result<bool> {
        let _permit = self.gate.try_lock_with_shutdown_check().await.ok_or(Error::ShutdownInProgress)?;
        let deleted = self.branch_engine.delete_branch(branch_name, template_name).await?;
        Ok(deleted)
    }

    /// List branches. Does not take the concurrency gate (spec §5: reads
    /// are best-effort consistent against ZFS list semantics and atomic
    /// metadata writes).
    pub async fn list_branches(&self, template_filter: Option<&str>) -> Vec<BranchSummary> {
        self.branch_engine
            .list_branches(template_filter)
            .await
            .iter()
            .filter_map(BranchSummary::from_info)
            .collect()
    }

    /// Stream a template setup to completion. Does not take the
    /// concurrency gate: template setup is explicitly non-idempotent and
    /// operates on a dataset no branch create can be racing against until
    /// it is fully committed.
    pub async fn template_setup_stream(
        &self,
        request: TemplateSetupRequest,
        sink: &mut dyn ProgressSink,
    ) -> Result<TemplateSetupResult> {
        let result = self.template_engine.run(request, sink).await?;
        Ok(result)
    }

    /// Begin graceful shutdown: no further mutating call is admitted past
    /// this point; waits up to `timeout` for any in-flight mutation to
    /// finish.
    pub async fn shutdown(&self, timeout: Duration) -> Result<()> {
        info!("service facade shutting down");
        if self.gate.shutdown(timeout).await {
            Ok(())
        } else {
            Err(Error::ShutdownTimedOut)
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.gate.is_shutting_down()
    }
}
