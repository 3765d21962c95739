//! `retract-configure` operation

use async_trait::async_trait;
use bridge_traits::{DistributionService, ServiceRegistry};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::publication::{retract_publications, CHANNEL_ID};
use crate::error::{Result, WorkflowOperationError};
use crate::handler::WorkflowOperationHandler;
use crate::instance::{Action, JobContext, WorkflowInstance, WorkflowOperationResult};
use crate::job_barrier::JobBarrier;
use crate::operation_config::current_operation;

pub const OPERATION_ID: &str = "retract-configure";

/// Retracts the publications of `channel-id` and removes them from the
/// media package
pub struct ConfigurableRetractWorkflowOperationHandler {
    distribution: Arc<dyn DistributionService>,
    barrier: JobBarrier,
}

impl ConfigurableRetractWorkflowOperationHandler {
    pub fn new(
        distribution: Arc<dyn DistributionService>,
        registry: Arc<dyn ServiceRegistry>,
        polling_interval: Duration,
    ) -> Self {
        Self {
            distribution,
            barrier: JobBarrier::new(registry, polling_interval),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.barrier = self.barrier.with_timeout(timeout);
        self
    }
}

#[async_trait]
impl WorkflowOperationHandler for ConfigurableRetractWorkflowOperationHandler {
    fn id(&self) -> &str {
        OPERATION_ID
    }

    fn description(&self) -> &str {
        "Retract a publication from a configurable channel"
    }

    async fn start(
        &self,
        workflow: &WorkflowInstance,
        _context: &JobContext,
    ) -> Result<WorkflowOperationResult> {
        let operation = current_operation(workflow)?;
        let channel_id = operation
            .opt_config(CHANNEL_ID)
            .ok_or_else(|| WorkflowOperationError::must_be_set(CHANNEL_ID))?;

        let mut mp = workflow.media_package().clone();
        let removed =
            retract_publications(self.distribution.as_ref(), &self.barrier, &mut mp, channel_id)
                .await?;
        if removed == 0 {
            info!(
                media_package = %mp.identifier(),
                channel = channel_id,
                "Nothing published on channel"
            );
        }
        Ok(WorkflowOperationResult::of(mp, Action::Continue))
    }
}
