use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::error::Result;
use crate::instance::{Action, JobContext, WorkflowInstance, WorkflowOperationResult};

/// Strategy executing one kind of workflow operation
///
/// Handlers are stateless between invocations. They read the configuration
/// of the workflow's current operation, work on a copy of its media package
/// and hand the outcome back as a [`WorkflowOperationResult`].
#[async_trait]
pub trait WorkflowOperationHandler: Send + Sync {
    /// Operation id this handler is registered under, e.g. `tag`.
    fn id(&self) -> &str;

    fn description(&self) -> &str;

    /// Runs the current operation of `workflow`.
    async fn start(
        &self,
        workflow: &WorkflowInstance,
        context: &JobContext,
    ) -> Result<WorkflowOperationResult>;

    /// Called instead of [`start`](Self::start) when the operation is
    /// skipped by the workflow definition.
    async fn skip(
        &self,
        workflow: &WorkflowInstance,
        _context: &JobContext,
    ) -> Result<WorkflowOperationResult> {
        Ok(WorkflowOperationResult::of(
            workflow.media_package().clone(),
            Action::Skip,
        ))
    }

    /// Continues a paused operation with the properties supplied by whoever
    /// released it.
    async fn resume(
        &self,
        workflow: &WorkflowInstance,
        _context: &JobContext,
        properties: &BTreeMap<String, String>,
    ) -> Result<WorkflowOperationResult> {
        Ok(
            WorkflowOperationResult::of(workflow.media_package().clone(), Action::Continue)
                .with_properties(properties.clone()),
        )
    }

    /// Releases whatever the operation left behind once the workflow ends.
    async fn destroy(&self, _workflow: &WorkflowInstance, _context: &JobContext) -> Result<()> {
        Ok(())
    }
}
