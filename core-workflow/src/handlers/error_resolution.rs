//! `error-resolution` operation

use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::info;

use crate::error::{Result, WorkflowOperationError};
use crate::handler::WorkflowOperationHandler;
use crate::instance::{
    Action, JobContext, RetryStrategy, WorkflowInstance, WorkflowOperationResult,
    ERROR_RESOLUTION_OPERATION, RETRY_STRATEGY_PROPERTY,
};

pub const OPERATION_ID: &str = ERROR_RESOLUTION_OPERATION;

/// Holds a workflow after a failure until someone decides how to go on
///
/// Resuming requires the `retryStrategy` property: `retry` runs the failed
/// operation again, `none` fails the workflow.
#[derive(Debug, Default)]
pub struct ErrorResolutionWorkflowOperationHandler;

impl ErrorResolutionWorkflowOperationHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl WorkflowOperationHandler for ErrorResolutionWorkflowOperationHandler {
    fn id(&self) -> &str {
        OPERATION_ID
    }

    fn description(&self) -> &str {
        "Wait for a decision on how to handle a failed operation"
    }

    async fn start(
        &self,
        workflow: &WorkflowInstance,
        _context: &JobContext,
    ) -> Result<WorkflowOperationResult> {
        info!(workflow = workflow.id(), "Holding workflow for error resolution");
        Ok(WorkflowOperationResult::of(
            workflow.media_package().clone(),
            Action::Pause,
        ))
    }

    async fn resume(
        &self,
        workflow: &WorkflowInstance,
        _context: &JobContext,
        properties: &BTreeMap<String, String>,
    ) -> Result<WorkflowOperationResult> {
        let value = properties
            .get(RETRY_STRATEGY_PROPERTY)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                WorkflowOperationError::InvalidConfiguration(format!(
                    "{} property is required",
                    RETRY_STRATEGY_PROPERTY
                ))
            })?;
        let strategy: RetryStrategy = value.parse()?;
        if strategy == RetryStrategy::Hold {
            return Err(WorkflowOperationError::InvalidConfiguration(
                "an error resolution cannot be resolved by holding again".to_string(),
            ));
        }

        info!(workflow = workflow.id(), retry_strategy = %strategy, "Error resolved");
        Ok(
            WorkflowOperationResult::of(workflow.media_package().clone(), Action::Continue)
                .with_property(RETRY_STRATEGY_PROPERTY, strategy.as_str()),
        )
    }
}
