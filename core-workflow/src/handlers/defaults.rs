//! `defaults` operation

use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::Result;
use crate::handler::WorkflowOperationHandler;
use crate::instance::{Action, JobContext, WorkflowInstance, WorkflowOperationResult};
use crate::operation_config::current_operation;

pub const OPERATION_ID: &str = "defaults";

/// Fills in workflow configuration that is missing or blank
///
/// Every key of the operation's configuration is a default for the workflow
/// configuration key of the same name. The values to apply are returned as
/// result properties, which the workflow merges into its configuration.
#[derive(Debug, Default)]
pub struct DefaultsWorkflowOperationHandler;

impl DefaultsWorkflowOperationHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl WorkflowOperationHandler for DefaultsWorkflowOperationHandler {
    fn id(&self) -> &str {
        OPERATION_ID
    }

    fn description(&self) -> &str {
        "Apply default workflow configuration values"
    }

    async fn start(
        &self,
        workflow: &WorkflowInstance,
        _context: &JobContext,
    ) -> Result<WorkflowOperationResult> {
        let operation = current_operation(workflow)?;

        let mut defaults = BTreeMap::new();
        for key in operation.configuration_keys() {
            let unset = workflow
                .configuration(key)
                .map(|v| v.trim().is_empty())
                .unwrap_or(true);
            if !unset {
                continue;
            }
            if let Some(value) = operation.configuration(key) {
                debug!(workflow = workflow.id(), key, value, "Applying default");
                defaults.insert(key.to_string(), value.to_string());
            }
        }

        Ok(
            WorkflowOperationResult::of(workflow.media_package().clone(), Action::Continue)
                .with_properties(defaults),
        )
    }
}
