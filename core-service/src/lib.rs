//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided collaborator services (workspace, series
//! service, asset manager, distribution, service registry) from a
//! [`CoreConfig`] into the workflow operation handlers and drives workflow
//! instances through their operations.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use core_service::CoreService;
//!
//! let config = CoreConfig::builder().workspace(workspace).build()?;
//! let core = CoreService::new(config);
//! let state = core.run(&mut workflow).await?;
//! ```

pub mod error;
pub mod registry;

pub use error::{CoreError, Result};
pub use registry::OperationHandlerRegistry;

use core_runtime::config::CoreConfig;
use core_runtime::logging::{init_logging, LoggingConfig};
use core_workflow::{
    FailureOutcome, JobContext, OperationState, WorkflowInstance, WorkflowState,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    config: Arc<CoreConfig>,
    handlers: Arc<OperationHandlerRegistry>,
}

impl CoreService {
    /// Creates a service with every handler `config` can support.
    pub fn new(config: CoreConfig) -> Self {
        let handlers = OperationHandlerRegistry::from_config(&config);
        Self::with_handlers(config, handlers)
    }

    /// Creates a service with an explicit handler registry.
    pub fn with_handlers(config: CoreConfig, handlers: OperationHandlerRegistry) -> Self {
        Self {
            config: Arc::new(config),
            handlers: Arc::new(handlers),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn handlers(&self) -> &OperationHandlerRegistry {
        &self.handlers
    }

    /// Runs the current operation of `workflow` once.
    ///
    /// A paused operation is resumed with `properties`; any other operation
    /// is started. Handler failures are applied to the workflow through the
    /// operation's retry strategy and do not surface as errors.
    ///
    /// # Errors
    ///
    /// Fails when the workflow has no current operation, when no handler is
    /// registered for it, or when the result cannot be applied.
    pub async fn run_current_operation(
        &self,
        workflow: &mut WorkflowInstance,
        properties: Option<&BTreeMap<String, String>>,
    ) -> Result<WorkflowState> {
        let operation = workflow.current_operation().ok_or_else(|| {
            CoreError::IllegalState(format!("workflow {} has no current operation", workflow.id()))
        })?;
        let template = operation.template().to_string();
        let paused = operation.state() == OperationState::Paused;
        let handler = self
            .handlers
            .handler(&template)
            .ok_or_else(|| CoreError::UnknownOperation(template.clone()))?;

        workflow.start_current()?;
        let context = JobContext::for_workflow(workflow.id());
        let span = info_span!("operation", workflow = workflow.id(), operation = %template);

        let outcome = async {
            match (paused, properties) {
                (true, Some(properties)) => handler.resume(workflow, &context, properties).await,
                (true, None) => handler.resume(workflow, &context, &BTreeMap::new()).await,
                (false, _) => handler.start(workflow, &context).await,
            }
        }
        .instrument(span)
        .await;

        match outcome {
            Ok(result) => {
                debug!(workflow = workflow.id(), operation = %template, action = ?result.action, "Operation finished");
                workflow.apply_result(result)?;
            }
            Err(e) => {
                let failure = workflow.fail_current(&e.to_string())?;
                match failure {
                    FailureOutcome::Failed => {
                        warn!(workflow = workflow.id(), operation = %template, error = %e, "Workflow failed")
                    }
                    FailureOutcome::Retry => {
                        info!(workflow = workflow.id(), operation = %template, "Retrying failed operation")
                    }
                    FailureOutcome::Hold => {
                        info!(workflow = workflow.id(), operation = %template, "Holding workflow for error resolution")
                    }
                }
            }
        }
        Ok(workflow.state())
    }

    /// Runs operations until the workflow pauses or reaches a terminal state.
    pub async fn run(&self, workflow: &mut WorkflowInstance) -> Result<WorkflowState> {
        while workflow.current_index().is_some() && workflow.state() != WorkflowState::Paused {
            self.run_current_operation(workflow, None).await?;
        }
        info!(workflow = workflow.id(), state = ?workflow.state(), "Workflow stopped");
        Ok(workflow.state())
    }

    /// Resumes a paused workflow with `properties` and keeps running it.
    pub async fn resume(
        &self,
        workflow: &mut WorkflowInstance,
        properties: &BTreeMap<String, String>,
    ) -> Result<WorkflowState> {
        if workflow.state() != WorkflowState::Paused {
            return Err(CoreError::IllegalState(format!(
                "workflow {} is not paused",
                workflow.id()
            )));
        }
        self.run_current_operation(workflow, Some(properties)).await?;
        self.run(workflow).await
    }
}

/// Initializes logging and creates a [`CoreService`].
///
/// Logging that cannot be installed, e.g. because the host already set a
/// subscriber, is reported and otherwise ignored.
pub fn bootstrap(config: CoreConfig, logging: LoggingConfig) -> Result<CoreService> {
    config.validate()?;
    if let Err(e) = init_logging(logging) {
        warn!(error = %e, "Unable to initialize logging");
    }
    Ok(CoreService::new(config))
}
