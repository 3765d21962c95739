//! # Workflow Module
//!
//! Workflow operation handlers and the state they operate on.
//!
//! ## Overview
//!
//! This module handles:
//! - Workflow and operation instances, operation results and retry strategies
//! - The [`WorkflowOperationHandler`] contract implemented by every operation
//! - Reading operation configuration (tags, flavors, flags, lists)
//! - Selecting elements by flavor and tag, and the `+`/`-` tag delta rule
//! - Waiting for service jobs through the [`JobBarrier`]
//! - The handler catalogue in [`handlers`]
//!
//! ## Usage
//!
//! ```ignore
//! use core_workflow::handlers::TagWorkflowOperationHandler;
//! use core_workflow::{JobContext, WorkflowInstance, WorkflowOperationHandler, WorkflowOperationInstance};
//!
//! let handler = TagWorkflowOperationHandler::new(workspace);
//! let operation = WorkflowOperationInstance::new("tag")
//!     .with_configuration("source-flavors", "presenter/source")
//!     .with_configuration("target-tags", "+archive");
//! let mut workflow = WorkflowInstance::new(1, media_package, vec![operation]);
//!
//! workflow.start_current()?;
//! let result = handler.start(&workflow, &JobContext::for_workflow(workflow.id())).await?;
//! workflow.apply_result(result)?;
//! ```

pub mod error;
pub mod handler;
pub mod handlers;
pub mod instance;
pub mod job_barrier;
pub mod operation_config;
pub mod selector;
pub mod tags;

pub use error::{Result, WorkflowOperationError};
pub use handler::WorkflowOperationHandler;
pub use instance::{
    Action, FailureOutcome, JobContext, OperationState, RetryStrategy, WorkflowInstance,
    WorkflowOperationInstance, WorkflowOperationResult, WorkflowState,
};
pub use job_barrier::{BarrierResult, JobBarrier};
pub use operation_config::{Configuration, ConfiguredTagsAndFlavors};
pub use selector::SimpleElementSelector;
pub use tags::TagDelta;
