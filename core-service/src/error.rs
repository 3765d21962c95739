use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("No handler registered for operation {0}")]
    UnknownOperation(String),

    #[error("Illegal workflow state: {0}")]
    IllegalState(String),

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Workflow error: {0}")]
    Workflow(#[from] core_workflow::WorkflowOperationError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
