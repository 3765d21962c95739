use bridge_traits::BridgeError;
use core_mediapackage::MediaPackageError;
use core_metadata::MetadataError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkflowOperationError {
    #[error("Configuration key '{key}' is either missing or empty")]
    MissingConfiguration { key: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Media package error: {0}")]
    MediaPackage(#[from] MediaPackageError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Service error: {0}")]
    Service(#[from] BridgeError),

    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("No handler registered for operation {0}")]
    UnknownOperation(String),

    #[error("Illegal workflow state: {0}")]
    IllegalState(String),

    #[error("Operation failed: {0}")]
    Failed(String),
}

impl WorkflowOperationError {
    pub(crate) fn must_be_set(key: &str) -> Self {
        Self::InvalidConfiguration(format!("Configuration key '{}' must be set", key))
    }

    pub(crate) fn invalid_flavor(value: &str) -> Self {
        Self::InvalidConfiguration(format!("{} is not a valid flavor!", value))
    }
}

pub type Result<T> = std::result::Result<T, WorkflowOperationError>;
