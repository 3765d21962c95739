use core_mediapackage::MediaPackageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Invalid value for field {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Invalid field configuration: {0}")]
    Configuration(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Media package error: {0}")]
    MediaPackage(#[from] MediaPackageError),
}

pub type Result<T> = std::result::Result<T, MetadataError>;
