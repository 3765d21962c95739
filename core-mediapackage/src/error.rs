use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaPackageError {
    #[error("Invalid flavor: {0}")]
    InvalidFlavor(String),

    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Invalid uri: {0}")]
    InvalidUri(String),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Namespace binding error: {0}")]
    NamespaceBinding(String),

    #[error("Unsupported element: {0}")]
    UnsupportedElement(String),

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Invalid argument: {field} - {message}")]
    InvalidArgument { field: String, message: String },
}

pub type Result<T> = std::result::Result<T, MediaPackageError>;
