use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The receiving process is not running or not listening.
    #[error("Process unreachable: {0}")]
    Unreachable(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Returns `true` when the failure means the other side of a one-way
    /// channel could not be reached.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, BridgeError::Unreachable(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
