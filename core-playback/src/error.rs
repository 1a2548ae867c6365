//! # Playback Error Types
//!
//! Error types for track resolution and engine operations.

use bridge_traits::BridgeError;
use std::time::Duration;
use thiserror::Error;

/// Why a track could not be turned into a playable resource.
///
/// Resolution errors never escape to the user verbatim: a failed preload
/// just marks the cache entry, and a failed direct load surfaces as a
/// generic "can't play this track".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// The track or its backing file no longer exists.
    #[error("Track not found: {0}")]
    NotFound(String),

    /// The host refused scoped access (revoked grant, sandbox).
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Resolution timed out after {0:?}")]
    Timeout(Duration),
}

impl ResolutionError {
    /// Returns `true` if retrying the same track may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ResolutionError::IoError(_) | ResolutionError::Timeout(_))
    }
}

impl From<BridgeError> for ResolutionError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::NotFound(what) => ResolutionError::NotFound(what),
            BridgeError::PermissionDenied(what) => ResolutionError::AccessDenied(what),
            other => ResolutionError::IoError(other.to_string()),
        }
    }
}

/// Errors returned by engine and snapshot operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("Resolution failed: {0}")]
    Resolution(#[from] ResolutionError),

    /// Host bridge call failed (adapter, shared store).
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Queue index {index} out of range (queue length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Snapshot serialization failed: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// The engine actor has stopped; no further commands are accepted.
    #[error("Playback engine is not running")]
    EngineStopped,

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl PlaybackError {
    /// Returns `true` if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        match self {
            PlaybackError::Resolution(err) => err.is_transient(),
            PlaybackError::Bridge(BridgeError::Io(_)) => true,
            _ => false,
        }
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_error_mapping() {
        assert_eq!(
            ResolutionError::from(BridgeError::NotFound("t1".into())),
            ResolutionError::NotFound("t1".into())
        );
        assert_eq!(
            ResolutionError::from(BridgeError::PermissionDenied("t1".into())),
            ResolutionError::AccessDenied("t1".into())
        );
        assert!(matches!(
            ResolutionError::from(BridgeError::OperationFailed("disk".into())),
            ResolutionError::IoError(_)
        ));
        assert!(matches!(
            ResolutionError::from(BridgeError::Io(std::io::Error::other("eio"))),
            ResolutionError::IoError(_)
        ));
    }

    #[test]
    fn test_transient_classification() {
        assert!(ResolutionError::Timeout(Duration::from_secs(8)).is_transient());
        assert!(ResolutionError::IoError("x".into()).is_transient());
        assert!(!ResolutionError::NotFound("x".into()).is_transient());
        assert!(!PlaybackError::EngineStopped.is_transient());
        assert!(PlaybackError::from(ResolutionError::IoError("x".into())).is_transient());
    }
}
