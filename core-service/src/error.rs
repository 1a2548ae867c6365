use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Background task failed: {0}")]
    TaskFailed(String),

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Playback error: {0}")]
    Playback(#[from] core_playback::PlaybackError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::BridgeError),
}

impl CoreError {
    /// Returns `true` if the failed operation may succeed when retried.
    pub fn is_transient(&self) -> bool {
        match self {
            CoreError::Playback(err) => err.is_transient(),
            CoreError::Bridge(bridge_traits::BridgeError::Io(_)) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
