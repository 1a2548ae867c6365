//! Application Lifecycle
//!
//! Lets the core know when the host is about to suspend the main process, so
//! that incoming control signals can be dropped instead of being applied late.

use async_trait::async_trait;

use crate::error::Result;

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Application is in the foreground and active
    Foreground,
    /// Application is in the background but still running
    Background,
    /// Application is suspended; nothing runs until the user reopens it
    Suspended,
}

impl LifecycleState {
    /// Whether control signals can be applied in this state.
    pub fn accepts_signals(&self) -> bool {
        !matches!(self, LifecycleState::Suspended)
    }
}

/// Lifecycle observer trait
///
/// # Platform Support
///
/// - **iOS**: UIApplication lifecycle notifications
/// - **Android**: Activity/Application lifecycle callbacks
/// - **Desktop**: driven by the host shell, usually always foreground
#[async_trait]
pub trait LifecycleObserver: Send + Sync {
    /// Get current lifecycle state
    async fn get_state(&self) -> Result<LifecycleState>;

    /// Subscribe to lifecycle state changes
    async fn subscribe_changes(&self) -> Result<Box<dyn LifecycleChangeStream>>;
}

/// Stream of lifecycle state changes
#[async_trait]
pub trait LifecycleChangeStream: Send {
    /// Get the next lifecycle state update
    ///
    /// Returns `None` when the stream is closed.
    async fn next(&mut self) -> Option<LifecycleState>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_suspended_rejects_signals() {
        assert!(LifecycleState::Foreground.accepts_signals());
        assert!(LifecycleState::Background.accepts_signals());
        assert!(!LifecycleState::Suspended.accepts_signals());
    }
}
