//! Control Channel Types and Traits
//!
//! The control surface runs in its own process and can only talk to the main
//! process through a one-way, best-effort channel. This module defines the
//! signal that travels over that channel and the traits each side implements.
//!
//! Delivery guarantees are deliberately weak:
//! - no acknowledgement
//! - no ordering across suspend/resume
//! - duplicates are possible
//! - delivery to a suspended process is dropped
//!
//! Consumers must therefore be idempotence-safe.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// The three commands a control surface can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    Toggle,
    Next,
    Previous,
}

impl ControlKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlKind::Toggle => "toggle",
            ControlKind::Next => "next",
            ControlKind::Previous => "previous",
        }
    }
}

impl fmt::Display for ControlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A command in flight between processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlSignal {
    pub kind: ControlKind,
    /// Sender wall-clock time, Unix epoch milliseconds.
    pub sent_at_ms: i64,
}

impl ControlSignal {
    pub fn new(kind: ControlKind, sent_at_ms: i64) -> Self {
        Self { kind, sent_at_ms }
    }

    /// Encode for the wire.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode from the wire.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Sender half, used by the control-surface process.
#[async_trait]
pub trait SignalTransport: Send + Sync {
    /// Hand a signal to the channel and return immediately.
    ///
    /// Returns [`BridgeError::Unreachable`](crate::BridgeError::Unreachable)
    /// when the main process is not listening. Callers must not retry.
    async fn deliver(&self, signal: ControlSignal) -> Result<()>;
}

/// Receiver half, owned by the main process.
#[async_trait]
pub trait SignalReceiver: Send {
    /// Wait for the next signal.
    ///
    /// Returns `None` when the channel is closed for good. Malformed payloads
    /// are skipped by the implementation, not surfaced.
    async fn next(&mut self) -> Option<ControlSignal>;
}

/// Launches (or foregrounds) the main application.
///
/// This is the control surface's only recovery path once signals are being
/// dropped because the main process is suspended.
#[async_trait]
pub trait AppLauncher: Send + Sync {
    async fn open_main_application(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_wire_format() {
        let signal = ControlSignal::new(ControlKind::Next, 1_700_000_000_000);
        let bytes = signal.to_bytes().unwrap();
        assert_eq!(
            std::str::from_utf8(&bytes).unwrap(),
            r#"{"kind":"next","sent_at_ms":1700000000000}"#
        );
        assert_eq!(ControlSignal::from_bytes(&bytes).unwrap(), signal);
    }

    #[test]
    fn malformed_payload_is_an_error() {
        assert!(ControlSignal::from_bytes(b"{\"kind\":\"rewind\"}").is_err());
        assert!(ControlSignal::from_bytes(b"").is_err());
    }

    #[test]
    fn kind_display() {
        assert_eq!(ControlKind::Toggle.to_string(), "toggle");
        assert_eq!(ControlKind::Previous.as_str(), "previous");
    }
}
