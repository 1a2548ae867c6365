//! Runtime error type.

use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors raised while configuring and bootstrapping the core.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid tunable or identifier, or logging could not be installed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required host bridge was neither injected nor available by default.
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    /// A default bridge failed to open.
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

impl Error {
    /// Returns `true` if the host must inject an implementation to proceed.
    pub fn is_capability_missing(&self) -> bool {
        matches!(self, Error::CapabilityMissing { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_errors_convert() {
        let err: Error = BridgeError::NotAvailable("no music directory".into()).into();
        assert!(matches!(err, Error::Bridge(_)));
        assert!(!err.is_capability_missing());

        let err = Error::CapabilityMissing {
            capability: "SharedStore".into(),
            message: "inject one".into(),
        };
        assert!(err.is_capability_missing());
    }
}
