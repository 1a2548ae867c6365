//! Preload cache configuration

use serde::{Deserialize, Serialize};

/// Configuration for the preload cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreloadConfig {
    /// Number of upcoming queue entries kept resolved (default: 10)
    pub window_size: usize,

    /// Resolutions allowed to run at once (default: 2)
    pub max_concurrent_resolutions: usize,
}

impl Default for PreloadConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            max_concurrent_resolutions: 2,
        }
    }
}

impl PreloadConfig {
    /// Create a new preload configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window_size(mut self, size: usize) -> Self {
        self.window_size = size;
        self
    }

    pub fn with_max_concurrent_resolutions(mut self, count: usize) -> Self {
        self.max_concurrent_resolutions = count;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.window_size == 0 {
            return Err("window_size must be greater than 0".to_string());
        }

        if self.max_concurrent_resolutions == 0 {
            return Err("max_concurrent_resolutions must be at least 1".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PreloadConfig::default();
        assert_eq!(config.window_size, 10);
        assert_eq!(config.max_concurrent_resolutions, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        assert!(PreloadConfig::new().with_window_size(0).validate().is_err());
        assert!(PreloadConfig::new()
            .with_max_concurrent_resolutions(0)
            .validate()
            .is_err());
    }
}
