//! # Engine Configuration
//!
//! Tuning for the playback engine and its components, derived from the
//! runtime [`CoreConfig`] or built directly in tests.

use crate::cache::PreloadConfig;
use crate::control::DebounceConfig;
use core_runtime::config::CoreConfig;
use std::time::Duration;

/// Playback engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub preload: PreloadConfig,
    pub debounce: DebounceConfig,

    /// Upper bound on a single track resolution (default: 8 s).
    pub resolve_timeout: Duration,

    /// Capacity of the engine command mailbox (default: 64).
    ///
    /// Control signals offered to a full mailbox are dropped.
    pub command_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            preload: PreloadConfig::default(),
            debounce: DebounceConfig::default(),
            resolve_timeout: Duration::from_secs(8),
            command_buffer: 64,
        }
    }
}

impl EngineConfig {
    /// Take the engine tunables from a validated runtime configuration.
    pub fn from_core(core: &CoreConfig) -> Self {
        Self {
            preload: PreloadConfig::default()
                .with_window_size(core.preload_window_size)
                .with_max_concurrent_resolutions(core.max_concurrent_resolutions),
            debounce: DebounceConfig::default()
                .with_window(core.debounce_window)
                .with_stale_after(core.stale_signal_after),
            resolve_timeout: core.resolve_timeout,
            command_buffer: core.command_buffer,
        }
    }

    pub fn with_preload(mut self, preload: PreloadConfig) -> Self {
        self.preload = preload;
        self
    }

    pub fn with_debounce(mut self, debounce: DebounceConfig) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self
    }

    pub fn with_command_buffer(mut self, capacity: usize) -> Self {
        self.command_buffer = capacity;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.preload.validate()?;
        self.debounce.validate()?;

        if self.resolve_timeout.is_zero() {
            return Err("resolve_timeout must be > 0".to_string());
        }

        if self.command_buffer == 0 {
            return Err("command_buffer must be > 0".to_string());
        }

        Ok(())
    }
}
