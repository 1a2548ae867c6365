//! Consumer-side debounce for control signals.

use bridge_traits::{Clock, ControlKind, ControlSignal};
use core_runtime::events::SignalDropReason;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Debounce tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebounceConfig {
    /// Identical kinds arriving within this window of the last applied one
    /// are dropped (default: 250 ms).
    pub window: Duration,

    /// Signals whose send time is further than this from the receiver's
    /// clock, in either direction, are dropped (default: 10 s).
    pub stale_after: Duration,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(250),
            stale_after: Duration::from_secs(10),
        }
    }
}

impl DebounceConfig {
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.window.is_zero() {
            return Err("debounce window must be greater than 0".to_string());
        }
        if self.stale_after.is_zero() {
            return Err("stale_after must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Decision for one incoming signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalVerdict {
    Apply,
    Drop(SignalDropReason),
}

/// Leading-edge debounce keyed by [`ControlKind`].
///
/// The first signal of a kind is applied immediately; later ones are dropped
/// until `window` has passed since the last *applied* one. Elapsed time is
/// measured on the receiving side with Tokio's clock because the sender's
/// wall clock says nothing about arrival spacing. The sender timestamp is
/// only used for the staleness check, which bounds the skew symmetrically so
/// a sender clock running ahead cannot make old signals look fresh.
pub struct SignalDebouncer {
    config: DebounceConfig,
    clock: Arc<dyn Clock>,
    last_applied: HashMap<ControlKind, Instant>,
}

impl SignalDebouncer {
    pub fn new(config: DebounceConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            last_applied: HashMap::new(),
        }
    }

    pub fn config(&self) -> &DebounceConfig {
        &self.config
    }

    pub fn evaluate(&mut self, signal: &ControlSignal) -> SignalVerdict {
        self.evaluate_at(signal, Instant::now())
    }

    pub fn evaluate_at(&mut self, signal: &ControlSignal, now: Instant) -> SignalVerdict {
        if self.is_stale(signal.sent_at_ms) {
            return SignalVerdict::Drop(SignalDropReason::Stale);
        }

        if let Some(last) = self.last_applied.get(&signal.kind) {
            if now.saturating_duration_since(*last) < self.config.window {
                return SignalVerdict::Drop(SignalDropReason::Debounced);
            }
        }

        self.last_applied.insert(signal.kind, now);
        SignalVerdict::Apply
    }

    // `sent_at_ms` comes off the wire unchecked.
    fn is_stale(&self, sent_at_ms: i64) -> bool {
        let skew_ms = self
            .clock
            .unix_timestamp_millis()
            .saturating_sub(sent_at_ms)
            .unsigned_abs();
        u128::from(skew_ms) > self.config.stale_after.as_millis()
    }

    /// Forget all history.
    pub fn reset(&mut self) {
        self.last_applied.clear();
    }
}
