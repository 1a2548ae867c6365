//! Cache statistics

use serde::{Deserialize, Serialize};

/// Counters for the preload cache since it was created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups that returned a ready handle
    pub hits: u64,

    /// Lookups that found nothing usable (absent, pending, or failed)
    pub misses: u64,

    /// Resolutions scheduled by `prepare`
    pub scheduled: u64,

    /// Resolutions that produced a ready handle
    pub resolved: u64,

    /// Resolutions that failed
    pub failed: u64,

    /// Entries removed because they left the window
    pub evicted: u64,

    /// Completions ignored because their entry was evicted or rescheduled
    pub discarded: u64,

    /// Entries currently held
    pub entries: usize,

    /// Entries currently ready
    pub ready: usize,
}

impl CacheStats {
    /// Fraction of lookups that hit, 0.0 when nothing was looked up.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}
