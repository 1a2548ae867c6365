//! # Preload Cache Module
//!
//! Keeps the next few tracks of the queue resolved so that skipping to them
//! starts instantly.
//!
//! ## Overview
//!
//! - Bounded to a window of upcoming queue entries
//! - Resolution runs on spawned tasks, throttled by a semaphore
//! - Results come back through a channel drained by the engine actor, which
//!   is the only place the index is mutated
//! - A hit moves the handle out of the cache into the playing session
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────┐  prepare / invalidate / lookup
//! │ Engine actor             ├─────────────────────────────┐
//! └──────────▲───────────────┘                             ▼
//!            │ Completion              ┌────────────────────────────┐
//!            │ (mpsc)                  │ PreloadCache (index)       │
//!            │                         └─────────────┬──────────────┘
//!            │                                       │ spawn
//!            │                         ┌─────────────▼──────────────┐
//!            └─────────────────────────┤ resolution tasks           │
//!                                      │ (semaphore, cancel token)  │
//!                                      └────────────────────────────┘
//! ```

pub mod config;
pub mod manager;
pub mod stats;

pub use config::PreloadConfig;
pub use manager::{Completion, EntryState, PreloadCache};
pub use stats::CacheStats;
