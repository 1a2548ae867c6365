//! # Playback Continuity Core
//!
//! Keeps track switching fast and lets an out-of-process control surface
//! drive playback.
//!
//! ## Overview
//!
//! This module handles:
//! - Resolving tracks to playable resources with scoped access ([`resolver`])
//! - Preloading the upcoming queue window ([`cache`])
//! - The single-writer playback state machine ([`engine`])
//! - Receiving and debouncing control signals ([`control`])
//! - Publishing playback snapshots for control surfaces ([`snapshot`])
//!
//! ## Usage
//!
//! ```ignore
//! let resolver = Arc::new(ResourceResolver::new(access, config.resolve_timeout));
//! let snapshots = SnapshotStore::resume(store, clock.clone()).await;
//! let (engine, _task) =
//!     PlaybackEngine::new(config, resolver, adapter, snapshots, clock).spawn()?;
//!
//! engine.replace_queue(tracks).await?;
//! engine.play_at(0).await?;
//! ```

pub mod cache;
pub mod config;
pub mod control;
pub mod engine;
pub mod error;
pub mod queue;
pub mod resolver;
pub mod snapshot;
pub mod state;
pub mod track;

pub use cache::{CacheStats, EntryState, PreloadCache, PreloadConfig};
pub use config::EngineConfig;
pub use control::{ControlListener, DebounceConfig, ListenerHandle, SignalDebouncer};
pub use engine::{EngineHandle, PlayOutcome, PlaybackEngine, SignalOffer, LOAD_FAILED_MESSAGE};
pub use error::{PlaybackError, ResolutionError, Result};
pub use queue::{PlayQueue, QueueSnapshot};
pub use resolver::{AccessGuard, ResourceHandle, ResourceResolver, TrackResolver};
pub use snapshot::{read_snapshot, Snapshot, SnapshotStore, SNAPSHOT_KEY};
pub use state::{PlaybackState, PlaybackStatus};
pub use track::TrackId;
