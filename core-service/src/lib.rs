//! Core service façades.
//!
//! Two entry points, one per process:
//! - [`PlaybackService`] wires the host bridges from a
//!   [`CoreConfig`](core_runtime::config::CoreConfig) into the playback
//!   engine and the control listener of the main process
//! - [`ControlSurface`] is the lightweight client used by the control-surface
//!   process: send commands, read the snapshot, wake the main app
//!
//! Desktop hosts typically enable the `desktop-shims` feature (which depends
//! on `bridge-desktop`) to get default bridges and the Unix socket channel.

pub mod error;
pub mod service;
pub mod surface;

pub use error::{CoreError, Result};
pub use service::PlaybackService;
pub use surface::{ControlSurface, DeliveryOutcome};

pub use core_playback::{
    EngineHandle, PlayOutcome, PlaybackState, PlaybackStatus, Snapshot, TrackId,
};
