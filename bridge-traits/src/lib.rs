//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform,
//! plus the wire types shared by the main process and the control surface.
//!
//! ## Traits
//!
//! ### Main process
//! - [`ResourceAccess`](access::ResourceAccess) - Locate, scope-access, and open track resources
//! - [`PlaybackAdapter`](playback::PlaybackAdapter) - Drive the host audio engine
//! - [`SignalReceiver`](control::SignalReceiver) - Receive control signals
//! - [`LifecycleObserver`](background::LifecycleObserver) - Foreground/background/suspended transitions
//!
//! ### Both processes
//! - [`SharedStore`](storage::SharedStore) - Cross-process key-value container
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ### Control surface
//! - [`SignalTransport`](control::SignalTransport) - Fire-and-forget command delivery
//! - [`AppLauncher`](control::AppLauncher) - Wake the main application
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should map platform errors onto the closest variant; the core relies on
//! `NotFound`, `PermissionDenied` and `Unreachable` to choose its behaviour.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` (receivers only `Send`) so they can
//! be shared across tokio tasks behind `Arc`.

pub mod access;
pub mod background;
pub mod control;
pub mod error;
pub mod playback;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use access::{AccessToken, DynAsyncRead, ResourceAccess, ResourceDescriptor};
pub use background::{LifecycleChangeStream, LifecycleObserver, LifecycleState};
pub use control::{AppLauncher, ControlKind, ControlSignal, SignalReceiver, SignalTransport};
pub use playback::{
    AudioSource, PlaybackAdapter, PlaybackMetadata, PlaybackRequest, PlaybackSessionId,
};
pub use storage::SharedStore;
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
