//! # Core Configuration Module
//!
//! Configuration shared by the main process and the control surface.
//!
//! ## Overview
//!
//! A builder assembles a [`CoreConfig`] holding the host bridges and the
//! tunables of the playback-continuity core. Required bridges are checked at
//! `build()` time so a misconfigured host fails at startup rather than on the
//! first track change.
//!
//! ## Required Dependencies
//!
//! - `ResourceAccess` - locate and open tracks
//! - `SharedStore` - the container the snapshot is written to
//! - `PlaybackAdapter` - the host audio engine
//!
//! ## Optional Dependencies
//!
//! - `LifecycleObserver` - lets the listener drop signals while suspended
//! - `Clock` - defaults to [`SystemClock`]
//!
//! When the `desktop-shims` feature is enabled, desktop defaults from
//! `bridge-desktop` are injected for the required bridges that were not
//! provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .shared_container_id("group.com.example.player")
//!     .resource_access(Arc::new(MyAccess))
//!     .shared_store(Arc::new(MyStore))
//!     .playback_adapter(Arc::new(MyAdapter))
//!     .debounce_window(Duration::from_millis(300))
//!     .build()?;
//! ```
//!
//! Without the desktop shims, a missing bridge is reported with an actionable
//! message:
//!
//! ```
//! use core_runtime::config::CoreConfig;
//!
//! let err = CoreConfig::builder()
//!     .shared_container_id("group.test")
//!     .build();
//! # #[cfg(not(feature = "desktop-shims"))]
//! assert!(err.is_err());
//! ```

use crate::error::{Error, Result};
use bridge_traits::{
    Clock, LifecycleObserver, PlaybackAdapter, ResourceAccess, SharedStore, SystemClock,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default number of upcoming queue entries eligible for preloading.
pub const DEFAULT_PRELOAD_WINDOW: usize = 10;
/// Upper bound on the preload window.
pub const MAX_PRELOAD_WINDOW: usize = 64;
pub const DEFAULT_MAX_CONCURRENT_RESOLUTIONS: usize = 2;
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(8);
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(250);
pub const DEFAULT_STALE_SIGNAL_AFTER: Duration = Duration::from_secs(10);
pub const DEFAULT_COMMAND_BUFFER: usize = 64;
pub const DEFAULT_EVENT_BUFFER: usize = 100;
pub const DEFAULT_SHARED_CONTAINER_ID: &str = "group.playback.continuity";

/// Core configuration.
///
/// Holds the bridges and tunables needed to start the engine or a control
/// surface. Use [`CoreConfig::builder()`] to construct.
#[derive(Clone)]
pub struct CoreConfig {
    /// Identifier of the shared container; both processes must agree on it.
    pub shared_container_id: String,

    /// Root directory the desktop file access resolves track ids against.
    pub library_root: Option<PathBuf>,

    pub preload_window_size: usize,
    pub max_concurrent_resolutions: usize,
    pub resolve_timeout: Duration,
    pub debounce_window: Duration,
    pub stale_signal_after: Duration,

    /// Capacity of the engine command mailbox.
    pub command_buffer: usize,
    /// Capacity of the event bus.
    pub event_buffer: usize,

    // Required bridges
    pub resource_access: Arc<dyn ResourceAccess>,
    pub shared_store: Arc<dyn SharedStore>,
    pub playback_adapter: Arc<dyn PlaybackAdapter>,

    // Optional bridges
    pub lifecycle_observer: Option<Arc<dyn LifecycleObserver>>,
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("shared_container_id", &self.shared_container_id)
            .field("library_root", &self.library_root)
            .field("preload_window_size", &self.preload_window_size)
            .field("max_concurrent_resolutions", &self.max_concurrent_resolutions)
            .field("resolve_timeout", &self.resolve_timeout)
            .field("debounce_window", &self.debounce_window)
            .field("stale_signal_after", &self.stale_signal_after)
            .field("command_buffer", &self.command_buffer)
            .field("event_buffer", &self.event_buffer)
            .field("resource_access", &"<ResourceAccess>")
            .field("shared_store", &self.shared_store.container_id())
            .field("playback_adapter", &"<PlaybackAdapter>")
            .field(
                "lifecycle_observer",
                &self.lifecycle_observer.as_ref().map(|_| "<LifecycleObserver>"),
            )
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates tunables and checks that the shared store serves the
    /// configured container.
    pub fn validate(&self) -> Result<()> {
        if self.shared_container_id.trim().is_empty() {
            return Err(Error::Config(
                "shared_container_id must not be empty".to_string(),
            ));
        }

        if self.shared_store.container_id() != self.shared_container_id {
            return Err(Error::Config(format!(
                "SharedStore serves container '{}' but '{}' is configured. \
                 Both processes must use the same shared container.",
                self.shared_store.container_id(),
                self.shared_container_id
            )));
        }

        if self.preload_window_size == 0 {
            return Err(Error::Config(
                "preload_window_size must be greater than 0".to_string(),
            ));
        }

        if self.preload_window_size > MAX_PRELOAD_WINDOW {
            return Err(Error::Config(format!(
                "preload_window_size {} exceeds the maximum of {}",
                self.preload_window_size, MAX_PRELOAD_WINDOW
            )));
        }

        if self.max_concurrent_resolutions == 0 {
            return Err(Error::Config(
                "max_concurrent_resolutions must be greater than 0".to_string(),
            ));
        }

        for (name, value) in [
            ("resolve_timeout", self.resolve_timeout),
            ("debounce_window", self.debounce_window),
            ("stale_signal_after", self.stale_signal_after),
        ] {
            if value.is_zero() {
                return Err(Error::Config(format!("{} must be greater than 0", name)));
            }
        }

        if self.command_buffer == 0 || self.event_buffer == 0 {
            return Err(Error::Config(
                "command_buffer and event_buffer must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn capability_missing(capability: &str, purpose: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: format!(
            "{} implementation is required {}. \
             Desktop: enable the 'desktop-shims' feature to use the default. \
             Other hosts: inject a platform implementation through the builder.",
            capability, purpose
        ),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_resource_access(
    library_root: Option<&PathBuf>,
) -> Result<Arc<dyn ResourceAccess>> {
    use bridge_desktop::LocalFileAccess;

    let access = match library_root {
        Some(root) => LocalFileAccess::new(root.clone()),
        None => LocalFileAccess::default_library().map_err(|e| Error::CapabilityMissing {
            capability: "ResourceAccess".to_string(),
            message: format!(
                "No library_root configured and no default music directory found: {}",
                e
            ),
        })?,
    };
    Ok(Arc::new(access))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_resource_access(
    _library_root: Option<&PathBuf>,
) -> Result<Arc<dyn ResourceAccess>> {
    Err(capability_missing("ResourceAccess", "to locate and open tracks"))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_shared_store(container_id: &str) -> Result<Arc<dyn SharedStore>> {
    use bridge_desktop::SqliteSharedStore;

    Ok(Arc::new(SqliteSharedStore::open_default(container_id)?))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_shared_store(_container_id: &str) -> Result<Arc<dyn SharedStore>> {
    Err(capability_missing(
        "SharedStore",
        "to exchange the playback snapshot between processes",
    ))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_playback_adapter() -> Result<Arc<dyn PlaybackAdapter>> {
    Ok(Arc::new(bridge_desktop::HeadlessPlaybackAdapter::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_playback_adapter() -> Result<Arc<dyn PlaybackAdapter>> {
    Err(capability_missing("PlaybackAdapter", "to drive audio output"))
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    shared_container_id: Option<String>,
    library_root: Option<PathBuf>,
    preload_window_size: Option<usize>,
    max_concurrent_resolutions: Option<usize>,
    resolve_timeout: Option<Duration>,
    debounce_window: Option<Duration>,
    stale_signal_after: Option<Duration>,
    command_buffer: Option<usize>,
    event_buffer: Option<usize>,
    resource_access: Option<Arc<dyn ResourceAccess>>,
    shared_store: Option<Arc<dyn SharedStore>>,
    playback_adapter: Option<Arc<dyn PlaybackAdapter>>,
    lifecycle_observer: Option<Arc<dyn LifecycleObserver>>,
    clock: Option<Arc<dyn Clock>>,
}

impl CoreConfigBuilder {
    /// Sets the shared container identifier.
    ///
    /// Default: [`DEFAULT_SHARED_CONTAINER_ID`]
    pub fn shared_container_id(mut self, id: impl Into<String>) -> Self {
        self.shared_container_id = Some(id.into());
        self
    }

    pub fn library_root<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.library_root = Some(path.into());
        self
    }

    /// Number of upcoming entries to preload.
    ///
    /// Default: 10, maximum 64.
    pub fn preload_window_size(mut self, size: usize) -> Self {
        self.preload_window_size = Some(size);
        self
    }

    /// Default: 2
    pub fn max_concurrent_resolutions(mut self, limit: usize) -> Self {
        self.max_concurrent_resolutions = Some(limit);
        self
    }

    /// Upper bound on a single track resolution.
    ///
    /// Default: 8 seconds
    pub fn resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = Some(timeout);
        self
    }

    /// Identical control signals inside this window collapse into one.
    ///
    /// Default: 250 ms
    pub fn debounce_window(mut self, window: Duration) -> Self {
        self.debounce_window = Some(window);
        self
    }

    /// Signals sent longer ago than this are dropped on arrival.
    ///
    /// Default: 10 seconds
    pub fn stale_signal_after(mut self, age: Duration) -> Self {
        self.stale_signal_after = Some(age);
        self
    }

    pub fn command_buffer(mut self, capacity: usize) -> Self {
        self.command_buffer = Some(capacity);
        self
    }

    pub fn event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = Some(capacity);
        self
    }

    /// Sets the resource access implementation (required).
    pub fn resource_access(mut self, access: Arc<dyn ResourceAccess>) -> Self {
        self.resource_access = Some(access);
        self
    }

    /// Sets the shared store implementation (required).
    pub fn shared_store(mut self, store: Arc<dyn SharedStore>) -> Self {
        self.shared_store = Some(store);
        self
    }

    /// Sets the playback adapter implementation (required).
    pub fn playback_adapter(mut self, adapter: Arc<dyn PlaybackAdapter>) -> Self {
        self.playback_adapter = Some(adapter);
        self
    }

    /// Sets the lifecycle observer implementation (optional).
    pub fn lifecycle_observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.lifecycle_observer = Some(observer);
        self
    }

    /// Overrides the time source. Tests inject a `ManualClock` here.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// Returns `Error::CapabilityMissing` when a required bridge is absent
    /// and no desktop default is available, and `Error::Config` when a
    /// tunable is out of range.
    pub fn build(self) -> Result<CoreConfig> {
        let shared_container_id = self
            .shared_container_id
            .unwrap_or_else(|| DEFAULT_SHARED_CONTAINER_ID.to_string());

        let resource_access = match self.resource_access {
            Some(access) => access,
            None => provide_default_resource_access(self.library_root.as_ref())?,
        };

        let shared_store = match self.shared_store {
            Some(store) => store,
            None => provide_default_shared_store(&shared_container_id)?,
        };

        let playback_adapter = match self.playback_adapter {
            Some(adapter) => adapter,
            None => provide_default_playback_adapter()?,
        };

        let config = CoreConfig {
            shared_container_id,
            library_root: self.library_root,
            preload_window_size: self.preload_window_size.unwrap_or(DEFAULT_PRELOAD_WINDOW),
            max_concurrent_resolutions: self
                .max_concurrent_resolutions
                .unwrap_or(DEFAULT_MAX_CONCURRENT_RESOLUTIONS),
            resolve_timeout: self.resolve_timeout.unwrap_or(DEFAULT_RESOLVE_TIMEOUT),
            debounce_window: self.debounce_window.unwrap_or(DEFAULT_DEBOUNCE_WINDOW),
            stale_signal_after: self
                .stale_signal_after
                .unwrap_or(DEFAULT_STALE_SIGNAL_AFTER),
            command_buffer: self.command_buffer.unwrap_or(DEFAULT_COMMAND_BUFFER),
            event_buffer: self.event_buffer.unwrap_or(DEFAULT_EVENT_BUFFER),
            resource_access,
            shared_store,
            playback_adapter,
            lifecycle_observer: self.lifecycle_observer,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        };

        config.validate()?;

        Ok(config)
    }
}
