//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `ResourceAccess` using `tokio::fs` against a library root
//! - `SharedStore` using a SQLite file per shared container
//! - `SignalTransport`/`SignalReceiver` over Unix datagram sockets, plus an
//!   in-process loopback pair
//! - `AppLauncher` spawning the main application binary
//! - `LifecycleObserver` driven by the host shell
//! - `PlaybackAdapter` with no audio output
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{LocalFileAccess, SqliteSharedStore};
//!
//! let access = LocalFileAccess::new("/home/me/Music");
//! let store = SqliteSharedStore::open_default("group.playback.continuity")?;
//! ```

mod access;
mod background;
mod launcher;
mod playback;
mod shared_store;
mod transport;

pub use access::LocalFileAccess;
pub use background::DesktopLifecycleObserver;
pub use launcher::ProcessLauncher;
pub use playback::HeadlessPlaybackAdapter;
pub use shared_store::{default_shared_dir, SqliteSharedStore};
pub use transport::{control_socket_path, loopback_channel, LoopbackReceiver, LoopbackTransport};

#[cfg(unix)]
pub use transport::{UnixDatagramReceiver, UnixDatagramTransport};
