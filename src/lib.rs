//! Workspace placeholder crate.
//!
//! Hosts that want a single dependency can pull in `continuity-workspace`
//! and pick features instead of wiring each crate:
//! - `desktop-shims` (default): the service façades with desktop bridges
//! - `engine`: the playback core alone, for hosts injecting every bridge

#[cfg(feature = "desktop-shims")]
pub use core_service as service;

#[cfg(feature = "engine")]
pub use core_playback as playback;
