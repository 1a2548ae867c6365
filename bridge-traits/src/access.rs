//! Scoped Resource Access
//!
//! Media files on sandboxed platforms can only be read between an explicit
//! "start access" and "stop access" pair (security-scoped bookmarks on Apple
//! platforms, persisted URI grants on Android). Desktop hosts usually have
//! nothing to acquire and return a no-op token.
//!
//! The core never talks to the filesystem directly; it asks this trait to
//! locate a track, begin access, and open a stream.

use async_trait::async_trait;
use std::fmt;

use crate::error::Result;
use crate::playback::{AudioSource, PlaybackMetadata};

/// Reader type handed out by [`ResourceAccess::open`].
pub type DynAsyncRead = dyn tokio::io::AsyncRead + Send + Unpin;

/// Where a track lives and how to describe it.
#[derive(Debug, Clone)]
pub struct ResourceDescriptor {
    pub track_id: String,
    pub source: AudioSource,
    pub metadata: PlaybackMetadata,
    /// Size in bytes, when the host knows it up front.
    pub byte_len: Option<u64>,
}

impl ResourceDescriptor {
    pub fn new(track_id: impl Into<String>, source: AudioSource) -> Self {
        Self {
            track_id: track_id.into(),
            source,
            metadata: PlaybackMetadata::default(),
            byte_len: None,
        }
    }

    pub fn with_metadata(mut self, metadata: PlaybackMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_byte_len(mut self, len: u64) -> Self {
        self.byte_len = Some(len);
        self
    }
}

/// Opaque token for one granted access scope.
///
/// Every token returned by [`ResourceAccess::begin_access`] must be passed to
/// [`ResourceAccess::end_access`] exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccessToken(u64);

impl AccessToken {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "access#{}", self.0)
    }
}

/// Host capability for locating and opening track resources.
///
/// # Errors
///
/// Implementations should report:
/// - [`BridgeError::NotFound`](crate::BridgeError::NotFound) when the track
///   or its file no longer exists
/// - [`BridgeError::PermissionDenied`](crate::BridgeError::PermissionDenied)
///   when the access grant is missing or revoked
/// - [`BridgeError::Io`](crate::BridgeError::Io) for everything else
#[async_trait]
pub trait ResourceAccess: Send + Sync {
    /// Map a track identifier to its resource location and display metadata.
    async fn locate(&self, track_id: &str) -> Result<ResourceDescriptor>;

    /// Start a scoped access session for the resource.
    fn begin_access(&self, descriptor: &ResourceDescriptor) -> Result<AccessToken>;

    /// End a scoped access session. Must not fail.
    fn end_access(&self, token: AccessToken);

    /// Open the resource for reading. Only valid while access is held.
    async fn open(&self, descriptor: &ResourceDescriptor) -> Result<Box<DynAsyncRead>>;
}
