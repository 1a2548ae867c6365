//! Playback bridge traits and supporting types.
//!
//! The core decides *what* plays; the host's audio engine does the actual
//! output. [`PlaybackAdapter`] is the seam between the two. A session is
//! prepared from a resolved source, then started, paused, and unloaded by the
//! engine actor.

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use uuid::Uuid;

/// High-level audio source descriptor provided to playback adapters.
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// Local file accessible to the host runtime.
    LocalFile { path: PathBuf },
    /// Remote HTTP(S) stream to be fetched by the host.
    RemoteStream {
        url: String,
        headers: HashMap<String, String>,
    },
    /// In-memory audio buffer supplied by the caller.
    MemoryBuffer { data: Bytes },
}

impl AudioSource {
    /// Determine whether the source represents remote content.
    pub fn is_remote(&self) -> bool {
        matches!(self, AudioSource::RemoteStream { .. })
    }
}

/// Display metadata for a track. This is what ends up in the exported
/// snapshot, so every field is optional and plain text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    /// Artwork reference (URI or path), never the image bytes.
    pub artwork: Option<String>,
}

impl PlaybackMetadata {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_artwork(mut self, artwork: impl Into<String>) -> Self {
        self.artwork = Some(artwork.into());
        self
    }
}

/// Unique identifier for playback sessions managed by a host adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackSessionId(Uuid);

impl PlaybackSessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PlaybackSessionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Request describing the session a host adapter should provision.
#[derive(Debug, Clone)]
pub struct PlaybackRequest {
    pub track_id: String,
    pub source: AudioSource,
    pub metadata: PlaybackMetadata,
}

impl PlaybackRequest {
    pub fn new(track_id: impl Into<String>, source: AudioSource) -> Self {
        Self {
            track_id: track_id.into(),
            source,
            metadata: PlaybackMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: PlaybackMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Trait for platform-specific playback adapters that drive native audio engines.
///
/// All calls arrive from the engine actor, one at a time. Implementations
/// should return quickly; long work belongs in resolution, not here.
#[async_trait]
pub trait PlaybackAdapter: Send + Sync {
    /// Prepare a playback session for an already-resolved source.
    async fn prepare(&self, request: PlaybackRequest) -> Result<PlaybackSessionId>;

    /// Begin or resume playback for the provided session.
    async fn play(&self, session: PlaybackSessionId) -> Result<()>;

    /// Pause playback without releasing the session.
    async fn pause(&self, session: PlaybackSessionId) -> Result<()>;

    /// Release resources associated with a playback session.
    async fn unload(&self, session: PlaybackSessionId) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_is_unique() {
        let a = PlaybackSessionId::new();
        let b = PlaybackSessionId::new();
        assert_ne!(a, b);
        assert_eq!(a, PlaybackSessionId::from_uuid(*a.as_uuid()));
    }

    #[test]
    fn metadata_builder() {
        let meta = PlaybackMetadata::titled("Blue in Green")
            .with_artist("Miles Davis")
            .with_album("Kind of Blue")
            .with_artwork("file:///art/kob.jpg");

        assert_eq!(meta.title.as_deref(), Some("Blue in Green"));
        assert_eq!(meta.artist.as_deref(), Some("Miles Davis"));
        assert_eq!(meta.album.as_deref(), Some("Kind of Blue"));
        assert_eq!(meta.artwork.as_deref(), Some("file:///art/kob.jpg"));
    }

    #[test]
    fn remote_source_detection() {
        let remote = AudioSource::RemoteStream {
            url: "https://example.com/a.mp3".into(),
            headers: HashMap::new(),
        };
        let local = AudioSource::LocalFile {
            path: PathBuf::from("/music/a.flac"),
        };
        assert!(remote.is_remote());
        assert!(!local.is_remote());
    }
}
