//! # Snapshot Store
//!
//! Compact playback state published for out-of-process readers.
//!
//! The engine is the only writer. Control surfaces read whenever they are
//! woken and render whatever they find; there is no notification. Values are
//! JSON under [`SNAPSHOT_KEY`] in the shared container, and the last write
//! wins.

use crate::error::Result;
use crate::state::{PlaybackState, PlaybackStatus};
use bridge_traits::{Clock, PlaybackMetadata, SharedStore};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Key of the snapshot inside the shared container.
pub const SNAPSHOT_KEY: &str = "playback.snapshot";

/// What a control surface is allowed to know about playback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    /// Artwork reference, never image bytes.
    pub artwork: Option<String>,
    pub is_playing: bool,
    pub status: PlaybackStatus,
    pub track_id: Option<String>,
    /// Incremented by the writer on every write; 0 means never written.
    pub revision: u64,
    /// Writer clock, Unix epoch milliseconds.
    pub updated_at_ms: i64,
}

impl Snapshot {
    /// The value readers fall back to when nothing usable is stored.
    pub fn unknown() -> Self {
        Self {
            title: None,
            artist: None,
            album: None,
            artwork: None,
            is_playing: false,
            status: PlaybackStatus::Idle,
            track_id: None,
            revision: 0,
            updated_at_ms: 0,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.revision == 0
    }

    /// Project engine state onto the exported fields. Revision and timestamp
    /// are stamped by [`SnapshotStore::write`].
    pub fn from_state(state: &PlaybackState, metadata: Option<&PlaybackMetadata>) -> Self {
        let metadata = metadata.cloned().unwrap_or_default();
        Self {
            title: metadata.title,
            artist: metadata.artist,
            album: metadata.album,
            artwork: metadata.artwork,
            is_playing: state.is_playing,
            status: state.status,
            track_id: state.current_track.as_ref().map(|t| t.to_string()),
            revision: 0,
            updated_at_ms: 0,
        }
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Read the latest snapshot from `store`.
///
/// Never fails: a missing key, a storage error, or a malformed value all
/// read as [`Snapshot::unknown`].
pub async fn read_snapshot(store: &dyn SharedStore) -> Snapshot {
    match store.get_string(SNAPSHOT_KEY).await {
        Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|err| {
            warn!(container = store.container_id(), error = %err, "Malformed snapshot");
            Snapshot::unknown()
        }),
        Ok(None) => Snapshot::unknown(),
        Err(err) => {
            warn!(container = store.container_id(), error = %err, "Snapshot unreadable");
            Snapshot::unknown()
        }
    }
}

/// Writer side of the snapshot channel.
pub struct SnapshotStore {
    store: Arc<dyn SharedStore>,
    clock: Arc<dyn Clock>,
    revision: AtomicU64,
}

impl SnapshotStore {
    pub fn new(store: Arc<dyn SharedStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            revision: AtomicU64::new(0),
        }
    }

    /// Create a writer that continues the revision sequence already in the
    /// container, so readers never see a revision go backwards across a
    /// restart.
    pub async fn resume(store: Arc<dyn SharedStore>, clock: Arc<dyn Clock>) -> Self {
        let existing = read_snapshot(store.as_ref()).await;
        let writer = Self::new(store, clock);
        writer.revision.store(existing.revision, Ordering::SeqCst);
        writer
    }

    pub fn container_id(&self) -> &str {
        self.store.container_id()
    }

    /// Stamp and publish `snapshot`, returning the stamped value.
    pub async fn write(&self, mut snapshot: Snapshot) -> Result<Snapshot> {
        snapshot.revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        snapshot.updated_at_ms = self.clock.unix_timestamp_millis();

        let json = serde_json::to_string(&snapshot)?;
        self.store.set_string(SNAPSHOT_KEY, &json).await?;

        debug!(
            revision = snapshot.revision,
            status = %snapshot.status,
            "Published snapshot"
        );
        Ok(snapshot)
    }

    pub async fn read(&self) -> Snapshot {
        read_snapshot(self.store.as_ref()).await
    }
}
