//! Engine playback state.

use crate::track::TrackId;
use serde::{Deserialize, Serialize};

pub use core_runtime::events::PlaybackStatus;

/// Current playback state. Only the engine actor mutates it; callers get
/// copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub current_track: Option<TrackId>,
    pub is_playing: bool,
    pub status: PlaybackStatus,
    /// Queue version at the time of the last transition or preload cycle.
    pub queue_version_seen: u64,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current_track: None,
            is_playing: false,
            status: PlaybackStatus::Idle,
            queue_version_seen: 0,
        }
    }
}

impl PlaybackState {
    /// Apply a transition and return the status it came from.
    pub(crate) fn apply(&mut self, status: PlaybackStatus, track: Option<TrackId>) -> PlaybackStatus {
        let from = self.status;
        self.status = status;
        self.current_track = track;
        self.is_playing = status == PlaybackStatus::Playing;
        from
    }
}
