//! Headless playback adapter

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    playback::{PlaybackAdapter, PlaybackRequest, PlaybackSessionId},
};
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone)]
struct HeadlessSession {
    track_id: String,
    playing: bool,
}

/// Playback adapter with no audio output.
///
/// Keeps session bookkeeping so the engine can run on machines without an
/// audio device (CI, servers) and tests can inspect what would be playing.
#[derive(Default)]
pub struct HeadlessPlaybackAdapter {
    sessions: Mutex<HashMap<PlaybackSessionId, HeadlessSession>>,
}

impl HeadlessPlaybackAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Track of the session currently marked as playing, if any.
    pub fn playing_track(&self) -> Option<String> {
        self.sessions
            .lock()
            .values()
            .find(|session| session.playing)
            .map(|session| session.track_id.clone())
    }

    fn set_playing(&self, session: PlaybackSessionId, playing: bool) -> Result<()> {
        let mut sessions = self.sessions.lock();
        let entry = sessions
            .get_mut(&session)
            .ok_or_else(|| BridgeError::NotFound(format!("session {}", session.as_uuid())))?;
        entry.playing = playing;
        debug!(track_id = %entry.track_id, playing, "Headless session updated");
        Ok(())
    }
}

#[async_trait]
impl PlaybackAdapter for HeadlessPlaybackAdapter {
    async fn prepare(&self, request: PlaybackRequest) -> Result<PlaybackSessionId> {
        let id = PlaybackSessionId::new();
        self.sessions.lock().insert(
            id,
            HeadlessSession {
                track_id: request.track_id,
                playing: false,
            },
        );
        Ok(id)
    }

    async fn play(&self, session: PlaybackSessionId) -> Result<()> {
        self.set_playing(session, true)
    }

    async fn pause(&self, session: PlaybackSessionId) -> Result<()> {
        self.set_playing(session, false)
    }

    async fn unload(&self, session: PlaybackSessionId) -> Result<()> {
        self.sessions.lock().remove(&session);
        Ok(())
    }
}
