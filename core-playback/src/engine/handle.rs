//! Client side of the engine actor.

use crate::cache::{CacheStats, EntryState};
use crate::error::{PlaybackError, Result};
use crate::queue::QueueSnapshot;
use crate::state::{PlaybackState, PlaybackStatus};
use crate::track::TrackId;
use bridge_traits::ControlSignal;
use tokio::sync::{mpsc, oneshot};

/// How a play request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
    /// The track is now playing.
    Playing(TrackId),
    /// A newer play request replaced this one before it finished loading.
    Superseded,
    /// The track could not be played; the engine is in `Failed`.
    Failed(TrackId),
    /// Nothing to do (e.g. `next` at the end of the queue).
    Unchanged,
}

/// Result of offering a control signal to the mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOffer {
    Accepted,
    /// Mailbox full; the signal was dropped.
    Full,
    /// Engine stopped.
    Closed,
}

pub(crate) type Reply<T> = oneshot::Sender<T>;

/// Where the outcome of a play request goes once it is known.
pub(crate) enum PlayReply {
    Outcome(Reply<PlayOutcome>),
    Checked(Reply<Result<PlayOutcome>>),
    /// Signal-triggered plays have nobody waiting.
    Detached,
}

impl PlayReply {
    pub(crate) fn send(self, outcome: PlayOutcome) {
        // A dropped receiver just means the caller stopped waiting.
        match self {
            PlayReply::Outcome(tx) => {
                let _ = tx.send(outcome);
            }
            PlayReply::Checked(tx) => {
                let _ = tx.send(Ok(outcome));
            }
            PlayReply::Detached => {}
        }
    }
}

pub(crate) enum EngineCommand {
    Play {
        track: TrackId,
        reply: Reply<PlayOutcome>,
    },
    PlayAt {
        index: usize,
        reply: Reply<Result<PlayOutcome>>,
    },
    Toggle {
        reply: Reply<PlaybackStatus>,
    },
    Next {
        reply: Reply<PlayOutcome>,
    },
    Previous {
        reply: Reply<PlayOutcome>,
    },
    ReplaceQueue {
        tracks: Vec<TrackId>,
        reply: Reply<u64>,
    },
    Enqueue {
        tracks: Vec<TrackId>,
        reply: Reply<u64>,
    },
    Insert {
        index: usize,
        track: TrackId,
        reply: Reply<u64>,
    },
    Remove {
        index: usize,
        reply: Reply<Option<TrackId>>,
    },
    ClearQueue {
        reply: Reply<u64>,
    },
    Signal(ControlSignal),
    State {
        reply: Reply<PlaybackState>,
    },
    Queue {
        reply: Reply<QueueSnapshot>,
    },
    CacheStats {
        reply: Reply<CacheStats>,
    },
    PreloadState {
        track: TrackId,
        reply: Reply<Option<EntryState>>,
    },
    Shutdown {
        reply: Reply<()>,
    },
}

/// Cloneable handle to a running [`PlaybackEngine`](super::PlaybackEngine).
///
/// Every method is a message to the actor; state is never shared. Methods
/// return [`PlaybackError::EngineStopped`] once the actor has exited.
#[derive(Clone, Debug)]
pub struct EngineHandle {
    commands: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    pub(crate) fn new(commands: mpsc::Sender<EngineCommand>) -> Self {
        Self { commands }
    }

    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> EngineCommand) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| PlaybackError::EngineStopped)?;
        response.await.map_err(|_| PlaybackError::EngineStopped)
    }

    /// Play `track`, moving the cursor to it when it is in the queue.
    ///
    /// Resolves once the track is playing, has failed, or was superseded.
    pub async fn play(&self, track: impl Into<TrackId>) -> Result<PlayOutcome> {
        let track = track.into();
        self.request(|reply| EngineCommand::Play { track, reply }).await
    }

    /// Play the queue entry at `index`.
    pub async fn play_at(&self, index: usize) -> Result<PlayOutcome> {
        self.request(|reply| EngineCommand::PlayAt { index, reply })
            .await?
    }

    /// Flip between playing and paused. Returns the resulting status.
    pub async fn toggle(&self) -> Result<PlaybackStatus> {
        self.request(|reply| EngineCommand::Toggle { reply }).await
    }

    pub async fn next(&self) -> Result<PlayOutcome> {
        self.request(|reply| EngineCommand::Next { reply }).await
    }

    pub async fn previous(&self) -> Result<PlayOutcome> {
        self.request(|reply| EngineCommand::Previous { reply }).await
    }

    /// Replace the queue. Returns the new queue version.
    pub async fn replace_queue(&self, tracks: Vec<TrackId>) -> Result<u64> {
        self.request(|reply| EngineCommand::ReplaceQueue { tracks, reply })
            .await
    }

    pub async fn enqueue(&self, tracks: Vec<TrackId>) -> Result<u64> {
        self.request(|reply| EngineCommand::Enqueue { tracks, reply })
            .await
    }

    pub async fn insert(&self, index: usize, track: impl Into<TrackId>) -> Result<u64> {
        let track = track.into();
        self.request(|reply| EngineCommand::Insert {
            index,
            track,
            reply,
        })
        .await
    }

    /// Remove the entry at `index`, returning it if it existed.
    pub async fn remove(&self, index: usize) -> Result<Option<TrackId>> {
        self.request(|reply| EngineCommand::Remove { index, reply })
            .await
    }

    pub async fn clear_queue(&self) -> Result<u64> {
        self.request(|reply| EngineCommand::ClearQueue { reply }).await
    }

    pub async fn state(&self) -> Result<PlaybackState> {
        self.request(|reply| EngineCommand::State { reply }).await
    }

    pub async fn queue(&self) -> Result<QueueSnapshot> {
        self.request(|reply| EngineCommand::Queue { reply }).await
    }

    pub async fn cache_stats(&self) -> Result<CacheStats> {
        self.request(|reply| EngineCommand::CacheStats { reply }).await
    }

    /// State of the preload entry for `track`, if there is one.
    pub async fn preload_state(&self, track: impl Into<TrackId>) -> Result<Option<EntryState>> {
        let track = track.into();
        self.request(|reply| EngineCommand::PreloadState { track, reply })
            .await
    }

    /// Queue a control signal without waiting. Never blocks: a full mailbox
    /// drops the signal.
    pub fn offer_signal(&self, signal: ControlSignal) -> SignalOffer {
        match self.commands.try_send(EngineCommand::Signal(signal)) {
            Ok(()) => SignalOffer::Accepted,
            Err(mpsc::error::TrySendError::Full(_)) => SignalOffer::Full,
            Err(mpsc::error::TrySendError::Closed(_)) => SignalOffer::Closed,
        }
    }

    /// Stop the engine: unload the session and release every cached handle.
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|reply| EngineCommand::Shutdown { reply }).await
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}
