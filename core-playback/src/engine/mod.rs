//! # Playback Engine
//!
//! Single-writer state machine for the one active playback session.
//!
//! [`PlaybackEngine::spawn`] starts an actor task that owns the queue, the
//! preload cache, the playback state, the debouncer and the adapter session.
//! Everything else talks to it through an [`EngineHandle`]. The actor
//! selects over three inputs:
//!
//! - the bounded command mailbox (user commands and control signals)
//! - preload completions reported by cache tasks
//! - direct-load results reported by load tasks
//!
//! ## Loads and supersede
//!
//! Every play request gets a fresh request id and becomes the current
//! *intent*. A cache hit is committed inline. A miss spawns a direct load
//! task that resolves outside the preload semaphore and posts its result
//! back. Results whose request id no longer matches the intent are dropped
//! with their handle; nothing is cancelled.
//!
//! ## Snapshots
//!
//! Every transition is published as `PlaybackEvent::StateChanged`. Every
//! transition except into `Loading` is also written to the snapshot store,
//! so a control surface never renders a half-finished switch.

mod handle;

pub use handle::{EngineHandle, PlayOutcome, SignalOffer};

use crate::cache::{Completion, PreloadCache};
use crate::config::EngineConfig;
use crate::control::{SignalDebouncer, SignalVerdict};
use crate::error::{PlaybackError, ResolutionError, Result};
use crate::queue::PlayQueue;
use crate::resolver::{ResourceHandle, TrackResolver};
use crate::snapshot::{Snapshot, SnapshotStore};
use crate::state::{PlaybackState, PlaybackStatus};
use crate::track::TrackId;
use bridge_traits::{
    Clock, ControlKind, ControlSignal, PlaybackAdapter, PlaybackMetadata, PlaybackSessionId,
};
use core_runtime::events::{ControlEvent, CoreEvent, EventBus, PlaybackEvent};
use handle::{EngineCommand, PlayReply};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// User-facing message for any failed load.
pub const LOAD_FAILED_MESSAGE: &str = "can't play this track";

/// Engine builder. Consumed by [`spawn`](Self::spawn).
pub struct PlaybackEngine {
    config: EngineConfig,
    resolver: Arc<dyn TrackResolver>,
    adapter: Arc<dyn PlaybackAdapter>,
    snapshots: SnapshotStore,
    clock: Arc<dyn Clock>,
    event_bus: Option<EventBus>,
}

impl PlaybackEngine {
    pub fn new(
        config: EngineConfig,
        resolver: Arc<dyn TrackResolver>,
        adapter: Arc<dyn PlaybackAdapter>,
        snapshots: SnapshotStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            resolver,
            adapter,
            snapshots,
            clock,
            event_bus: None,
        }
    }

    /// Publish playback, cache and control events on `event_bus`.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Validate the configuration and start the actor.
    ///
    /// Must be called from within a Tokio runtime. The task ends after
    /// [`EngineHandle::shutdown`] or once every handle is dropped.
    pub fn spawn(self) -> Result<(EngineHandle, JoinHandle<()>)> {
        self.config.validate().map_err(PlaybackError::Config)?;

        let (commands_tx, commands) = mpsc::channel(self.config.command_buffer);
        let (loads_tx, loads) = mpsc::unbounded_channel();

        let (cache, completions) =
            PreloadCache::new(self.config.preload.clone(), Arc::clone(&self.resolver));
        let cache = match &self.event_bus {
            Some(bus) => cache.with_event_bus(bus.clone()),
            None => cache,
        };

        let actor = EngineActor {
            window_size: self.config.preload.window_size,
            resolver: self.resolver,
            adapter: self.adapter,
            snapshots: self.snapshots,
            event_bus: self.event_bus,
            debouncer: SignalDebouncer::new(self.config.debounce, self.clock),
            queue: PlayQueue::new(),
            cache,
            state: PlaybackState::default(),
            session: None,
            metadata: None,
            next_request_id: 0,
            intent: None,
            pending: None,
            loads_tx,
        };

        let task = tokio::spawn(actor.run(commands, completions, loads));
        info!("Playback engine started");
        Ok((EngineHandle::new(commands_tx), task))
    }
}

/// The adapter session currently owned by the engine.
struct Session {
    id: PlaybackSessionId,
    track: TrackId,
    /// Keeps the stream and access scope alive while the track plays.
    _resource: ResourceHandle,
}

/// The most recent play request.
struct Intent {
    request_id: u64,
    track: TrackId,
}

/// A caller waiting on a direct load.
struct PendingPlay {
    request_id: u64,
    reply: PlayReply,
}

struct LoadResult {
    request_id: u64,
    track: TrackId,
    result: std::result::Result<ResourceHandle, ResolutionError>,
}

struct EngineActor {
    window_size: usize,
    resolver: Arc<dyn TrackResolver>,
    adapter: Arc<dyn PlaybackAdapter>,
    snapshots: SnapshotStore,
    event_bus: Option<EventBus>,
    debouncer: SignalDebouncer,
    queue: PlayQueue,
    cache: PreloadCache,
    state: PlaybackState,
    session: Option<Session>,
    /// Metadata of the session's track, exported in snapshots.
    metadata: Option<PlaybackMetadata>,
    next_request_id: u64,
    intent: Option<Intent>,
    pending: Option<PendingPlay>,
    loads_tx: mpsc::UnboundedSender<LoadResult>,
}

impl EngineActor {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<EngineCommand>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
        mut loads: mpsc::UnboundedReceiver<LoadResult>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => {
                        if !self.handle(command).await {
                            break;
                        }
                    }
                    None => {
                        debug!("All engine handles dropped");
                        self.shutdown().await;
                        break;
                    }
                },
                Some(completion) = completions.recv() => {
                    self.cache.complete(completion);
                }
                Some(load) = loads.recv() => self.on_load_complete(load).await,
            }
        }
        info!("Playback engine stopped");
    }

    /// Apply one command. Returns `false` once the engine should stop.
    async fn handle(&mut self, command: EngineCommand) -> bool {
        match command {
            EngineCommand::Play { track, reply } => {
                self.begin_play(track, None, PlayReply::Outcome(reply)).await;
            }
            EngineCommand::PlayAt { index, reply } => match self.queue.get(index).cloned() {
                Some(track) => {
                    self.begin_play(track, Some(index), PlayReply::Checked(reply))
                        .await;
                }
                None => {
                    let len = self.queue.len();
                    let _ = reply.send(Err(PlaybackError::IndexOutOfRange { index, len }));
                }
            },
            EngineCommand::Toggle { reply } => {
                let status = self.toggle().await;
                let _ = reply.send(status);
            }
            EngineCommand::Next { reply } => self.next(PlayReply::Outcome(reply)).await,
            EngineCommand::Previous { reply } => self.previous(PlayReply::Outcome(reply)).await,
            EngineCommand::ReplaceQueue { tracks, reply } => {
                self.queue.replace(tracks);
                if let Some(position) = self
                    .state
                    .current_track
                    .as_ref()
                    .and_then(|track| self.queue.position_of(track))
                {
                    self.queue.set_cursor(position);
                }
                let _ = reply.send(self.queue_changed());
            }
            EngineCommand::Enqueue { tracks, reply } => {
                self.queue.enqueue(tracks);
                let _ = reply.send(self.queue_changed());
            }
            EngineCommand::Insert {
                index,
                track,
                reply,
            } => {
                self.queue.insert(index, track);
                let _ = reply.send(self.queue_changed());
            }
            EngineCommand::Remove { index, reply } => {
                let removed = self.queue.remove(index).map(|(track, _)| track);
                if removed.is_some() {
                    self.queue_changed();
                }
                let _ = reply.send(removed);
            }
            EngineCommand::ClearQueue { reply } => {
                self.queue.clear();
                let _ = reply.send(self.queue_changed());
            }
            EngineCommand::Signal(signal) => self.on_signal(signal).await,
            EngineCommand::State { reply } => {
                let _ = reply.send(self.state.clone());
            }
            EngineCommand::Queue { reply } => {
                let _ = reply.send(self.queue.snapshot());
            }
            EngineCommand::CacheStats { reply } => {
                let _ = reply.send(self.cache.stats());
            }
            EngineCommand::PreloadState { track, reply } => {
                let _ = reply.send(self.cache.state_of(&track));
            }
            EngineCommand::Shutdown { reply } => {
                self.shutdown().await;
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    // ------------------------------------------------------------------
    // Loads
    // ------------------------------------------------------------------

    #[instrument(skip(self, track, reply), fields(track_id = %track))]
    async fn begin_play(&mut self, track: TrackId, position: Option<usize>, reply: PlayReply) {
        self.next_request_id += 1;
        let request_id = self.next_request_id;

        if let Some(previous) = self.pending.take() {
            debug!(request_id = previous.request_id, "Play request superseded");
            previous.reply.send(PlayOutcome::Superseded);
        }
        self.intent = Some(Intent {
            request_id,
            track: track.clone(),
        });

        let cursor_moved = position
            .or_else(|| self.queue.position_of(&track))
            .is_some_and(|index| self.queue.set_cursor(index));

        self.release_session().await;
        self.transition(PlaybackStatus::Loading, Some(track.clone()))
            .await;

        // Look up before the preload cycle: the cycle recomputes the window
        // from the new cursor and would evict the entry being played.
        match self.cache.lookup(&track) {
            Some(resource) => {
                self.intent = None;
                let outcome = self.commit_load(track, resource).await;
                reply.send(outcome);
            }
            None => {
                self.pending = Some(PendingPlay { request_id, reply });
                self.spawn_load(request_id, track);
            }
        }

        if cursor_moved {
            self.preload_cycle();
        }
    }

    fn spawn_load(&self, request_id: u64, track: TrackId) {
        debug!(track_id = %track, request_id, "Cache miss, resolving directly");
        let resolver = Arc::clone(&self.resolver);
        let loads = self.loads_tx.clone();

        tokio::spawn(async move {
            let result = resolver.resolve(&track).await;
            // The actor is gone if this fails; the handle drops here.
            let _ = loads.send(LoadResult {
                request_id,
                track,
                result,
            });
        });
    }

    async fn on_load_complete(&mut self, load: LoadResult) {
        let LoadResult {
            request_id,
            track,
            result,
        } = load;

        let current = self
            .intent
            .as_ref()
            .is_some_and(|intent| intent.request_id == request_id && intent.track == track);
        if !current {
            debug!(track_id = %track, request_id, "Discarding superseded load");
            self.emit(PlaybackEvent::LoadDiscarded {
                track_id: track.to_string(),
                request_id,
            });
            return;
        }

        self.intent = None;
        let reply = match self.pending.take() {
            Some(pending) if pending.request_id == request_id => pending.reply,
            Some(other) => {
                self.pending = Some(other);
                PlayReply::Detached
            }
            None => PlayReply::Detached,
        };

        let outcome = match result {
            Ok(resource) => self.commit_load(track, resource).await,
            Err(err) => {
                warn!(track_id = %track, error = %err, "Direct resolution failed");
                self.fail(track).await
            }
        };
        reply.send(outcome);
    }

    /// Hand a resolved resource to the adapter and start it.
    async fn commit_load(&mut self, track: TrackId, resource: ResourceHandle) -> PlayOutcome {
        let metadata = resource.metadata().clone();

        let id = match self.adapter.prepare(resource.playback_request()).await {
            Ok(id) => id,
            Err(err) => {
                warn!(track_id = %track, error = %err, "Adapter prepare failed");
                return self.fail(track).await;
            }
        };

        if let Err(err) = self.adapter.play(id).await {
            warn!(track_id = %track, error = %err, "Adapter play failed");
            if let Err(err) = self.adapter.unload(id).await {
                debug!(error = %err, "Unload after failed play also failed");
            }
            return self.fail(track).await;
        }

        self.session = Some(Session {
            id,
            track: track.clone(),
            _resource: resource,
        });
        self.metadata = Some(metadata);
        self.transition(PlaybackStatus::Playing, Some(track.clone()))
            .await;
        PlayOutcome::Playing(track)
    }

    async fn fail(&mut self, track: TrackId) -> PlayOutcome {
        self.cache.forget(&track);
        self.metadata = None;
        self.transition(PlaybackStatus::Failed, Some(track.clone()))
            .await;
        self.emit(PlaybackEvent::Error {
            track_id: Some(track.to_string()),
            message: LOAD_FAILED_MESSAGE.to_string(),
            recoverable: true,
        });
        PlayOutcome::Failed(track)
    }

    async fn release_session(&mut self) {
        if let Some(session) = self.session.take() {
            if let Err(err) = self.adapter.unload(session.id).await {
                warn!(track_id = %session.track, error = %err, "Failed to unload session");
            }
        }
        self.metadata = None;
    }

    // ------------------------------------------------------------------
    // Transport commands
    // ------------------------------------------------------------------

    async fn toggle(&mut self) -> PlaybackStatus {
        let Some(id) = self.session.as_ref().map(|session| session.id) else {
            debug!(status = %self.state.status, "Toggle ignored without a session");
            return self.state.status;
        };

        let (result, target) = match self.state.status {
            PlaybackStatus::Playing => (self.adapter.pause(id).await, PlaybackStatus::Paused),
            PlaybackStatus::Paused => (self.adapter.play(id).await, PlaybackStatus::Playing),
            status => {
                debug!(%status, "Toggle ignored");
                return status;
            }
        };

        match result {
            Ok(()) => {
                let track = self.state.current_track.clone();
                self.transition(target, track).await;
            }
            Err(err) => warn!(error = %err, "Adapter rejected toggle"),
        }
        self.state.status
    }

    async fn next(&mut self, reply: PlayReply) {
        match self.queue.next_index() {
            Some(index) => self.play_index(index, reply).await,
            None => reply.send(PlayOutcome::Unchanged),
        }
    }

    async fn previous(&mut self, reply: PlayReply) {
        match self.queue.previous_index() {
            Some(index) => self.play_index(index, reply).await,
            None => reply.send(PlayOutcome::Unchanged),
        }
    }

    async fn play_index(&mut self, index: usize, reply: PlayReply) {
        match self.queue.get(index).cloned() {
            Some(track) => self.begin_play(track, Some(index), reply).await,
            None => reply.send(PlayOutcome::Unchanged),
        }
    }

    async fn on_signal(&mut self, signal: ControlSignal) {
        match self.debouncer.evaluate(&signal) {
            SignalVerdict::Apply => {
                debug!(kind = %signal.kind, "Applying control signal");
                self.emit_control(ControlEvent::SignalApplied { kind: signal.kind });
                match signal.kind {
                    ControlKind::Toggle => {
                        self.toggle().await;
                    }
                    ControlKind::Next => self.next(PlayReply::Detached).await,
                    ControlKind::Previous => self.previous(PlayReply::Detached).await,
                }
            }
            SignalVerdict::Drop(reason) => {
                debug!(kind = %signal.kind, ?reason, "Dropping control signal");
                self.emit_control(ControlEvent::SignalDropped {
                    kind: signal.kind,
                    reason,
                });
            }
        }
    }

    // ------------------------------------------------------------------
    // Queue and preload
    // ------------------------------------------------------------------

    fn queue_changed(&mut self) -> u64 {
        let version = self.queue.version();
        self.emit(PlaybackEvent::QueueChanged {
            queue_version: version,
            length: self.queue.len(),
        });
        self.preload_cycle();
        version
    }

    fn preload_cycle(&mut self) {
        let version = self.queue.version();
        let window = self.queue.window(self.window_size);
        let evicted = self.cache.invalidate(version, &window);
        let scheduled = self.cache.prepare(&window);
        self.state.queue_version_seen = version;
        debug!(version, evicted, scheduled, "Preload cycle");
    }

    // ------------------------------------------------------------------
    // State publication
    // ------------------------------------------------------------------

    async fn transition(&mut self, status: PlaybackStatus, track: Option<TrackId>) {
        let from = self.state.apply(status, track);
        self.state.queue_version_seen = self.queue.version();
        debug!(%from, to = %status, "State transition");

        self.emit(PlaybackEvent::StateChanged {
            track_id: self.state.current_track.as_ref().map(|t| t.to_string()),
            from,
            to: status,
        });

        if status != PlaybackStatus::Loading {
            let snapshot = Snapshot::from_state(&self.state, self.metadata.as_ref());
            if let Err(err) = self.snapshots.write(snapshot).await {
                warn!(error = %err, "Failed to publish snapshot");
            }
        }
    }

    fn emit(&self, event: PlaybackEvent) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Playback(event));
        }
    }

    fn emit_control(&self, event: ControlEvent) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Control(event));
        }
    }

    async fn shutdown(&mut self) {
        self.intent = None;
        self.pending = None;
        self.release_session().await;
        self.cache.clear();
        if self.state.status != PlaybackStatus::Idle {
            self.transition(PlaybackStatus::Idle, None).await;
        }
    }
}
