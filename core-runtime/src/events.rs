//! # Event Bus System
//!
//! Typed event broadcasting over `tokio::sync::broadcast`. The engine, the
//! preload cache, and the control listener publish here; hosts and tests
//! subscribe to observe transitions without touching engine state.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐   emit   ┌───────────┐   subscribe   ┌────────────┐
//! │ Engine actor  ├─────────>│           ├──────────────>│ UI / tests │
//! └───────────────┘          │ EventBus  │               └────────────┘
//! ┌───────────────┐   emit   │ (broadcast│   subscribe   ┌────────────┐
//! │ Preload cache ├─────────>│  channel) ├──────────────>│ Diagnostics│
//! └───────────────┘          └───────────┘               └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent, PlaybackStatus};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(32);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(CoreEvent::Playback(PlaybackEvent::StateChanged {
//!     track_id: Some("t-1".to_string()),
//!     from: PlaybackStatus::Idle,
//!     to: PlaybackStatus::Loading,
//! }))
//! .ok();
//!
//! let event = rx.recv().await.unwrap();
//! assert!(matches!(event, CoreEvent::Playback(_)));
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events. Non-fatal.
//! - **`RecvError::Closed`**: all senders dropped; treat as shutdown.
//!
//! Emitting with no subscribers returns an error that publishers ignore.

use bridge_traits::ControlKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Playback(PlaybackEvent),
    Cache(CacheEvent),
    Control(ControlEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Cache(e) => e.description(),
            CoreEvent::Control(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Cache(CacheEvent::PreloadFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::StateChanged { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

/// Lifecycle status of the playback engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    Idle,
    Loading,
    Playing,
    Paused,
    Failed,
}

impl PlaybackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackStatus::Idle => "idle",
            PlaybackStatus::Loading => "loading",
            PlaybackStatus::Playing => "playing",
            PlaybackStatus::Paused => "paused",
            PlaybackStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events related to audio playback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// The engine committed a state transition.
    StateChanged {
        track_id: Option<String>,
        from: PlaybackStatus,
        to: PlaybackStatus,
    },
    /// A load finished after a newer request replaced it; its result was dropped.
    LoadDiscarded {
        track_id: String,
        request_id: u64,
    },
    /// The queue was mutated.
    QueueChanged {
        queue_version: u64,
        length: usize,
    },
    /// Playback error occurred.
    Error {
        track_id: Option<String>,
        /// Generic, user-presentable message.
        message: String,
        recoverable: bool,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::StateChanged { .. } => "Playback state changed",
            PlaybackEvent::LoadDiscarded { .. } => "Superseded load discarded",
            PlaybackEvent::QueueChanged { .. } => "Queue changed",
            PlaybackEvent::Error { .. } => "Playback error",
        }
    }
}

// ============================================================================
// Cache Events
// ============================================================================

/// Events emitted by the preload cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CacheEvent {
    PreloadScheduled {
        track_id: String,
        queue_version: u64,
    },
    PreloadReady {
        track_id: String,
    },
    PreloadFailed {
        track_id: String,
        reason: String,
    },
    Evicted {
        track_id: String,
    },
    Lookup {
        track_id: String,
        hit: bool,
    },
}

impl CacheEvent {
    fn description(&self) -> &str {
        match self {
            CacheEvent::PreloadScheduled { .. } => "Preload scheduled",
            CacheEvent::PreloadReady { .. } => "Preload ready",
            CacheEvent::PreloadFailed { .. } => "Preload failed",
            CacheEvent::Evicted { .. } => "Cache entry evicted",
            CacheEvent::Lookup { .. } => "Cache lookup",
        }
    }
}

// ============================================================================
// Control Events
// ============================================================================

/// Why an incoming control signal was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalDropReason {
    /// Same kind already applied inside the debounce window.
    Debounced,
    /// Sent too long ago to still reflect user intent.
    Stale,
    /// The main process was suspended.
    Suspended,
    /// The engine mailbox was full.
    Backpressure,
}

/// Events emitted by the control bridge consumer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ControlEvent {
    SignalApplied {
        kind: ControlKind,
    },
    SignalDropped {
        kind: ControlKind,
        reason: SignalDropReason,
    },
}

impl ControlEvent {
    fn description(&self) -> &str {
        match self {
            ControlEvent::SignalApplied { .. } => "Control signal applied",
            ControlEvent::SignalDropped { .. } => "Control signal dropped",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Cloning the bus clones the sender; every clone publishes into the same
/// channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// Subscribers that fall behind by more than `capacity` events receive
    /// `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::new(16);
/// let playback_only = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Playback(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events that match `predicate` will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without waiting.
    ///
    /// Returns `None` if no matching event is currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_changed(to: PlaybackStatus) -> CoreEvent {
        CoreEvent::Playback(PlaybackEvent::StateChanged {
            track_id: Some("t-1".to_string()),
            from: PlaybackStatus::Idle,
            to,
        })
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(state_changed(PlaybackStatus::Loading)).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        let event = state_changed(PlaybackStatus::Playing);
        assert_eq!(bus.emit(event.clone()).unwrap(), 2);

        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Control(_)));

        bus.emit(state_changed(PlaybackStatus::Loading)).ok();
        let control = CoreEvent::Control(ControlEvent::SignalDropped {
            kind: ControlKind::Next,
            reason: SignalDropReason::Debounced,
        });
        bus.emit(control.clone()).ok();

        assert_eq!(stream.recv().await.unwrap(), control);
    }

    #[tokio::test]
    async fn test_try_recv_skips_filtered_events() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Cache(_)));

        assert!(stream.try_recv().is_none());
        bus.emit(state_changed(PlaybackStatus::Paused)).ok();
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();
        for _ in 0..5 {
            bus.emit(state_changed(PlaybackStatus::Loading)).ok();
        }
        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_severity_and_serialization() {
        let error = CoreEvent::Playback(PlaybackEvent::Error {
            track_id: Some("t-15".to_string()),
            message: "can't play this track".to_string(),
            recoverable: false,
        });
        assert_eq!(error.severity(), EventSeverity::Error);
        assert_eq!(error.description(), "Playback error");

        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"type\":\"Playback\""));
        let back: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, error);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(PlaybackStatus::Playing.to_string(), "playing");
        assert_eq!(
            serde_json::to_string(&PlaybackStatus::Failed).unwrap(),
            "\"failed\""
        );
    }
}
