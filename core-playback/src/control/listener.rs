//! Pumps a [`SignalReceiver`] into the engine mailbox.

use crate::engine::{EngineHandle, SignalOffer};
use bridge_traits::{ControlKind, LifecycleObserver, SignalReceiver};
use core_runtime::events::{ControlEvent, CoreEvent, EventBus, SignalDropReason};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Single task that forwards control signals to the engine.
///
/// Never blocks on the engine: a full mailbox drops the signal. Signals
/// that arrive while the lifecycle observer reports
/// [`Suspended`](bridge_traits::LifecycleState::Suspended) are dropped as well.
pub struct ControlListener {
    receiver: Box<dyn SignalReceiver>,
    engine: EngineHandle,
    lifecycle: Option<Arc<dyn LifecycleObserver>>,
    event_bus: Option<EventBus>,
    cancel: CancellationToken,
}

impl ControlListener {
    pub fn new(receiver: Box<dyn SignalReceiver>, engine: EngineHandle) -> Self {
        Self {
            receiver,
            engine,
            lifecycle: None,
            event_bus: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_lifecycle(mut self, lifecycle: Arc<dyn LifecycleObserver>) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Run on a new task.
    pub fn spawn(self) -> ListenerHandle {
        let cancel = self.cancel.clone();
        let task = tokio::spawn(self.run());
        ListenerHandle { cancel, task }
    }

    /// Forward signals until the receiver closes, the engine stops, or the
    /// listener is cancelled.
    pub async fn run(mut self) {
        info!("Control listener started");
        loop {
            let signal = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                signal = self.receiver.next() => match signal {
                    Some(signal) => signal,
                    None => {
                        debug!("Signal receiver closed");
                        break;
                    }
                },
            };

            if is_suspended(self.lifecycle.clone()).await {
                debug!(kind = %signal.kind, "Dropping signal while suspended");
                self.dropped(signal.kind, SignalDropReason::Suspended);
                continue;
            }

            match self.engine.offer_signal(signal) {
                SignalOffer::Accepted => {}
                SignalOffer::Full => {
                    warn!(kind = %signal.kind, "Engine mailbox full, dropping signal");
                    self.dropped(signal.kind, SignalDropReason::Backpressure);
                }
                SignalOffer::Closed => {
                    debug!("Engine stopped");
                    break;
                }
            }
        }
        info!("Control listener stopped");
    }

    fn dropped(&self, kind: ControlKind, reason: SignalDropReason) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Control(ControlEvent::SignalDropped { kind, reason }));
        }
    }
}

// Owns its observer so the listener itself is never borrowed across the
// await; receivers are only required to be `Send`.
async fn is_suspended(lifecycle: Option<Arc<dyn LifecycleObserver>>) -> bool {
    let Some(lifecycle) = lifecycle else {
        return false;
    };
    match lifecycle.get_state().await {
        Ok(state) => !state.accepts_signals(),
        Err(err) => {
            debug!(error = %err, "Lifecycle state unavailable");
            false
        }
    }
}

/// Handle to a spawned [`ControlListener`].
pub struct ListenerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    /// Stop the listener and wait for it to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(err) = self.task.await {
            warn!(error = %err, "Control listener task failed");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
