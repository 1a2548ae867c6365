//! Main-process wiring.

use crate::error::{CoreError, Result};
use bridge_traits::SignalReceiver;
use core_playback::{
    ControlListener, EngineConfig, EngineHandle, ListenerHandle, PlaybackEngine,
    ResourceResolver, SnapshotStore,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventBus, EventStream};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Running playback core of the main process.
///
/// Owns the engine actor and, when a signal receiver was supplied, the
/// control listener feeding it.
pub struct PlaybackService {
    engine: EngineHandle,
    engine_task: JoinHandle<()>,
    listener: Option<ListenerHandle>,
    event_bus: EventBus,
    container_id: String,
}

impl PlaybackService {
    /// Validate `config` and start the engine.
    ///
    /// With a `receiver`, control signals are forwarded to the engine; the
    /// configured lifecycle observer (if any) gates them.
    pub async fn start(
        config: CoreConfig,
        receiver: Option<Box<dyn SignalReceiver>>,
    ) -> Result<Self> {
        config.validate()?;

        let engine_config = EngineConfig::from_core(&config);
        let event_bus = EventBus::new(config.event_buffer);

        let resolver = Arc::new(ResourceResolver::new(
            Arc::clone(&config.resource_access),
            config.resolve_timeout,
        ));
        let snapshots =
            SnapshotStore::resume(Arc::clone(&config.shared_store), Arc::clone(&config.clock))
                .await;

        let (engine, engine_task) = PlaybackEngine::new(
            engine_config,
            resolver,
            Arc::clone(&config.playback_adapter),
            snapshots,
            Arc::clone(&config.clock),
        )
        .with_event_bus(event_bus.clone())
        .spawn()?;

        let listener = receiver.map(|receiver| {
            let listener = ControlListener::new(receiver, engine.clone())
                .with_event_bus(event_bus.clone());
            match &config.lifecycle_observer {
                Some(lifecycle) => listener.with_lifecycle(Arc::clone(lifecycle)),
                None => listener,
            }
            .spawn()
        });

        info!(
            container = %config.shared_container_id,
            listening = listener.is_some(),
            "Playback service started"
        );

        Ok(Self {
            engine,
            engine_task,
            listener,
            event_bus,
            container_id: config.shared_container_id,
        })
    }

    /// Start with the desktop control socket bound inside `base_dir`.
    #[cfg(all(feature = "desktop-shims", unix))]
    pub async fn start_desktop(
        config: CoreConfig,
        base_dir: impl AsRef<std::path::Path>,
    ) -> Result<Self> {
        let path = bridge_desktop::control_socket_path(base_dir, &config.shared_container_id);
        let receiver = bridge_desktop::UnixDatagramReceiver::bind(path)?;
        Self::start(config, Some(Box::new(receiver))).await
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Subscribe to playback, cache and control events.
    pub fn events(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    pub fn is_listening(&self) -> bool {
        self.listener
            .as_ref()
            .is_some_and(|listener| !listener.is_finished())
    }

    /// Stop the listener, then the engine, and wait for both.
    pub async fn shutdown(self) -> Result<()> {
        if let Some(listener) = self.listener {
            listener.shutdown().await;
        }
        self.engine.shutdown().await?;
        self.engine_task.await.map_err(|err| {
            warn!(error = %err, "Engine task failed");
            CoreError::TaskFailed(err.to_string())
        })?;
        info!("Playback service stopped");
        Ok(())
    }
}
