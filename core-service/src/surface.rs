//! Control-surface client.
//!
//! Runs in the widget-like process. It can send the three commands, read the
//! last published snapshot, and ask the host to open the main application.
//! Nothing here waits on the main process.

use crate::error::Result;
use bridge_traits::{
    AppLauncher, Clock, ControlKind, ControlSignal, SharedStore, SignalTransport, SystemClock,
};
use core_playback::{read_snapshot, Snapshot};
use std::sync::Arc;
use tracing::{debug, info};

/// What happened to a sent command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Handed to the channel. Not an acknowledgement.
    Delivered,
    /// The main process was not listening; the command is gone.
    Dropped,
}

pub struct ControlSurface {
    transport: Arc<dyn SignalTransport>,
    launcher: Arc<dyn AppLauncher>,
    store: Arc<dyn SharedStore>,
    clock: Arc<dyn Clock>,
}

impl ControlSurface {
    pub fn new(
        transport: Arc<dyn SignalTransport>,
        launcher: Arc<dyn AppLauncher>,
        store: Arc<dyn SharedStore>,
    ) -> Self {
        Self {
            transport,
            launcher,
            store,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Surface for a separate desktop process sharing `base_dir` with the
    /// main application, which is launched as `program` on wake.
    #[cfg(all(feature = "desktop-shims", unix))]
    pub fn desktop(
        container_id: &str,
        base_dir: impl AsRef<std::path::Path>,
        program: impl Into<std::path::PathBuf>,
    ) -> Result<Self> {
        let base_dir = base_dir.as_ref();
        let transport = bridge_desktop::UnixDatagramTransport::new(
            bridge_desktop::control_socket_path(base_dir, container_id),
        );
        let store = bridge_desktop::SqliteSharedStore::open_in(base_dir, container_id)?;
        Ok(Self::new(
            Arc::new(transport),
            Arc::new(bridge_desktop::ProcessLauncher::new(program)),
            Arc::new(store),
        ))
    }

    pub fn container_id(&self) -> &str {
        self.store.container_id()
    }

    /// Send one command, fire-and-forget.
    ///
    /// An unreachable main process is reported as [`DeliveryOutcome::Dropped`],
    /// not as an error, and is never retried.
    pub async fn send(&self, kind: ControlKind) -> Result<DeliveryOutcome> {
        let signal = ControlSignal::new(kind, self.clock.unix_timestamp_millis());
        match self.transport.deliver(signal).await {
            Ok(()) => Ok(DeliveryOutcome::Delivered),
            Err(err) if err.is_unreachable() => {
                debug!(%kind, error = %err, "Main process unreachable, command dropped");
                Ok(DeliveryOutcome::Dropped)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn toggle(&self) -> Result<DeliveryOutcome> {
        self.send(ControlKind::Toggle).await
    }

    pub async fn next(&self) -> Result<DeliveryOutcome> {
        self.send(ControlKind::Next).await
    }

    pub async fn previous(&self) -> Result<DeliveryOutcome> {
        self.send(ControlKind::Previous).await
    }

    /// Latest snapshot, or [`Snapshot::unknown`] if there is none.
    pub async fn read_snapshot(&self) -> Snapshot {
        read_snapshot(self.store.as_ref()).await
    }

    /// Open the main application.
    pub async fn wake(&self) -> Result<()> {
        self.launcher.open_main_application().await?;
        info!("Requested main application launch");
        Ok(())
    }
}
