//! Control signal transports
//!
//! Two one-way channels from a control surface to the main process:
//! - [`UnixDatagramTransport`]/[`UnixDatagramReceiver`] for separate
//!   processes on the same machine
//! - [`loopback_channel`] for a surface embedded in the main process, and
//!   for tests
//!
//! Both are fire-and-forget. A send to a socket nobody has bound reports
//! `Unreachable`; nothing is queued for later.

use async_trait::async_trait;
use bridge_traits::{
    control::{ControlSignal, SignalReceiver, SignalTransport},
    error::{BridgeError, Result},
};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[cfg(unix)]
use std::io;
#[cfg(unix)]
use tokio::net::UnixDatagram;

const CONTROL_SOCKET_NAME: &str = "control.sock";
/// Signals are tiny JSON objects; anything larger is garbage.
#[cfg(unix)]
const MAX_DATAGRAM: usize = 512;

/// Socket path for a container, next to its shared store.
pub fn control_socket_path(base_dir: impl AsRef<Path>, container_id: &str) -> PathBuf {
    base_dir.as_ref().join(container_id).join(CONTROL_SOCKET_NAME)
}

/// Sends each signal as one datagram to the main process socket.
#[cfg(unix)]
pub struct UnixDatagramTransport {
    socket_path: PathBuf,
}

#[cfg(unix)]
impl UnixDatagramTransport {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }
}

#[cfg(unix)]
#[async_trait]
impl SignalTransport for UnixDatagramTransport {
    async fn deliver(&self, signal: ControlSignal) -> Result<()> {
        let payload = signal.to_bytes()?;
        let socket = UnixDatagram::unbound()?;

        match socket.send_to(&payload, &self.socket_path).await {
            Ok(_) => {
                debug!(kind = %signal.kind, "Delivered control signal");
                Ok(())
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused
                ) =>
            {
                Err(BridgeError::Unreachable(format!(
                    "No listener at {}",
                    self.socket_path.display()
                )))
            }
            Err(e) => Err(BridgeError::Io(e)),
        }
    }
}

/// Receives signals on a bound datagram socket.
///
/// The socket file is removed when the receiver drops, so senders see
/// `Unreachable` once the main process stops listening.
#[cfg(unix)]
pub struct UnixDatagramReceiver {
    socket: UnixDatagram,
    path: PathBuf,
    buf: Vec<u8>,
}

#[cfg(unix)]
impl UnixDatagramReceiver {
    /// Bind the socket, replacing a stale file from a previous run.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn bind(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => debug!(path = ?path, "Removed stale control socket"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(BridgeError::Io(e)),
        }

        let socket = UnixDatagram::bind(&path)?;
        debug!(path = ?path, "Listening for control signals");

        Ok(Self {
            socket,
            path,
            buf: vec![0; MAX_DATAGRAM],
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(unix)]
#[async_trait]
impl SignalReceiver for UnixDatagramReceiver {
    async fn next(&mut self) -> Option<ControlSignal> {
        loop {
            match self.socket.recv(&mut self.buf).await {
                Ok(len) => match ControlSignal::from_bytes(&self.buf[..len]) {
                    Ok(signal) => return Some(signal),
                    Err(e) => warn!(error = %e, "Discarding malformed control signal"),
                },
                Err(e) => {
                    warn!(error = %e, "Control socket closed");
                    return None;
                }
            }
        }
    }
}

#[cfg(unix)]
impl Drop for UnixDatagramReceiver {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// In-process transport half.
#[derive(Clone)]
pub struct LoopbackTransport {
    tx: mpsc::Sender<ControlSignal>,
}

/// In-process receiver half.
pub struct LoopbackReceiver {
    rx: mpsc::Receiver<ControlSignal>,
}

/// Create a connected loopback pair holding at most `capacity` undelivered
/// signals.
pub fn loopback_channel(capacity: usize) -> (LoopbackTransport, LoopbackReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (LoopbackTransport { tx }, LoopbackReceiver { rx })
}

#[async_trait]
impl SignalTransport for LoopbackTransport {
    async fn deliver(&self, signal: ControlSignal) -> Result<()> {
        self.tx.try_send(signal).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                BridgeError::Unreachable("Loopback receiver is not draining".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => {
                BridgeError::Unreachable("Loopback receiver dropped".to_string())
            }
        })
    }
}

#[async_trait]
impl SignalReceiver for LoopbackReceiver {
    async fn next(&mut self) -> Option<ControlSignal> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::control::ControlKind;

    #[tokio::test]
    async fn test_loopback_delivers_in_order() {
        let (transport, mut receiver) = loopback_channel(4);

        transport
            .deliver(ControlSignal::new(ControlKind::Next, 1))
            .await
            .unwrap();
        transport
            .deliver(ControlSignal::new(ControlKind::Toggle, 2))
            .await
            .unwrap();

        assert_eq!(receiver.next().await.unwrap().kind, ControlKind::Next);
        assert_eq!(receiver.next().await.unwrap().kind, ControlKind::Toggle);
    }

    #[tokio::test]
    async fn test_loopback_unreachable_when_full_or_dropped() {
        let (transport, receiver) = loopback_channel(1);
        transport
            .deliver(ControlSignal::new(ControlKind::Next, 1))
            .await
            .unwrap();

        let full = transport
            .deliver(ControlSignal::new(ControlKind::Next, 2))
            .await
            .unwrap_err();
        assert!(full.is_unreachable());

        drop(receiver);
        let closed = transport
            .deliver(ControlSignal::new(ControlKind::Next, 3))
            .await
            .unwrap_err();
        assert!(closed.is_unreachable());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unix_datagram_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = control_socket_path(dir.path(), "group.test");
        let mut receiver = UnixDatagramReceiver::bind(&path).unwrap();
        let transport = UnixDatagramTransport::new(&path);

        transport
            .deliver(ControlSignal::new(ControlKind::Previous, 42))
            .await
            .unwrap();

        let signal = receiver.next().await.unwrap();
        assert_eq!(signal, ControlSignal::new(ControlKind::Previous, 42));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unix_datagram_skips_malformed_payloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = control_socket_path(dir.path(), "group.test");
        let mut receiver = UnixDatagramReceiver::bind(&path).unwrap();

        let raw = UnixDatagram::unbound().unwrap();
        raw.send_to(b"not json", &path).await.unwrap();
        UnixDatagramTransport::new(&path)
            .deliver(ControlSignal::new(ControlKind::Toggle, 7))
            .await
            .unwrap();

        assert_eq!(receiver.next().await.unwrap().kind, ControlKind::Toggle);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unix_datagram_unreachable_without_listener() {
        let dir = tempfile::tempdir().unwrap();
        let path = control_socket_path(dir.path(), "group.test");

        {
            let _receiver = UnixDatagramReceiver::bind(&path).unwrap();
        }

        let err = UnixDatagramTransport::new(&path)
            .deliver(ControlSignal::new(ControlKind::Next, 1))
            .await
            .unwrap_err();
        assert!(err.is_unreachable());
    }
}
