//! End-to-end tests of the two façades over desktop bridges.

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use bridge_desktop::{
        loopback_channel, HeadlessPlaybackAdapter, LocalFileAccess, SqliteSharedStore,
    };
    use bridge_traits::{
        error::Result as BridgeResult, AppLauncher, BridgeError, ControlKind, ControlSignal,
        ManualClock, SharedStore, SignalReceiver, SignalTransport,
    };
    use core_runtime::config::CoreConfig;
    use core_service::{
        ControlSurface, CoreError, DeliveryOutcome, PlaybackService, PlaybackStatus, Snapshot,
        TrackId,
    };
    use mockall::mock;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    const CONTAINER: &str = "group.app.test";
    const NOW_MS: i64 = 1_700_000_000_000;

    mock! {
        pub Transport {}

        #[async_trait]
        impl SignalTransport for Transport {
            async fn deliver(&self, signal: ControlSignal) -> BridgeResult<()>;
        }
    }

    mock! {
        pub Launcher {}

        #[async_trait]
        impl AppLauncher for Launcher {
            async fn open_main_application(&self) -> BridgeResult<()>;
        }
    }

    fn idle_launcher() -> Arc<MockLauncher> {
        let mut launcher = MockLauncher::new();
        launcher.expect_open_main_application().never();
        Arc::new(launcher)
    }

    async fn memory_store() -> Arc<dyn SharedStore> {
        Arc::new(SqliteSharedStore::in_memory(CONTAINER).await.unwrap())
    }

    fn library(tracks: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for track in tracks {
            std::fs::write(dir.path().join(format!("{}.flac", track)), b"fLaC").unwrap();
        }
        dir
    }

    fn config(library: &TempDir, store: Arc<dyn SharedStore>) -> CoreConfig {
        CoreConfig::builder()
            .shared_container_id(CONTAINER)
            .resource_access(Arc::new(LocalFileAccess::new(library.path())))
            .shared_store(store)
            .playback_adapter(Arc::new(HeadlessPlaybackAdapter::new()))
            .build()
            .unwrap()
    }

    async fn wait_for_snapshot<F>(surface: &ControlSurface, predicate: F) -> Snapshot
    where
        F: Fn(&Snapshot) -> bool,
    {
        for _ in 0..200 {
            let snapshot = surface.read_snapshot().await;
            if predicate(&snapshot) {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("snapshot never matched");
    }

    // ------------------------------------------------------------------
    // ControlSurface
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_send_stamps_signal_with_clock() {
        let (transport, mut receiver) = loopback_channel(4);
        let surface = ControlSurface::new(Arc::new(transport), idle_launcher(), memory_store().await)
            .with_clock(Arc::new(ManualClock::new(NOW_MS)));

        let outcome = surface.previous().await.unwrap();
        assert_eq!(outcome, DeliveryOutcome::Delivered);
        assert_eq!(
            receiver.next().await,
            Some(ControlSignal::new(ControlKind::Previous, NOW_MS))
        );
    }

    #[tokio::test]
    async fn test_unreachable_main_process_drops_command() {
        let mut transport = MockTransport::new();
        transport
            .expect_deliver()
            .times(1)
            .returning(|_| Err(BridgeError::Unreachable("no listener".into())));

        let surface = ControlSurface::new(Arc::new(transport), idle_launcher(), memory_store().await);
        assert_eq!(surface.toggle().await.unwrap(), DeliveryOutcome::Dropped);
    }

    #[tokio::test]
    async fn test_other_transport_errors_surface() {
        let mut transport = MockTransport::new();
        transport
            .expect_deliver()
            .returning(|_| Err(BridgeError::OperationFailed("encode".into())));

        let surface = ControlSurface::new(Arc::new(transport), idle_launcher(), memory_store().await);
        let err = surface.next().await.unwrap_err();
        assert!(matches!(err, CoreError::Bridge(BridgeError::OperationFailed(_))));
    }

    #[tokio::test]
    async fn test_wake_opens_main_application() {
        let mut launcher = MockLauncher::new();
        launcher
            .expect_open_main_application()
            .times(1)
            .returning(|| Ok(()));
        let (transport, _receiver) = loopback_channel(1);

        let surface = ControlSurface::new(Arc::new(transport), Arc::new(launcher), memory_store().await);
        surface.wake().await.unwrap();
    }

    #[tokio::test]
    async fn test_snapshot_defaults_to_unknown() {
        let (transport, _receiver) = loopback_channel(1);
        let surface = ControlSurface::new(Arc::new(transport), idle_launcher(), memory_store().await);
        assert!(surface.read_snapshot().await.is_unknown());
        assert_eq!(surface.container_id(), CONTAINER);
    }

    // ------------------------------------------------------------------
    // PlaybackService
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_surface_drives_engine_end_to_end() {
        let library = library(&["a", "b"]);
        let shared = TempDir::new().unwrap();

        let engine_store = Arc::new(SqliteSharedStore::open_in(shared.path(), CONTAINER).unwrap());
        let surface_store = Arc::new(SqliteSharedStore::open_in(shared.path(), CONTAINER).unwrap());

        let (transport, receiver) = loopback_channel(8);
        let receiver: Box<dyn SignalReceiver> = Box::new(receiver);
        let service = PlaybackService::start(config(&library, engine_store), Some(receiver))
            .await
            .unwrap();
        assert!(service.is_listening());

        service
            .engine()
            .replace_queue(vec![TrackId::new("a.flac"), TrackId::new("b.flac")])
            .await
            .unwrap();

        let surface = ControlSurface::new(Arc::new(transport), idle_launcher(), surface_store);
        assert_eq!(surface.next().await.unwrap(), DeliveryOutcome::Delivered);

        let snapshot = wait_for_snapshot(&surface, |s| s.status == PlaybackStatus::Playing).await;
        assert_eq!(snapshot.track_id.as_deref(), Some("a.flac"));
        assert_eq!(snapshot.title.as_deref(), Some("a"));
        assert!(snapshot.is_playing);

        assert_eq!(surface.toggle().await.unwrap(), DeliveryOutcome::Delivered);
        let paused = wait_for_snapshot(&surface, |s| s.status == PlaybackStatus::Paused).await;
        assert!(!paused.is_playing);
        assert!(paused.revision > snapshot.revision);

        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_fails_playback() {
        let library = library(&["a"]);
        let store = memory_store().await;
        let service = PlaybackService::start(config(&library, store.clone()), None)
            .await
            .unwrap();
        assert!(!service.is_listening());

        let outcome = service.engine().play("gone.flac").await.unwrap();
        assert_eq!(outcome, core_service::PlayOutcome::Failed(TrackId::new("gone.flac")));
        assert_eq!(
            core_playback::read_snapshot(store.as_ref()).await.status,
            PlaybackStatus::Failed
        );

        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_mismatched_container_reads_unknown() {
        let library = library(&["a"]);
        let shared = TempDir::new().unwrap();

        let engine_store = Arc::new(SqliteSharedStore::open_in(shared.path(), CONTAINER).unwrap());
        let service = PlaybackService::start(config(&library, engine_store), None)
            .await
            .unwrap();
        service.engine().play("a.flac").await.unwrap();

        let other = Arc::new(SqliteSharedStore::open_in(shared.path(), "group.other").unwrap());
        let (transport, _receiver) = loopback_channel(1);
        let surface = ControlSurface::new(Arc::new(transport), idle_launcher(), other);
        assert!(surface.read_snapshot().await.is_unknown());

        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_restart_continues_snapshot_revision() {
        let library = library(&["a"]);
        let store = memory_store().await;

        let first = PlaybackService::start(config(&library, store.clone()), None)
            .await
            .unwrap();
        first.engine().play("a.flac").await.unwrap();
        first.shutdown().await.unwrap();
        let before = core_playback::read_snapshot(store.as_ref()).await.revision;

        let second = PlaybackService::start(config(&library, store.clone()), None)
            .await
            .unwrap();
        second.engine().play("a.flac").await.unwrap();
        let after = core_playback::read_snapshot(store.as_ref()).await.revision;
        assert!(after > before);

        second.shutdown().await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_desktop_socket_round_trip() {
        let library = library(&["a"]);
        let shared = TempDir::new().unwrap();

        let engine_store = Arc::new(SqliteSharedStore::open_in(shared.path(), CONTAINER).unwrap());
        let surface = ControlSurface::desktop(CONTAINER, shared.path(), "/bin/true").unwrap();

        // Nobody listening yet.
        assert_eq!(surface.next().await.unwrap(), DeliveryOutcome::Dropped);

        let service = PlaybackService::start_desktop(config(&library, engine_store), shared.path())
            .await
            .unwrap();
        service
            .engine()
            .replace_queue(vec![TrackId::new("a.flac")])
            .await
            .unwrap();

        assert_eq!(surface.next().await.unwrap(), DeliveryOutcome::Delivered);
        let snapshot = wait_for_snapshot(&surface, |s| s.status == PlaybackStatus::Playing).await;
        assert_eq!(snapshot.track_id.as_deref(), Some("a.flac"));

        service.shutdown().await.unwrap();
    }
}
