//! # Preload Cache Manager
//!
//! Index of resolved (or resolving) handles for the upcoming queue window.
//!
//! The index itself is plain data owned by the engine actor. Resolution
//! happens on spawned tasks that never touch the index; they report a
//! [`Completion`] over an unbounded channel and the actor applies it with
//! [`PreloadCache::complete`]. Each scheduled resolution gets a fresh
//! generation number, so a completion for an entry that has since been
//! evicted or rescheduled is recognised and dropped.

use crate::cache::{config::PreloadConfig, stats::CacheStats};
use crate::error::ResolutionError;
use crate::resolver::{ResourceHandle, TrackResolver};
use crate::track::TrackId;
use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace};

/// Observable state of a cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryState {
    Pending,
    Ready,
    Failed(ResolutionError),
}

enum EntryStatus {
    Pending,
    Ready(ResourceHandle),
    Failed(ResolutionError),
}

struct CacheEntry {
    status: EntryStatus,
    /// Queue version this entry was last validated against.
    queue_version: u64,
    generation: u64,
    cancel: CancellationToken,
}

/// Result of one resolution task.
pub struct Completion {
    track_id: TrackId,
    generation: u64,
    result: Result<ResourceHandle, ResolutionError>,
}

impl Completion {
    pub fn track_id(&self) -> &TrackId {
        &self.track_id
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("track_id", &self.track_id)
            .field("generation", &self.generation)
            .field("ok", &self.result.is_ok())
            .finish()
    }
}

/// Bounded preload cache.
pub struct PreloadCache {
    config: PreloadConfig,
    resolver: Arc<dyn TrackResolver>,
    entries: HashMap<TrackId, CacheEntry>,
    semaphore: Arc<Semaphore>,
    completions: mpsc::UnboundedSender<Completion>,
    next_generation: u64,
    queue_version: u64,
    stats: CacheStats,
    event_bus: Option<EventBus>,
}

impl PreloadCache {
    /// Create a cache and the receiver its resolution tasks report to.
    ///
    /// The owner must drain the receiver and feed each item back through
    /// [`complete`](Self::complete).
    pub fn new(
        config: PreloadConfig,
        resolver: Arc<dyn TrackResolver>,
    ) -> (Self, mpsc::UnboundedReceiver<Completion>) {
        let (completions, rx) = mpsc::unbounded_channel();
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_resolutions));

        let cache = Self {
            config,
            resolver,
            entries: HashMap::new(),
            semaphore,
            completions,
            next_generation: 0,
            queue_version: 0,
            stats: CacheStats::default(),
            event_bus: None,
        };
        (cache, rx)
    }

    /// Set event bus for preload events.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn config(&self) -> &PreloadConfig {
        &self.config
    }

    fn emit(&self, event: CacheEvent) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Cache(event));
        }
    }

    /// Schedule resolution for every window entry that is neither ready nor
    /// already resolving. Failed entries are retried.
    ///
    /// Must be called from within a Tokio runtime. Returns the number of
    /// resolutions scheduled.
    #[instrument(skip(self, window), fields(window = window.len()))]
    pub fn prepare(&mut self, window: &[TrackId]) -> usize {
        let mut scheduled = 0;
        for track_id in window.iter().take(self.config.window_size) {
            let in_flight_or_ready = matches!(
                self.entries.get(track_id).map(|entry| &entry.status),
                Some(EntryStatus::Pending) | Some(EntryStatus::Ready(_))
            );
            if !in_flight_or_ready {
                self.schedule(track_id.clone());
                scheduled += 1;
            }
        }
        scheduled
    }

    fn schedule(&mut self, track_id: TrackId) {
        self.next_generation += 1;
        let generation = self.next_generation;
        let cancel = CancellationToken::new();

        if let Some(previous) = self.entries.insert(
            track_id.clone(),
            CacheEntry {
                status: EntryStatus::Pending,
                queue_version: self.queue_version,
                generation,
                cancel: cancel.clone(),
            },
        ) {
            previous.cancel.cancel();
        }

        self.stats.scheduled += 1;
        debug!(track_id = %track_id, generation, "Scheduled preload");
        self.emit(CacheEvent::PreloadScheduled {
            track_id: track_id.to_string(),
            queue_version: self.queue_version,
        });

        let resolver = Arc::clone(&self.resolver);
        let semaphore = Arc::clone(&self.semaphore);
        let completions = self.completions.clone();

        tokio::spawn(async move {
            let _permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    trace!(track_id = %track_id, "Preload cancelled before start");
                    return;
                }
                permit = semaphore.acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return,
                },
            };

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    trace!(track_id = %track_id, "Preload cancelled while resolving");
                    return;
                }
                result = resolver.resolve(&track_id) => result,
            };

            // A closed channel means the cache is gone; the handle drops here.
            let _ = completions.send(Completion {
                track_id,
                generation,
                result,
            });
        });
    }

    /// Apply a finished resolution. Returns `false` if the completion was
    /// stale and has been discarded (its handle is dropped).
    pub fn complete(&mut self, completion: Completion) -> bool {
        let Completion {
            track_id,
            generation,
            result,
        } = completion;

        let entry = match self.entries.get_mut(&track_id) {
            Some(entry)
                if entry.generation == generation
                    && matches!(entry.status, EntryStatus::Pending) =>
            {
                entry
            }
            _ => {
                self.stats.discarded += 1;
                debug!(track_id = %track_id, generation, "Discarded stale preload result");
                return false;
            }
        };

        let event = match result {
            Ok(handle) => {
                entry.status = EntryStatus::Ready(handle);
                self.stats.resolved += 1;
                debug!(track_id = %track_id, "Preload ready");
                CacheEvent::PreloadReady {
                    track_id: track_id.to_string(),
                }
            }
            Err(err) => {
                debug!(track_id = %track_id, error = %err, "Preload failed");
                let reason = err.to_string();
                entry.status = EntryStatus::Failed(err);
                self.stats.failed += 1;
                CacheEvent::PreloadFailed {
                    track_id: track_id.to_string(),
                    reason,
                }
            }
        };
        self.emit(event);
        true
    }

    /// Take a ready handle out of the cache.
    ///
    /// Pending, failed, and absent entries are misses and stay where they
    /// are.
    pub fn lookup(&mut self, track_id: &TrackId) -> Option<ResourceHandle> {
        let ready = matches!(
            self.entries.get(track_id).map(|entry| &entry.status),
            Some(EntryStatus::Ready(_))
        );

        let handle = if ready {
            match self.entries.remove(track_id) {
                Some(CacheEntry {
                    status: EntryStatus::Ready(handle),
                    ..
                }) => Some(handle),
                _ => None,
            }
        } else {
            None
        };

        let hit = handle.is_some();
        if hit {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
        }
        debug!(track_id = %track_id, hit, "Preload lookup");
        self.emit(CacheEvent::Lookup {
            track_id: track_id.to_string(),
            hit,
        });
        handle
    }

    /// Evict every entry outside `window` and restamp the rest with
    /// `queue_version`. Returns the number of evicted entries.
    #[instrument(skip(self, window), fields(window = window.len()))]
    pub fn invalidate(&mut self, queue_version: u64, window: &[TrackId]) -> usize {
        self.queue_version = queue_version;

        let keep: HashSet<&TrackId> = window.iter().take(self.config.window_size).collect();
        let stale: Vec<TrackId> = self
            .entries
            .keys()
            .filter(|track_id| !keep.contains(track_id))
            .cloned()
            .collect();

        for track_id in &stale {
            self.evict(track_id);
        }

        for entry in self.entries.values_mut() {
            entry.queue_version = queue_version;
        }

        stale.len()
    }

    fn evict(&mut self, track_id: &TrackId) {
        if let Some(entry) = self.entries.remove(track_id) {
            entry.cancel.cancel();
            self.stats.evicted += 1;
            debug!(track_id = %track_id, "Evicted preload entry");
            self.emit(CacheEvent::Evicted {
                track_id: track_id.to_string(),
            });
        }
    }

    /// Drop any entry for `track_id`.
    pub fn forget(&mut self, track_id: &TrackId) -> bool {
        match self.entries.remove(track_id) {
            Some(entry) => {
                entry.cancel.cancel();
                debug!(track_id = %track_id, "Forgot preload entry");
                true
            }
            None => false,
        }
    }

    /// Evict everything.
    pub fn clear(&mut self) {
        let all: Vec<TrackId> = self.entries.keys().cloned().collect();
        for track_id in &all {
            self.evict(track_id);
        }
    }

    pub fn state_of(&self, track_id: &TrackId) -> Option<EntryState> {
        self.entries.get(track_id).map(|entry| match &entry.status {
            EntryStatus::Pending => EntryState::Pending,
            EntryStatus::Ready(_) => EntryState::Ready,
            EntryStatus::Failed(err) => EntryState::Failed(err.clone()),
        })
    }

    /// Queue version the entry was last validated against.
    pub fn entry_version(&self, track_id: &TrackId) -> Option<u64> {
        self.entries.get(track_id).map(|entry| entry.queue_version)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn queue_version(&self) -> u64 {
        self.queue_version
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            ready: self
                .entries
                .values()
                .filter(|entry| matches!(entry.status, EntryStatus::Ready(_)))
                .count(),
            ..self.stats.clone()
        }
    }
}

impl Drop for PreloadCache {
    fn drop(&mut self) {
        for entry in self.entries.values() {
            entry.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResourceHandle;
    use async_trait::async_trait;
    use bridge_traits::{AudioSource, ResourceDescriptor};
    use parking_lot::Mutex;
    use std::collections::HashMap as Map;
    use std::path::PathBuf;
    use std::time::Duration;

    /// Resolver whose outcome per track is scripted; unscripted tracks
    /// resolve after `delay`.
    #[derive(Default)]
    struct ScriptedResolver {
        failures: Map<String, ResolutionError>,
        delay: Duration,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedResolver {
        fn failing(track: &str, err: ResolutionError) -> Self {
            let mut failures = Map::new();
            failures.insert(track.to_string(), err);
            Self {
                failures,
                ..Default::default()
            }
        }

        fn calls_for(&self, track: &str) -> usize {
            self.calls.lock().iter().filter(|c| c.as_str() == track).count()
        }
    }

    #[async_trait]
    impl TrackResolver for ScriptedResolver {
        async fn resolve(&self, track_id: &TrackId) -> Result<ResourceHandle, ResolutionError> {
            self.calls.lock().push(track_id.to_string());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if let Some(err) = self.failures.get(track_id.as_str()) {
                return Err(err.clone());
            }
            let descriptor = ResourceDescriptor::new(
                track_id.as_str(),
                AudioSource::LocalFile {
                    path: PathBuf::from(format!("/music/{}", track_id)),
                },
            );
            Ok(ResourceHandle::new(
                descriptor,
                Box::new(std::io::Cursor::new(Vec::new())),
                None,
            ))
        }
    }

    fn ids(range: std::ops::RangeInclusive<u32>) -> Vec<TrackId> {
        range.map(|i| TrackId::new(format!("T{}", i))).collect()
    }

    async fn drain(
        cache: &mut PreloadCache,
        rx: &mut mpsc::UnboundedReceiver<Completion>,
        expected: usize,
    ) {
        for _ in 0..expected {
            let completion = rx.recv().await.unwrap();
            cache.complete(completion);
        }
    }

    #[tokio::test]
    async fn test_prepare_resolves_window_and_lookup_moves_handle_out() {
        let resolver = Arc::new(ScriptedResolver::default());
        let (mut cache, mut rx) = PreloadCache::new(PreloadConfig::default(), resolver.clone());

        let window = ids(1..=10);
        assert_eq!(cache.prepare(&window), 10);
        drain(&mut cache, &mut rx, 10).await;

        assert_eq!(cache.state_of(&"T5".into()), Some(EntryState::Ready));
        let handle = cache.lookup(&"T5".into()).unwrap();
        assert_eq!(handle.track_id(), "T5");
        assert_eq!(cache.state_of(&"T5".into()), None);
        assert!(cache.lookup(&"T5".into()).is_none());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.resolved, 10);
        assert_eq!(stats.entries, 9);
    }

    #[tokio::test]
    async fn test_prepare_is_idempotent() {
        let resolver = Arc::new(ScriptedResolver::default());
        let (mut cache, mut rx) = PreloadCache::new(PreloadConfig::default(), resolver.clone());

        let window = ids(1..=3);
        assert_eq!(cache.prepare(&window), 3);
        assert_eq!(cache.prepare(&window), 0);
        drain(&mut cache, &mut rx, 3).await;
        assert_eq!(cache.prepare(&window), 0);
        assert_eq!(resolver.calls_for("T1"), 1);
    }

    #[tokio::test]
    async fn test_prepare_truncates_to_window_size() {
        let resolver = Arc::new(ScriptedResolver::default());
        let config = PreloadConfig::default().with_window_size(4);
        let (mut cache, _rx) = PreloadCache::new(config, resolver);

        assert_eq!(cache.prepare(&ids(1..=20)), 4);
        assert_eq!(cache.len(), 4);
    }

    #[tokio::test]
    async fn test_failed_entry_is_never_a_hit_and_is_retried() {
        let resolver = Arc::new(ScriptedResolver::failing(
            "T2",
            ResolutionError::IoError("disk".into()),
        ));
        let (mut cache, mut rx) = PreloadCache::new(PreloadConfig::default(), resolver.clone());

        cache.prepare(&ids(1..=3));
        drain(&mut cache, &mut rx, 3).await;

        assert!(matches!(
            cache.state_of(&"T2".into()),
            Some(EntryState::Failed(ResolutionError::IoError(_)))
        ));
        assert!(cache.lookup(&"T2".into()).is_none());
        // Misses leave the failed entry in place.
        assert!(cache.state_of(&"T2".into()).is_some());

        assert_eq!(cache.prepare(&ids(1..=3)), 1);
        assert_eq!(cache.state_of(&"T2".into()), Some(EntryState::Pending));
        assert_eq!(resolver.calls_for("T2"), 1);
        drain(&mut cache, &mut rx, 1).await;
        assert_eq!(resolver.calls_for("T2"), 2);
        assert_eq!(cache.stats().failed, 2);
    }

    #[tokio::test]
    async fn test_invalidate_evicts_outside_window_and_restamps() {
        let resolver = Arc::new(ScriptedResolver::default());
        let (mut cache, mut rx) = PreloadCache::new(PreloadConfig::default(), resolver);

        cache.invalidate(1, &ids(1..=5));
        cache.prepare(&ids(1..=5));
        drain(&mut cache, &mut rx, 5).await;
        assert_eq!(cache.entry_version(&"T3".into()), Some(1));

        let evicted = cache.invalidate(2, &ids(3..=7));
        assert_eq!(evicted, 2);
        assert!(cache.state_of(&"T1".into()).is_none());
        assert!(cache.state_of(&"T2".into()).is_none());
        assert_eq!(cache.entry_version(&"T3".into()), Some(2));
        assert_eq!(cache.stats().evicted, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_evicted_in_flight_resolution_is_cancelled() {
        let resolver = Arc::new(ScriptedResolver {
            delay: Duration::from_millis(100),
            ..Default::default()
        });
        let config = PreloadConfig::default().with_max_concurrent_resolutions(1);
        let (mut cache, mut rx) = PreloadCache::new(config, resolver.clone());

        cache.prepare(&ids(1..=1));
        // Let T1 take the only permit and start resolving.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(resolver.calls_for("T1"), 1);

        // Evict, then schedule the same id again under a new generation.
        cache.invalidate(1, &[]);
        cache.prepare(&ids(1..=1));

        let completion = rx.recv().await.unwrap();
        assert_eq!(completion.track_id(), &TrackId::new("T1"));
        assert!(cache.complete(completion));
        assert_eq!(cache.state_of(&"T1".into()), Some(EntryState::Ready));
        // The evicted task was cancelled mid-flight and never reported.
        assert_eq!(cache.stats().discarded, 0);
    }

    #[tokio::test]
    async fn test_stale_generation_is_discarded() {
        let resolver = Arc::new(ScriptedResolver::default());
        let (mut cache, mut rx) = PreloadCache::new(PreloadConfig::default(), resolver);

        cache.prepare(&ids(1..=1));
        let completion = rx.recv().await.unwrap();

        cache.invalidate(1, &[]);
        assert!(!cache.complete(completion));
        assert!(cache.is_empty());
        assert_eq!(cache.stats().discarded, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_is_bounded() {
        let resolver = Arc::new(ScriptedResolver {
            delay: Duration::from_secs(1),
            ..Default::default()
        });
        let (mut cache, mut rx) = PreloadCache::new(PreloadConfig::default(), resolver.clone());

        cache.prepare(&ids(1..=6));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(resolver.calls.lock().len(), 2);

        drain(&mut cache, &mut rx, 6).await;
        assert_eq!(resolver.calls.lock().len(), 6);
    }

    #[tokio::test]
    async fn test_events_are_published() {
        let bus = EventBus::new(64);
        let mut events = bus.subscribe();
        let resolver = Arc::new(ScriptedResolver::default());
        let (cache, mut rx) = PreloadCache::new(PreloadConfig::default(), resolver);
        let mut cache = cache.with_event_bus(bus);

        cache.prepare(&ids(1..=1));
        drain(&mut cache, &mut rx, 1).await;
        cache.invalidate(1, &[]);

        let mut seen = Vec::new();
        while let Ok(CoreEvent::Cache(event)) = events.try_recv() {
            seen.push(event);
        }
        assert!(matches!(seen[0], CacheEvent::PreloadScheduled { .. }));
        assert!(matches!(seen[1], CacheEvent::PreloadReady { .. }));
        assert!(matches!(seen[2], CacheEvent::Evicted { .. }));
    }

    #[tokio::test]
    async fn test_forget_and_clear() {
        let resolver = Arc::new(ScriptedResolver::default());
        let (mut cache, mut rx) = PreloadCache::new(PreloadConfig::default(), resolver);

        cache.prepare(&ids(1..=3));
        drain(&mut cache, &mut rx, 3).await;

        assert!(cache.forget(&"T1".into()));
        assert!(!cache.forget(&"T1".into()));
        cache.clear();
        assert!(cache.is_empty());
    }
}
