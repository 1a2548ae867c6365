//! # Resource Resolver
//!
//! Turns a [`TrackId`] into a [`ResourceHandle`]: locate the track, open a
//! scoped-access session, open the stream. The whole sequence runs under a
//! timeout so a stuck host call can never stall a preload slot or the direct
//! load path.
//!
//! Scoped access is held by an [`AccessGuard`]. It ends the scope when
//! dropped, which covers every exit: success (the guard moves into the
//! handle), a failed `open`, a timeout, or the resolving future being dropped.

use crate::error::ResolutionError;
use crate::track::TrackId;
use async_trait::async_trait;
use bridge_traits::{
    error::Result as BridgeResult, AccessToken, AudioSource, DynAsyncRead, PlaybackMetadata,
    PlaybackRequest, ResourceAccess, ResourceDescriptor,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Ends a scoped-access session when dropped.
pub struct AccessGuard {
    access: Arc<dyn ResourceAccess>,
    token: AccessToken,
}

impl AccessGuard {
    /// Begin scoped access for `descriptor`.
    pub fn begin(
        access: Arc<dyn ResourceAccess>,
        descriptor: &ResourceDescriptor,
    ) -> BridgeResult<Self> {
        let token = access.begin_access(descriptor)?;
        Ok(Self { access, token })
    }

    pub fn token(&self) -> AccessToken {
        self.token
    }
}

impl Drop for AccessGuard {
    fn drop(&mut self) {
        self.access.end_access(self.token);
    }
}

impl fmt::Debug for AccessGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessGuard").field("token", &self.token).finish()
    }
}

/// A resolved, playable resource.
///
/// Owns the descriptor, the opened stream, and the access scope. Not
/// `Clone`: it lives in exactly one cache entry or one engine session, and
/// dropping it is the only way to release it.
pub struct ResourceHandle {
    descriptor: ResourceDescriptor,
    stream: Option<Box<DynAsyncRead>>,
    _guard: Option<AccessGuard>,
}

impl ResourceHandle {
    pub fn new(
        descriptor: ResourceDescriptor,
        stream: Box<DynAsyncRead>,
        guard: Option<AccessGuard>,
    ) -> Self {
        Self {
            descriptor,
            stream: Some(stream),
            _guard: guard,
        }
    }

    pub fn track_id(&self) -> &str {
        &self.descriptor.track_id
    }

    pub fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    pub fn metadata(&self) -> &PlaybackMetadata {
        &self.descriptor.metadata
    }

    pub fn source(&self) -> &AudioSource {
        &self.descriptor.source
    }

    /// Take the opened stream, e.g. to feed a decoder. The access scope stays
    /// held until the handle itself drops.
    pub fn take_stream(&mut self) -> Option<Box<DynAsyncRead>> {
        self.stream.take()
    }

    /// Request for the host audio engine.
    pub fn playback_request(&self) -> PlaybackRequest {
        PlaybackRequest::new(self.descriptor.track_id.clone(), self.descriptor.source.clone())
            .with_metadata(self.descriptor.metadata.clone())
    }
}

impl fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("track_id", &self.descriptor.track_id)
            .field("has_stream", &self.stream.is_some())
            .field("guard", &self._guard)
            .finish()
    }
}

/// Resolves tracks to handles. The preload cache and the engine's direct
/// path both go through this seam.
#[async_trait]
pub trait TrackResolver: Send + Sync {
    async fn resolve(&self, track_id: &TrackId) -> Result<ResourceHandle, ResolutionError>;
}

/// [`TrackResolver`] backed by the host's [`ResourceAccess`] bridge.
pub struct ResourceResolver {
    access: Arc<dyn ResourceAccess>,
    timeout: Duration,
}

impl ResourceResolver {
    pub fn new(access: Arc<dyn ResourceAccess>, timeout: Duration) -> Self {
        Self { access, timeout }
    }

    #[instrument(skip(self), fields(track_id = %track_id))]
    async fn resolve_inner(&self, track_id: &TrackId) -> Result<ResourceHandle, ResolutionError> {
        let descriptor = self.access.locate(track_id.as_str()).await?;
        let guard = AccessGuard::begin(Arc::clone(&self.access), &descriptor)?;
        let stream = self.access.open(&descriptor).await?;

        debug!(token = %guard.token(), "Resolved track");
        Ok(ResourceHandle::new(descriptor, stream, Some(guard)))
    }
}

#[async_trait]
impl TrackResolver for ResourceResolver {
    async fn resolve(&self, track_id: &TrackId) -> Result<ResourceHandle, ResolutionError> {
        match tokio::time::timeout(self.timeout, self.resolve_inner(track_id)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(track_id = %track_id, timeout = ?self.timeout, "Track resolution timed out");
                Err(ResolutionError::Timeout(self.timeout))
            }
        }
    }
}
