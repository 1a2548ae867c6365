//! Local file resource access using Tokio

use async_trait::async_trait;
use bridge_traits::{
    access::{AccessToken, DynAsyncRead, ResourceAccess, ResourceDescriptor},
    error::{BridgeError, Result},
    playback::{AudioSource, PlaybackMetadata},
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Resolves track ids as paths relative to a library root.
///
/// Desktop platforms have no scoped-access grants, but tokens are still
/// tracked so unbalanced `begin_access`/`end_access` pairs show up in logs and
/// tests.
pub struct LocalFileAccess {
    root: PathBuf,
    next_token: AtomicU64,
    active: Mutex<HashSet<u64>>,
}

impl LocalFileAccess {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            next_token: AtomicU64::new(1),
            active: Mutex::new(HashSet::new()),
        }
    }

    /// Use the platform music directory as the library root.
    pub fn default_library() -> Result<Self> {
        dirs::audio_dir()
            .map(Self::new)
            .ok_or_else(|| BridgeError::NotAvailable("No music directory".to_string()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of access scopes begun and not yet ended.
    pub fn active_scopes(&self) -> usize {
        self.active.lock().len()
    }

    fn track_path(&self, track_id: &str) -> Result<PathBuf> {
        let relative = Path::new(track_id);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if track_id.is_empty() || escapes {
            return Err(BridgeError::PermissionDenied(format!(
                "Track id '{}' is outside the library",
                track_id
            )));
        }
        Ok(self.root.join(relative))
    }
}

fn map_io(err: io::Error, track_id: &str) -> BridgeError {
    match err.kind() {
        io::ErrorKind::NotFound => BridgeError::NotFound(track_id.to_string()),
        io::ErrorKind::PermissionDenied => BridgeError::PermissionDenied(track_id.to_string()),
        _ => BridgeError::Io(err),
    }
}

#[async_trait]
impl ResourceAccess for LocalFileAccess {
    async fn locate(&self, track_id: &str) -> Result<ResourceDescriptor> {
        let path = self.track_path(track_id)?;
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| map_io(e, track_id))?;

        if !meta.is_file() {
            return Err(BridgeError::NotFound(track_id.to_string()));
        }

        let title = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| track_id.to_string());

        debug!(track_id = track_id, bytes = meta.len(), "Located local track");

        Ok(ResourceDescriptor::new(track_id, AudioSource::LocalFile { path })
            .with_metadata(PlaybackMetadata::titled(title))
            .with_byte_len(meta.len()))
    }

    fn begin_access(&self, descriptor: &ResourceDescriptor) -> Result<AccessToken> {
        let raw = self.next_token.fetch_add(1, Ordering::Relaxed);
        self.active.lock().insert(raw);
        debug!(track_id = %descriptor.track_id, token = raw, "Began access");
        Ok(AccessToken::new(raw))
    }

    fn end_access(&self, token: AccessToken) {
        if !self.active.lock().remove(&token.raw()) {
            warn!(%token, "Ended access that was not active");
        }
    }

    async fn open(&self, descriptor: &ResourceDescriptor) -> Result<Box<DynAsyncRead>> {
        match &descriptor.source {
            AudioSource::LocalFile { path } => {
                let file = tokio::fs::File::open(path)
                    .await
                    .map_err(|e| map_io(e, &descriptor.track_id))?;
                Ok(Box::new(file))
            }
            _ => Err(BridgeError::NotAvailable(
                "LocalFileAccess only opens local files".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_locate_and_open() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::create_dir_all(dir.path().join("album")).await.unwrap();
        tokio::fs::write(dir.path().join("album/Intro.flac"), b"audio")
            .await
            .unwrap();

        let access = LocalFileAccess::new(dir.path());
        let descriptor = access.locate("album/Intro.flac").await.unwrap();
        assert_eq!(descriptor.metadata.title.as_deref(), Some("Intro"));
        assert_eq!(descriptor.byte_len, Some(5));

        let token = access.begin_access(&descriptor).unwrap();
        assert_eq!(access.active_scopes(), 1);

        let mut reader = access.open(&descriptor).await.unwrap();
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"audio");

        access.end_access(token);
        assert_eq!(access.active_scopes(), 0);
    }

    #[tokio::test]
    async fn test_missing_track_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let access = LocalFileAccess::new(dir.path());

        let err = access.locate("missing.mp3").await.unwrap_err();
        assert!(matches!(err, BridgeError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_directory_is_not_a_track() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::create_dir_all(dir.path().join("album")).await.unwrap();
        let access = LocalFileAccess::new(dir.path());

        assert!(matches!(
            access.locate("album").await.unwrap_err(),
            BridgeError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_escaping_ids_are_denied() {
        let access = LocalFileAccess::new("/music");

        for id in ["../etc/passwd", "/etc/passwd", ""] {
            assert!(matches!(
                access.locate(id).await.unwrap_err(),
                BridgeError::PermissionDenied(_)
            ));
        }
    }
}
