//! Shared Storage Abstraction
//!
//! A small key-value store that both the main process and the control-surface
//! process can open. On Apple platforms this is an app-group container, on
//! Android a shared preferences file, on desktop a SQLite file in a shared
//! directory.
//!
//! Both processes must open the store with the same container identifier. A
//! mismatch is not detected: the reader simply sees an empty store.

use async_trait::async_trait;

use crate::error::Result;

/// Cross-process key-value storage.
///
/// Values are strings; callers serialize structured data themselves. Writes
/// are last-write-wins and no conflict resolution is performed.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SharedStore;
///
/// async fn publish(store: &dyn SharedStore, json: &str) -> bridge_traits::error::Result<()> {
///     store.set_string("playback.snapshot", json).await
/// }
/// ```
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Identifier of the shared container this store was opened with.
    fn container_id(&self) -> &str;

    /// Store a string value, replacing any previous value.
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value.
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Delete a value. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a key exists
    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.get_string(key).await?.is_some())
    }
}
