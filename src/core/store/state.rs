//! Key-value store for small JSON state documents.
//!
//! Everything the engine remembers between sessions apart from the audio itself
//! lives here: the per-key usage ledger, the voice list cache, credential lists
//! and user settings. Values are opaque bytes at the trait level; [`load_json`]
//! and [`save_json`] add typed access on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use xxhash_rust::xxh3::xxh3_128;

use super::StoreResult;

/// Trait defining the interface for state backends.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Retrieves a value by key.
    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>>;

    /// Stores a value, replacing any previous one.
    async fn put(&self, key: &str, value: Bytes) -> StoreResult<()>;

    /// Deletes a value by key. Deleting a missing key is not an error.
    async fn remove(&self, key: &str) -> StoreResult<()>;

    /// Returns the backend type as a string identifier.
    fn backend_type(&self) -> &str;
}

/// Load and deserialize a JSON document.
///
/// A document that no longer parses is reported as absent and logged, so a
/// corrupt file never blocks startup.
pub async fn load_json<T: DeserializeOwned>(
    store: &dyn StateStore,
    key: &str,
) -> StoreResult<Option<T>> {
    let Some(raw) = store.get(key).await? else {
        return Ok(None);
    };
    match serde_json::from_slice(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(key, error = %e, "Discarding unreadable state document");
            Ok(None)
        }
    }
}

/// Serialize and store a JSON document.
pub async fn save_json<T: Serialize + ?Sized>(
    store: &dyn StateStore,
    key: &str,
    value: &T,
) -> StoreResult<()> {
    let raw = serde_json::to_vec(value)?;
    store.put(key, Bytes::from(raw)).await
}

/// In-memory state backend.
#[derive(Default)]
pub struct MemoryStateStore {
    entries: RwLock<HashMap<String, Bytes>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn put(&self, key: &str, value: Bytes) -> StoreResult<()> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn backend_type(&self) -> &str {
        "memory"
    }
}

/// Filesystem state backend: one JSON file per key.
pub struct FileStateStore {
    base_path: PathBuf,
}

impl FileStateStore {
    /// Creates the backend, creating `base_path` if needed.
    pub async fn new(base_path: impl Into<PathBuf>) -> StoreResult<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).await?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn file_path(&self, key: &str) -> PathBuf {
        let hash = format!("{:032x}", xxh3_128(key.as_bytes()));
        self.base_path.join(format!("{hash}.json"))
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
        match fs::read(self.file_path(key)).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, value: Bytes) -> StoreResult<()> {
        let path = self.file_path(key);
        write_atomic(&path, &value).await?;
        debug!(key, bytes = value.len(), "State document written");
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        match fs::remove_file(self.file_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn backend_type(&self) -> &str {
        "filesystem"
    }
}

/// Write `data` to `path` through a temp file and rename.
pub(crate) async fn write_atomic(path: &Path, data: &[u8]) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let temp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&temp_path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(&temp_path, path).await?;
    Ok(())
}
