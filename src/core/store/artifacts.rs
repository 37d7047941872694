//! Durable storage of generated audio artifacts.
//!
//! An artifact is the single finished result of one generation run. Stores are
//! keyed by artifact id and support insert-or-replace, listing newest first,
//! single delete, clear and full-replace update (used for renames).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};
use xxhash_rust::xxh3::xxh3_128;

use super::StoreResult;
use super::state::write_atomic;
use crate::core::audio::detect_audio_format;

/// Number of source-text characters used for the default display name.
pub const DISPLAY_NAME_PREFIX_CHARS: usize = 50;

/// Display name used when the source text yields an empty prefix.
pub const UNTITLED_DISPLAY_NAME: &str = "Untitled Audio";

/// In-process reference used to play an artifact back.
///
/// Derived from the audio bytes and never persisted; stores rebuild it on every
/// listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackHandle {
    pub mime_type: &'static str,
    pub extension: &'static str,
}

impl PlaybackHandle {
    pub fn from_audio(audio: &[u8]) -> Self {
        let (mime_type, extension) = detect_audio_format(audio);
        Self {
            mime_type,
            extension,
        }
    }
}

/// One finished, persisted generated-audio object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedArtifact {
    pub id: String,
    #[serde(skip)]
    pub audio: Bytes,
    /// Full source text of the run.
    pub text: String,
    pub voice_name: String,
    /// Creation time in epoch milliseconds.
    pub created_at: u64,
    pub display_name: String,
    #[serde(skip)]
    pub playback: Option<PlaybackHandle>,
}

impl GeneratedArtifact {
    /// Build an artifact whose id and display name derive from its inputs.
    pub fn new(
        audio: Bytes,
        text: impl Into<String>,
        voice_name: impl Into<String>,
        created_at: u64,
    ) -> Self {
        let text = text.into();
        let display_name = default_display_name(&text);
        let playback = Some(PlaybackHandle::from_audio(&audio));
        Self {
            id: format!("audio-final-{created_at}"),
            audio,
            text,
            voice_name: voice_name.into(),
            created_at,
            display_name,
            playback,
        }
    }

    /// Copy of this artifact with a new display name.
    pub fn renamed(&self, display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            ..self.clone()
        }
    }

    fn with_playback(mut self) -> Self {
        self.playback = Some(PlaybackHandle::from_audio(&self.audio));
        self
    }
}

fn default_display_name(text: &str) -> String {
    let prefix: String = text.chars().take(DISPLAY_NAME_PREFIX_CHARS).collect();
    if prefix.is_empty() {
        UNTITLED_DISPLAY_NAME.to_string()
    } else {
        prefix
    }
}

/// Trait defining the interface for artifact backends.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Insert an artifact, replacing any existing one with the same id.
    async fn insert(&self, artifact: &GeneratedArtifact) -> StoreResult<()>;

    /// Fetch one artifact by id.
    async fn get(&self, id: &str) -> StoreResult<Option<GeneratedArtifact>>;

    /// All artifacts, newest first, with playback handles rebuilt.
    async fn list_all(&self) -> StoreResult<Vec<GeneratedArtifact>>;

    /// Delete one artifact. Deleting an unknown id is not an error.
    async fn delete(&self, id: &str) -> StoreResult<()>;

    /// Delete every artifact.
    async fn clear(&self) -> StoreResult<()>;

    /// Replace a stored artifact in full.
    async fn update(&self, artifact: &GeneratedArtifact) -> StoreResult<()> {
        self.insert(artifact).await
    }

    /// Change the display name of a stored artifact.
    ///
    /// Returns the updated artifact, or `None` when the id is unknown.
    async fn rename(&self, id: &str, display_name: &str) -> StoreResult<Option<GeneratedArtifact>> {
        let Some(existing) = self.get(id).await? else {
            return Ok(None);
        };
        let updated = existing.renamed(display_name);
        self.update(&updated).await?;
        Ok(Some(updated))
    }

    /// Returns the backend type as a string identifier.
    fn backend_type(&self) -> &str;
}

fn sort_newest_first(artifacts: &mut [GeneratedArtifact]) {
    artifacts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// In-memory artifact backend.
#[derive(Default)]
pub struct MemoryArtifactStore {
    artifacts: RwLock<HashMap<String, GeneratedArtifact>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn insert(&self, artifact: &GeneratedArtifact) -> StoreResult<()> {
        let mut stored = artifact.clone();
        stored.playback = None;
        self.artifacts.write().insert(stored.id.clone(), stored);
        Ok(())
    }

    async fn get(&self, id: &str) -> StoreResult<Option<GeneratedArtifact>> {
        Ok(self
            .artifacts
            .read()
            .get(id)
            .cloned()
            .map(GeneratedArtifact::with_playback))
    }

    async fn list_all(&self) -> StoreResult<Vec<GeneratedArtifact>> {
        let mut all: Vec<_> = self
            .artifacts
            .read()
            .values()
            .cloned()
            .map(GeneratedArtifact::with_playback)
            .collect();
        sort_newest_first(&mut all);
        Ok(all)
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        self.artifacts.write().remove(id);
        Ok(())
    }

    async fn clear(&self) -> StoreResult<()> {
        self.artifacts.write().clear();
        Ok(())
    }

    fn backend_type(&self) -> &str {
        "memory"
    }
}

/// Filesystem artifact backend.
///
/// Each artifact is a pair of files named after the xxh3 hash of its id: the
/// raw audio (`.audio`) and its metadata (`.json`). The metadata file is written
/// last, so an artifact without it is incomplete and ignored.
pub struct FilesystemArtifactStore {
    base_path: PathBuf,
}

impl FilesystemArtifactStore {
    /// Creates the backend, creating `base_path` if needed.
    pub async fn new(base_path: impl Into<PathBuf>) -> StoreResult<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).await?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn stem(id: &str) -> String {
        format!("{:032x}", xxh3_128(id.as_bytes()))
    }

    fn meta_path(&self, id: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", Self::stem(id)))
    }

    fn audio_path(&self, id: &str) -> PathBuf {
        self.base_path.join(format!("{}.audio", Self::stem(id)))
    }

    async fn read_meta(&self, path: &Path) -> StoreResult<Option<GeneratedArtifact>> {
        let meta = match fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut artifact: GeneratedArtifact = serde_json::from_slice(&meta)?;

        match fs::read(self.audio_path(&artifact.id)).await {
            Ok(audio) => {
                artifact.audio = Bytes::from(audio);
                Ok(Some(artifact.with_playback()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(id = %artifact.id, "Artifact metadata without audio, skipping");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ArtifactStore for FilesystemArtifactStore {
    async fn insert(&self, artifact: &GeneratedArtifact) -> StoreResult<()> {
        write_atomic(&self.audio_path(&artifact.id), &artifact.audio).await?;
        let meta = serde_json::to_vec(artifact)?;
        write_atomic(&self.meta_path(&artifact.id), &meta).await?;
        debug!(id = %artifact.id, bytes = artifact.audio.len(), "Artifact stored");
        Ok(())
    }

    async fn get(&self, id: &str) -> StoreResult<Option<GeneratedArtifact>> {
        self.read_meta(&self.meta_path(id)).await
    }

    async fn list_all(&self) -> StoreResult<Vec<GeneratedArtifact>> {
        let mut all = Vec::new();
        let mut entries = fs::read_dir(&self.base_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match self.read_meta(&path).await {
                Ok(Some(artifact)) => all.push(artifact),
                Ok(None) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Unreadable artifact, skipping"),
            }
        }
        sort_newest_first(&mut all);
        Ok(all)
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        for path in [self.meta_path(id), self.audio_path(id)] {
            match fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    async fn clear(&self) -> StoreResult<()> {
        warn!("Clearing artifact store at {:?}", self.base_path);
        match fs::remove_dir_all(&self.base_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        fs::create_dir_all(&self.base_path).await?;
        Ok(())
    }

    fn backend_type(&self) -> &str {
        "filesystem"
    }
}
