//! Local persistence.
//!
//! - [`state`]: small JSON documents (credential lists, settings, usage ledger, voice cache)
//! - [`artifacts`]: generated audio artifacts

pub mod artifacts;
pub mod state;

use thiserror::Error;

pub use artifacts::{
    ArtifactStore, FilesystemArtifactStore, GeneratedArtifact, MemoryArtifactStore,
    PlaybackHandle,
};
pub use state::{FileStateStore, MemoryStateStore, StateStore, load_json, save_json};

/// Errors that can occur in the persistence layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O error occurred during filesystem operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend-specific error.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Result type for persistence operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
