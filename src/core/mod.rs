pub mod audio;
pub mod chunker;
pub mod generator;
pub mod ledger;
pub mod preferences;
pub mod store;
pub mod tts;
pub mod voices;

// Re-export commonly used types for convenience
pub use audio::{PcmFormat, encode_wav};
pub use chunker::split_text;

pub use generator::{
    FnObserver, GenerationError, GenerationObserver, GenerationRequest, GenerationResult,
    Generator, GeneratorConfig, NoopObserver,
};

pub use ledger::{QuotaLedger, QuotaRecord};

pub use preferences::{ApiKeys, Preferences, Settings, SettingsUpdate};

pub use store::{
    ArtifactStore, FileStateStore, FilesystemArtifactStore, GeneratedArtifact,
    MemoryArtifactStore, MemoryStateStore, StateStore, StoreError, StoreResult,
};

pub use tts::{
    AccountInfo, AudioPayload, BoxedSpeechProvider, ElevenLabsTuning, ProviderError,
    ProviderErrorKind, ProviderKind, SpeechProvider, SynthesisRequest, Voice,
    create_speech_provider,
};

pub use voices::VoiceCatalog;
