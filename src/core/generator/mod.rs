//! Long-form generation runs.
//!
//! A run chunks the input text, dispatches every chunk to the selected provider
//! with the provider's credential strategy, stitches the audio back together
//! and persists exactly one artifact. See [`Generator::generate`].

mod engine;
mod error;
mod observer;

use std::time::Duration;

pub use engine::{Generator, UNKNOWN_VOICE_NAME};
pub use error::{GenerationError, GenerationResult};
pub use observer::{FnObserver, GenerationObserver, NoopObserver};

use crate::core::chunker::DEFAULT_CHUNK_LIMIT;
use crate::core::ledger::DEFAULT_DAILY_LIMIT;
use crate::core::preferences::Settings;
use crate::core::tts::{ElevenLabsTuning, ProviderKind};
use crate::core::voices::DEFAULT_VOICES_CACHE_TTL;

/// Default pause between consecutive chunk requests.
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(500);

/// What to generate.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub text: String,
    pub service: ProviderKind,
    pub voice_id: String,
    /// Ignored by providers without tuning.
    pub tuning: ElevenLabsTuning,
}

impl GenerationRequest {
    pub fn new(text: impl Into<String>, service: ProviderKind, voice_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            service,
            voice_id: voice_id.into(),
            tuning: ElevenLabsTuning::default(),
        }
    }

    /// Request for `text` using the selected provider, voice and tuning.
    pub fn from_settings(text: impl Into<String>, settings: &Settings) -> Self {
        Self {
            text: text.into(),
            service: settings.service,
            voice_id: settings.voice_id.clone(),
            tuning: settings.tuning(),
        }
    }

    pub fn with_tuning(mut self, tuning: ElevenLabsTuning) -> Self {
        self.tuning = tuning;
        self
    }
}

/// Run parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    /// Maximum characters per provider request.
    pub chunk_limit: usize,
    pub request_delay: Duration,
    /// Requests per key per day for ledger-dispatched providers.
    pub daily_limit: u32,
    pub voices_cache_ttl: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            chunk_limit: DEFAULT_CHUNK_LIMIT,
            request_delay: DEFAULT_REQUEST_DELAY,
            daily_limit: DEFAULT_DAILY_LIMIT,
            voices_cache_ttl: DEFAULT_VOICES_CACHE_TTL,
        }
    }
}
