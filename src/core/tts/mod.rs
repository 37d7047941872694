mod base;
pub mod elevenlabs;
pub mod gemini;

pub use base::{
    AccountInfo, AudioPayload, BoxedSpeechProvider, DEFAULT_REQUEST_TIMEOUT, DispatchMode,
    ElevenLabsTuning, ProviderError, ProviderErrorKind, ProviderKind, ProviderResult,
    SpeechProvider, SynthesisRequest, Voice,
};
pub use elevenlabs::{ELEVENLABS_BASE_URL, ElevenLabsConfig, ElevenLabsModel, ElevenLabsProvider};
pub use gemini::{GEMINI_BASE_URL, GEMINI_PCM_FORMAT, GEMINI_TTS_MODEL, GeminiConfig, GeminiProvider};

use std::sync::Arc;

/// Endpoint settings for every provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderEndpoints {
    pub elevenlabs: ElevenLabsConfig,
    pub gemini: GeminiConfig,
}

/// Factory function to create a speech provider.
///
/// # Example
///
/// ```rust
/// use waav_studio::core::tts::{
///     ProviderEndpoints, ProviderKind, SpeechProvider, create_speech_provider,
/// };
///
/// let provider = create_speech_provider(ProviderKind::Gemini, &ProviderEndpoints::default()).unwrap();
/// assert_eq!(provider.kind(), ProviderKind::Gemini);
/// ```
pub fn create_speech_provider(
    kind: ProviderKind,
    endpoints: &ProviderEndpoints,
) -> ProviderResult<BoxedSpeechProvider> {
    match kind {
        ProviderKind::ElevenLabs => Ok(Arc::new(ElevenLabsProvider::new(
            endpoints.elevenlabs.clone(),
        )?)),
        ProviderKind::Gemini => Ok(Arc::new(GeminiProvider::new(endpoints.gemini.clone())?)),
    }
}

/// Names of all supported providers.
pub fn get_supported_speech_providers() -> Vec<&'static str> {
    ProviderKind::all().iter().map(|k| k.as_str()).collect()
}
