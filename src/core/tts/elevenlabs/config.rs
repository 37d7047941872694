//! Configuration types for the ElevenLabs API.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::tts::base::{DEFAULT_REQUEST_TIMEOUT, ProviderError, ProviderResult};

/// Default ElevenLabs REST API base URL.
pub const ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io/v1";

// =============================================================================
// ElevenLabs Models
// =============================================================================

/// Synthesis models offered for selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ElevenLabsModel {
    /// Multilingual v2, highest quality
    #[default]
    #[serde(rename = "eleven_multilingual_v2")]
    MultilingualV2,
    /// English-only v1
    #[serde(rename = "eleven_monolingual_v1")]
    MonolingualV1,
    /// Turbo v2, lowest latency
    #[serde(rename = "eleven_turbo_v2")]
    TurboV2,
}

impl ElevenLabsModel {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MultilingualV2 => "eleven_multilingual_v2",
            Self::MonolingualV1 => "eleven_monolingual_v1",
            Self::TurboV2 => "eleven_turbo_v2",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::MultilingualV2 => "Multilingual v2",
            Self::MonolingualV1 => "English v1",
            Self::TurboV2 => "Turbo v2",
        }
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "eleven_multilingual_v2" => Self::MultilingualV2,
            "eleven_monolingual_v1" => Self::MonolingualV1,
            "eleven_turbo_v2" => Self::TurboV2,
            _ => Self::default(),
        }
    }

    pub fn all() -> &'static [ElevenLabsModel] {
        &[Self::MultilingualV2, Self::MonolingualV1, Self::TurboV2]
    }
}

impl std::fmt::Display for ElevenLabsModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Client Configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ElevenLabsConfig {
    /// API base URL without trailing slash
    pub base_url: String,
    pub request_timeout: Duration,
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            base_url: ELEVENLABS_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ElevenLabsConfig {
    pub fn voices_url(&self) -> String {
        format!("{}/voices", self.base_url)
    }

    /// Synthesis endpoint, with `voice_id` percent-encoded as a single path segment.
    pub fn speech_url(&self, voice_id: &str) -> ProviderResult<Url> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            ProviderError::transient(format!("Invalid ElevenLabs base URL: {e}"))
        })?;
        url.path_segments_mut()
            .map_err(|_| ProviderError::transient("ElevenLabs base URL cannot take a path"))?
            .pop_if_empty()
            .extend(["text-to-speech", voice_id]);
        Ok(url)
    }

    pub fn user_url(&self) -> String {
        format!("{}/user", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_parsing() {
        assert_eq!(
            ElevenLabsModel::from_str_or_default("eleven_turbo_v2"),
            ElevenLabsModel::TurboV2
        );
        assert_eq!(
            ElevenLabsModel::from_str_or_default("ELEVEN_MONOLINGUAL_V1"),
            ElevenLabsModel::MonolingualV1
        );
        // Unknown defaults to multilingual v2
        assert_eq!(
            ElevenLabsModel::from_str_or_default("unknown"),
            ElevenLabsModel::MultilingualV2
        );
        assert_eq!(ElevenLabsModel::all().len(), 3);
    }

    #[test]
    fn test_endpoint_urls() {
        let config = ElevenLabsConfig {
            base_url: "http://127.0.0.1:9000".to_string(),
            ..Default::default()
        };
        assert_eq!(config.voices_url(), "http://127.0.0.1:9000/voices");
        assert_eq!(
            config.speech_url("abc").unwrap().as_str(),
            "http://127.0.0.1:9000/text-to-speech/abc"
        );
        assert_eq!(config.user_url(), "http://127.0.0.1:9000/user");

        let default = ElevenLabsConfig::default();
        assert_eq!(
            default.speech_url("21m00").unwrap().as_str(),
            "https://api.elevenlabs.io/v1/text-to-speech/21m00"
        );
    }

    #[test]
    fn test_speech_url_encodes_voice_id() {
        let config = ElevenLabsConfig {
            base_url: "http://127.0.0.1:9000".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.speech_url("voice/x y?").unwrap().as_str(),
            "http://127.0.0.1:9000/text-to-speech/voice%2Fx%20y%3F"
        );
    }

    #[test]
    fn test_speech_url_rejects_bad_base() {
        let config = ElevenLabsConfig {
            base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(config.speech_url("abc").is_err());
    }
}
