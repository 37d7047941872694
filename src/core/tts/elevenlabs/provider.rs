//! ElevenLabs provider implementation.
//!
//! # API Reference
//!
//! - Voices: `GET {base}/voices`
//! - Synthesis: `POST {base}/text-to-speech/{voice_id}`, returns MP3
//! - Account: `GET {base}/user`
//!
//! All requests authenticate with the `xi-api-key` header.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::config::ElevenLabsConfig;
use crate::core::tts::base::{
    AccountInfo, AudioPayload, ProviderError, ProviderKind, ProviderResult, SpeechProvider,
    SynthesisRequest, Voice, build_http_client,
};

const API_KEY_HEADER: &str = "xi-api-key";
const AUTH_FALLBACK_MESSAGE: &str = "Invalid ElevenLabs API Key or insufficient permissions.";
const MPEG_MIME: &str = "audio/mpeg";

// =============================================================================
// Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct VoicesResponse {
    #[serde(default)]
    voices: Vec<VoiceEntry>,
}

#[derive(Debug, Deserialize)]
struct VoiceEntry {
    voice_id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    subscription: SubscriptionEntry,
}

#[derive(Debug, Deserialize)]
struct SubscriptionEntry {
    #[serde(default)]
    character_count: u64,
    #[serde(default)]
    character_limit: u64,
    #[serde(default)]
    status: String,
}

/// Pull the human-readable detail out of a 401 body.
///
/// The API sends either `{"detail": "..."}` or `{"detail": {"message": "..."}}`.
fn auth_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let detail = value.get("detail")?;
    if let Some(s) = detail.as_str() {
        return Some(s.to_string());
    }
    detail
        .get("message")
        .and_then(|m| m.as_str())
        .map(str::to_string)
}

fn synthesis_error(status: u16, body: &str) -> ProviderError {
    let message = if status == 401 {
        match auth_detail(body) {
            Some(detail) => format!("ElevenLabs Authorization Error: {detail}"),
            None => AUTH_FALLBACK_MESSAGE.to_string(),
        }
    } else {
        let body = if body.is_empty() {
            "Failed to generate audio."
        } else {
            body
        };
        format!("ElevenLabs API Error: {status} - {body}")
    };
    ProviderError::classify(message, Some(status))
}

// =============================================================================
// ElevenLabs Provider
// =============================================================================

pub struct ElevenLabsProvider {
    client: reqwest::Client,
    config: ElevenLabsConfig,
}

impl ElevenLabsProvider {
    pub fn new(config: ElevenLabsConfig) -> ProviderResult<Self> {
        Ok(Self {
            client: build_http_client(config.request_timeout)?,
            config,
        })
    }

    pub fn config(&self) -> &ElevenLabsConfig {
        &self.config
    }
}

#[async_trait]
impl SpeechProvider for ElevenLabsProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::ElevenLabs
    }

    async fn list_voices(&self, credential: &str) -> ProviderResult<Vec<Voice>> {
        if credential.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .get(self.config.voices_url())
            .header(API_KEY_HEADER, credential)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 401 {
            warn!("Could not fetch ElevenLabs voices, API key might have limited permissions");
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(ProviderError::classify(
                format!("Failed to fetch ElevenLabs voices: {status}"),
                Some(status.as_u16()),
            ));
        }

        let parsed: VoicesResponse = response.json().await.map_err(|e| {
            ProviderError::transient(format!("Failed to parse ElevenLabs voices: {e}"))
        })?;

        debug!(count = parsed.voices.len(), "ElevenLabs voices fetched");
        Ok(parsed
            .voices
            .into_iter()
            .map(|v| Voice::new(v.voice_id, v.name))
            .collect())
    }

    async fn synthesize(
        &self,
        credential: &str,
        request: &SynthesisRequest,
    ) -> ProviderResult<AudioPayload> {
        if credential.is_empty() || request.voice_id.is_empty() {
            return Err(ProviderError::transient(
                "API Key and Voice ID are required for ElevenLabs.",
            ));
        }

        let body = json!({
            "text": request.text,
            "model_id": request.tuning.model_id,
            "voice_settings": {
                "stability": request.tuning.stability,
                "similarity_boost": request.tuning.similarity_boost,
            },
        });

        debug!(
            text_len = request.text.len(),
            voice_id = %request.voice_id,
            model_id = %request.tuning.model_id,
            "ElevenLabs synthesis request"
        );

        let response = self
            .client
            .post(self.config.speech_url(&request.voice_id)?)
            .header(API_KEY_HEADER, credential)
            .header("Content-Type", "application/json")
            .header("Accept", MPEG_MIME)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(synthesis_error(status.as_u16(), &error_text));
        }

        let data: Bytes = response.bytes().await?;
        debug!(audio_bytes = data.len(), "ElevenLabs synthesis complete");

        Ok(AudioPayload::Container {
            data,
            mime_type: MPEG_MIME,
        })
    }

    async fn account_info(&self, credential: &str) -> ProviderResult<Option<AccountInfo>> {
        let response = self
            .client
            .get(self.config.user_url())
            .header(API_KEY_HEADER, credential)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "Could not fetch ElevenLabs user info");
            return Err(ProviderError::classify(
                "Failed to fetch user info from ElevenLabs.",
                Some(status.as_u16()),
            ));
        }

        let user: UserResponse = response.json().await.map_err(|e| {
            ProviderError::transient(format!("Failed to parse ElevenLabs user info: {e}"))
        })?;

        Ok(Some(AccountInfo {
            character_count: user.subscription.character_count,
            character_limit: user.subscription.character_limit,
            status: user.subscription.status,
        }))
    }
}
