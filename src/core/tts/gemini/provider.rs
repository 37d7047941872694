//! Gemini provider implementation.
//!
//! # API Reference
//!
//! - Endpoint: `POST {base}/models/{model}:generateContent`
//! - Auth: `x-goog-api-key` header
//! - Output: base64 raw 16-bit PCM, 24 kHz mono, in
//!   `candidates[0].content.parts[0].inlineData.data`

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, error};

use super::config::{GeminiConfig, SAFETY_CATEGORIES, gemini_voices};
use crate::core::audio::PcmFormat;
use crate::core::tts::base::{
    AudioPayload, ProviderError, ProviderKind, ProviderResult, SpeechProvider, SynthesisRequest,
    Voice, build_http_client,
};

const API_KEY_HEADER: &str = "x-goog-api-key";
const INVALID_KEY_MESSAGE: &str = "Your Gemini API key is not valid. Please check it in Settings.";
const INVALID_KEY_MARKERS: [&str; 2] = ["API key not valid", "API_KEY_INVALID"];

/// Output format of the speech model.
pub const GEMINI_PCM_FORMAT: PcmFormat = PcmFormat::MONO_16BIT_24KHZ;

// =============================================================================
// Response Types
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
    #[serde(default)]
    safety_ratings: Value,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
}

impl GenerateContentResponse {
    fn audio_data(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .inline_data
            .as_ref()
            .map(|d| d.data.as_str())
            .filter(|d| !d.is_empty())
    }
}

fn request_body(request: &SynthesisRequest) -> Value {
    let safety: Vec<Value> = SAFETY_CATEGORIES
        .iter()
        .map(|category| json!({ "category": category, "threshold": "BLOCK_NONE" }))
        .collect();

    json!({
        "contents": [{ "parts": [{ "text": request.text }] }],
        "generationConfig": {
            "responseModalities": ["AUDIO"],
            "speechConfig": {
                "voiceConfig": {
                    "prebuiltVoiceConfig": { "voiceName": request.voice_id }
                }
            }
        },
        "safetySettings": safety,
    })
}

/// Turn an error response into a provider error.
fn api_error(status: u16, body: &str) -> ProviderError {
    if INVALID_KEY_MARKERS.iter().any(|m| body.contains(m)) {
        return ProviderError::auth(INVALID_KEY_MESSAGE).with_status(status);
    }

    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            if body.is_empty() {
                "An unknown error occurred.".to_string()
            } else {
                body.to_string()
            }
        });

    ProviderError::classify(format!("Gemini API Error: {message}"), Some(status))
}

// =============================================================================
// Gemini Provider
// =============================================================================

pub struct GeminiProvider {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig) -> ProviderResult<Self> {
        Ok(Self {
            client: build_http_client(config.request_timeout)?,
            config,
        })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }
}

#[async_trait]
impl SpeechProvider for GeminiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn list_voices(&self, _credential: &str) -> ProviderResult<Vec<Voice>> {
        Ok(gemini_voices())
    }

    async fn synthesize(
        &self,
        credential: &str,
        request: &SynthesisRequest,
    ) -> ProviderResult<AudioPayload> {
        if credential.is_empty() {
            return Err(ProviderError::transient("Gemini API key is missing."));
        }

        debug!(
            text_len = request.text.len(),
            voice = %request.voice_id,
            model = %self.config.model,
            "Gemini synthesis request"
        );

        let response = self
            .client
            .post(self.config.generate_url())
            .header(API_KEY_HEADER, credential)
            .header("Content-Type", "application/json")
            .json(&request_body(request))
            .send()
            .await
            .map_err(|e| ProviderError::transient(format!("Gemini API Error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), &body));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::transient(format!("Gemini API Error: {e}")))?;

        let Some(encoded) = parsed.audio_data() else {
            let candidate = parsed.candidates.first();
            let reason = candidate
                .and_then(|c| c.finish_reason.as_deref())
                .unwrap_or("undefined");
            error!(
                finish_reason = reason,
                safety_ratings = %candidate.map(|c| c.safety_ratings.to_string()).unwrap_or_default(),
                "Gemini response carried no audio"
            );
            return Err(ProviderError::transient(format!(
                "Gemini Error: No audio data received. Reason: {reason}."
            )));
        };

        let data = BASE64
            .decode(encoded)
            .map_err(|e| ProviderError::transient(format!("Gemini API Error: {e}")))?;

        debug!(audio_bytes = data.len(), "Gemini synthesis complete");

        Ok(AudioPayload::RawPcm {
            data: Bytes::from(data),
            format: GEMINI_PCM_FORMAT,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tts::base::ProviderErrorKind;

    fn request() -> SynthesisRequest {
        SynthesisRequest {
            text: "Hello".to_string(),
            voice_id: "Kore".to_string(),
            tuning: Default::default(),
        }
    }

    #[test]
    fn test_request_body_shape() {
        let body = request_body(&request());
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Hello");
        assert_eq!(body["generationConfig"]["responseModalities"][0], "AUDIO");
        assert_eq!(
            body["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]
                ["voiceName"],
            "Kore"
        );
        let safety = body["safetySettings"].as_array().unwrap();
        assert_eq!(safety.len(), 4);
        assert!(safety.iter().all(|s| s["threshold"] == "BLOCK_NONE"));
    }

    #[test]
    fn test_invalid_key_maps_to_auth() {
        let body = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#;
        let e = api_error(400, body);
        assert_eq!(e.kind, ProviderErrorKind::Auth);
        assert_eq!(e.message, INVALID_KEY_MESSAGE);
    }

    #[test]
    fn test_other_errors_are_wrapped() {
        let body = r#"{"error":{"code":500,"message":"Internal error"}}"#;
        let e = api_error(500, body);
        assert_eq!(e.message, "Gemini API Error: Internal error");
        assert_eq!(e.kind, ProviderErrorKind::Transient);

        let body = r#"{"error":{"code":429,"message":"Resource has been exhausted (e.g. check quota)."}}"#;
        assert!(api_error(429, body).is_quota());
    }

    #[test]
    fn test_audio_data_extraction() {
        let parsed: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"inlineData":{"mimeType":"audio/L16","data":"AAEC"}}]}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.audio_data(), Some("AAEC"));

        let blocked: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        assert_eq!(blocked.audio_data(), None);
        assert_eq!(
            blocked.candidates[0].finish_reason.as_deref(),
            Some("SAFETY")
        );
    }

    #[tokio::test]
    async fn test_static_voice_list() {
        let provider = GeminiProvider::new(GeminiConfig::default()).unwrap();
        let voices = provider.list_voices("").await.unwrap();
        assert_eq!(voices.len(), 6);
        assert_eq!(provider.kind(), ProviderKind::Gemini);
        assert!(provider.account_info("key").await.unwrap().is_none());
    }
}
