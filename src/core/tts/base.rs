use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::core::audio::PcmFormat;

/// Default per-request timeout for provider calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Message fragments that mark a failure as quota exhaustion.
const QUOTA_MARKERS: [&str; 3] = ["quota", "limit", "insufficient"];

/// Supported speech providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProviderKind {
    #[default]
    ElevenLabs,
    Gemini,
}

/// How credentials are handed out for a provider during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Try credentials in order, moving on when one reports a quota failure.
    CredentialFailover,
    /// Take one credential per request from the daily usage ledger.
    DailyLedger,
}

impl ProviderKind {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ElevenLabs => "ElevenLabs",
            Self::Gemini => "Gemini",
        }
    }

    pub fn dispatch_mode(&self) -> DispatchMode {
        match self {
            Self::ElevenLabs => DispatchMode::CredentialFailover,
            Self::Gemini => DispatchMode::DailyLedger,
        }
    }

    pub fn all() -> &'static [ProviderKind] {
        &[Self::ElevenLabs, Self::Gemini]
    }

    /// Parse a provider name, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "elevenlabs" | "eleven-labs" | "eleven_labs" => Some(Self::ElevenLabs),
            "gemini" | "google-gemini" => Some(Self::Gemini),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A selectable voice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub id: String,
    pub name: String,
}

impl Voice {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// ElevenLabs model and voice tuning. Ignored by providers without tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElevenLabsTuning {
    pub model_id: String,
    pub stability: f32,
    pub similarity_boost: f32,
}

impl Default for ElevenLabsTuning {
    fn default() -> Self {
        Self {
            model_id: "eleven_multilingual_v2".to_string(),
            stability: 0.5,
            similarity_boost: 0.75,
        }
    }
}

/// One synthesis call: a single chunk of text.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice_id: String,
    pub tuning: ElevenLabsTuning,
}

/// Audio returned by a provider for one chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioPayload {
    /// Self-describing encoded audio (e.g. MP3) that concatenates byte-wise.
    Container {
        data: Bytes,
        mime_type: &'static str,
    },
    /// Headerless PCM samples.
    RawPcm { data: Bytes, format: PcmFormat },
}

impl AudioPayload {
    pub fn data(&self) -> &Bytes {
        match self {
            Self::Container { data, .. } | Self::RawPcm { data, .. } => data,
        }
    }

    pub fn len(&self) -> usize {
        self.data().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data().is_empty()
    }
}

/// Account subscription snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub character_count: u64,
    pub character_limit: u64,
    pub status: String,
}

impl AccountInfo {
    pub fn characters_remaining(&self) -> u64 {
        self.character_limit.saturating_sub(self.character_count)
    }
}

/// Failure category of a provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Credential rejected. Never retried with another credential.
    Auth,
    /// Credential out of quota or rate limited.
    Quota,
    /// Anything else: network failures, bad responses, server errors.
    Transient,
}

/// Error from a provider call.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
    /// HTTP status, when the failure came from a response.
    pub status: Option<u16>,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Auth, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Transient, message)
    }

    /// Categorize a failure from its message and optional HTTP status.
    ///
    /// Quota markers in the message or HTTP 429 win over everything else, so a
    /// 401 whose body talks about an exceeded quota is still a quota failure.
    pub fn classify(message: impl Into<String>, status: Option<u16>) -> Self {
        let message = message.into();
        let lowered = message.to_lowercase();
        let kind = if status == Some(429) || QUOTA_MARKERS.iter().any(|m| lowered.contains(m)) {
            ProviderErrorKind::Quota
        } else if matches!(status, Some(401) | Some(403)) {
            ProviderErrorKind::Auth
        } else {
            ProviderErrorKind::Transient
        };
        Self {
            kind,
            message,
            status,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is_quota(&self) -> bool {
        self.kind == ProviderErrorKind::Quota
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        let status = e.status().map(|s| s.as_u16());
        Self {
            kind: ProviderErrorKind::Transient,
            message: format!("Request failed: {e}"),
            status,
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Capability every speech provider implements.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn dispatch_mode(&self) -> DispatchMode {
        self.kind().dispatch_mode()
    }

    /// Voices available to `credential`. A rejected credential yields an empty list.
    async fn list_voices(&self, credential: &str) -> ProviderResult<Vec<Voice>>;

    /// Synthesize one chunk of text.
    async fn synthesize(
        &self,
        credential: &str,
        request: &SynthesisRequest,
    ) -> ProviderResult<AudioPayload>;

    /// Account subscription snapshot, when the provider exposes one.
    async fn account_info(&self, _credential: &str) -> ProviderResult<Option<AccountInfo>> {
        Ok(None)
    }
}

pub type BoxedSpeechProvider = Arc<dyn SpeechProvider>;

/// Build the shared HTTP client used by providers.
pub(crate) fn build_http_client(timeout: Duration) -> ProviderResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::transient(format!("Failed to build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_quota_markers() {
        let e = ProviderError::classify("You have exceeded your QUOTA", Some(401));
        assert_eq!(e.kind, ProviderErrorKind::Quota);

        let e = ProviderError::classify("Rate limit hit", None);
        assert!(e.is_quota());

        let e = ProviderError::classify("Too many requests", Some(429));
        assert!(e.is_quota());
    }

    #[test]
    fn test_classify_auth_and_transient() {
        let e = ProviderError::classify("Unauthorized", Some(401));
        assert_eq!(e.kind, ProviderErrorKind::Auth);

        let e = ProviderError::classify("Internal server error", Some(500));
        assert_eq!(e.kind, ProviderErrorKind::Transient);
        assert_eq!(e.status, Some(500));
        assert_eq!(e.to_string(), "Internal server error");
    }

    #[test]
    fn test_provider_kind_modes() {
        assert_eq!(
            ProviderKind::ElevenLabs.dispatch_mode(),
            DispatchMode::CredentialFailover
        );
        assert_eq!(ProviderKind::Gemini.dispatch_mode(), DispatchMode::DailyLedger);
        assert_eq!(ProviderKind::parse("GEMINI"), Some(ProviderKind::Gemini));
        assert_eq!(ProviderKind::parse("azure"), None);
        assert_eq!(ProviderKind::default(), ProviderKind::ElevenLabs);
    }

    #[test]
    fn test_provider_kind_serializes_as_display_name() {
        assert_eq!(
            serde_json::to_string(&ProviderKind::ElevenLabs).unwrap(),
            "\"ElevenLabs\""
        );
        assert_eq!(ProviderKind::Gemini.to_string(), "Gemini");
    }

    #[test]
    fn test_account_remaining() {
        let info = AccountInfo {
            character_count: 900,
            character_limit: 1000,
            status: "active".to_string(),
        };
        assert_eq!(info.characters_remaining(), 100);
    }
}
