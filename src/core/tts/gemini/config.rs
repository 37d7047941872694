//! Configuration types for the Gemini speech generation API.

use std::time::Duration;

use crate::core::tts::base::{DEFAULT_REQUEST_TIMEOUT, Voice};

/// Default Generative Language API base URL.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default text-to-speech model.
pub const GEMINI_TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";

/// Prebuilt voices offered for selection.
pub const GEMINI_VOICES: [&str; 6] = ["Kore", "Zephyr", "Nova", "Echo", "Luna", "Aura"];

/// Harm categories relaxed to `BLOCK_NONE` on every request.
pub const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Debug, Clone, PartialEq)]
pub struct GeminiConfig {
    /// API base URL without trailing slash
    pub base_url: String,
    pub model: String,
    pub request_timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: GEMINI_BASE_URL.to_string(),
            model: GEMINI_TTS_MODEL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl GeminiConfig {
    pub fn generate_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

/// The static voice list.
pub fn gemini_voices() -> Vec<Voice> {
    GEMINI_VOICES.iter().map(|v| Voice::new(*v, *v)).collect()
}
