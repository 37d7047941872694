//! Gemini speech generation provider module.
//!
//! Daily-ledger provider: each request consumes one unit of a per-key daily
//! allowance and returns raw PCM (24 kHz, 16-bit, mono) that is wrapped in a
//! WAV container once all chunks are collected.

mod config;
mod provider;

pub use config::{
    GEMINI_BASE_URL, GEMINI_TTS_MODEL, GEMINI_VOICES, GeminiConfig, SAFETY_CATEGORIES,
    gemini_voices,
};
pub use provider::{GEMINI_PCM_FORMAT, GeminiProvider};
