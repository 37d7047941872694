//! ElevenLabs provider module.
//!
//! Credential-failover provider: MP3 output that concatenates byte-wise, a
//! voice list per account and a subscription endpoint.
//!
//! # Supported Models
//!
//! - `eleven_multilingual_v2` (default)
//! - `eleven_monolingual_v1`
//! - `eleven_turbo_v2`

mod config;
mod provider;

pub use config::{ELEVENLABS_BASE_URL, ElevenLabsConfig, ElevenLabsModel};
pub use provider::ElevenLabsProvider;
