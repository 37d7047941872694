use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use super::yaml::{ProviderYaml, YamlConfig};
use super::{ConfigError, StudioConfig};
use crate::core::chunker::DEFAULT_CHUNK_LIMIT;
use crate::core::ledger::DEFAULT_DAILY_LIMIT;
use crate::core::tts::{ELEVENLABS_BASE_URL, GEMINI_BASE_URL, GEMINI_TTS_MODEL};

pub(super) const DEFAULT_DATA_DIR: &str = "./data";
pub(super) const DEFAULT_REQUEST_DELAY_MS: u64 = 500;
pub(super) const DEFAULT_VOICES_CACHE_TTL_SECONDS: u64 = 24 * 60 * 60;
pub(super) const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 120;

/// Parse a numeric environment variable, `None` when unset.
fn env_number<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { name, value }),
        Err(_) => Ok(None),
    }
}

/// Comma-separated credential list from the environment.
fn env_list(name: &str) -> Option<Vec<String>> {
    env::var(name).ok().map(|value| {
        value
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

/// Merge YAML configuration with environment variables
///
/// Priority order (highest to lowest):
/// 1. YAML configuration values
/// 2. Environment variables
/// 3. Default values
pub fn merge_config(yaml_config: Option<YamlConfig>) -> Result<StudioConfig, ConfigError> {
    let yaml = yaml_config.unwrap_or_default();

    // Helper macro to get value with priority: YAML > ENV > Default
    macro_rules! get_value {
        ($env_var:expr, $yaml_value:expr, $default:expr) => {
            $yaml_value
                .or_else(|| env::var($env_var).ok())
                .unwrap_or_else(|| $default.to_string())
        };
    }

    // Same, for numeric values
    macro_rules! get_number {
        ($env_var:expr, $yaml_value:expr, $default:expr) => {
            match $yaml_value {
                Some(v) => v,
                None => env_number($env_var)?.unwrap_or($default),
            }
        };
    }

    let generation = yaml.generation.unwrap_or_default();
    let providers = yaml.providers.unwrap_or_default();
    let elevenlabs: ProviderYaml = providers.elevenlabs.unwrap_or_default();
    let gemini: ProviderYaml = providers.gemini.unwrap_or_default();

    let data_dir = PathBuf::from(get_value!(
        "STUDIO_DATA_DIR",
        yaml.storage.and_then(|s| s.data_dir),
        DEFAULT_DATA_DIR
    ));

    let chunk_limit = get_number!(
        "STUDIO_CHUNK_LIMIT",
        generation.chunk_limit,
        DEFAULT_CHUNK_LIMIT
    );
    let request_delay_ms = get_number!(
        "STUDIO_REQUEST_DELAY_MS",
        generation.request_delay_ms,
        DEFAULT_REQUEST_DELAY_MS
    );
    let gemini_daily_limit = get_number!(
        "GEMINI_DAILY_LIMIT",
        generation.gemini_daily_limit,
        DEFAULT_DAILY_LIMIT
    );
    let request_timeout_seconds = get_number!(
        "STUDIO_REQUEST_TIMEOUT_SECONDS",
        generation.request_timeout_seconds,
        DEFAULT_REQUEST_TIMEOUT_SECONDS
    );
    let voices_cache_ttl_seconds = get_number!(
        "VOICES_CACHE_TTL_SECONDS",
        yaml.voices.and_then(|v| v.cache_ttl_seconds),
        DEFAULT_VOICES_CACHE_TTL_SECONDS
    );

    let elevenlabs_base_url = get_value!(
        "ELEVENLABS_BASE_URL",
        elevenlabs.base_url,
        ELEVENLABS_BASE_URL
    );
    let gemini_base_url = get_value!("GEMINI_BASE_URL", gemini.base_url, GEMINI_BASE_URL);
    let gemini_model = get_value!("GEMINI_TTS_MODEL", gemini.model, GEMINI_TTS_MODEL);

    let elevenlabs_api_keys = elevenlabs
        .api_keys
        .or_else(|| env_list("ELEVENLABS_API_KEYS"))
        .unwrap_or_default();
    let gemini_api_keys = gemini
        .api_keys
        .or_else(|| env_list("GEMINI_API_KEYS"))
        .unwrap_or_default();

    Ok(StudioConfig {
        data_dir,
        chunk_limit,
        request_delay_ms,
        gemini_daily_limit,
        voices_cache_ttl_seconds,
        request_timeout_seconds,
        elevenlabs_base_url,
        gemini_base_url,
        gemini_model,
        elevenlabs_api_keys,
        gemini_api_keys,
    })
}
