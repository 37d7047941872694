use serde::Deserialize;
use std::path::Path;

use super::ConfigError;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present here
/// take priority over environment variables.
///
/// # Example YAML structure
/// ```yaml
/// storage:
///   data_dir: "/var/lib/waav-studio"
///
/// generation:
///   chunk_limit: 9000
///   request_delay_ms: 500
///   gemini_daily_limit: 15
///   request_timeout_seconds: 120
///
/// voices:
///   cache_ttl_seconds: 86400
///
/// providers:
///   elevenlabs:
///     base_url: "https://api.elevenlabs.io/v1"
///     api_keys:
///       - "el-key-1"
///       - "el-key-2"
///   gemini:
///     base_url: "https://generativelanguage.googleapis.com/v1beta"
///     model: "gemini-2.5-flash-preview-tts"
///     api_keys:
///       - "gm-key-1"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub storage: Option<StorageYaml>,
    pub generation: Option<GenerationYaml>,
    pub voices: Option<VoicesYaml>,
    pub providers: Option<ProvidersYaml>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct StorageYaml {
    pub data_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GenerationYaml {
    pub chunk_limit: Option<usize>,
    pub request_delay_ms: Option<u64>,
    pub gemini_daily_limit: Option<u32>,
    pub request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct VoicesYaml {
    pub cache_ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProvidersYaml {
    pub elevenlabs: Option<ProviderYaml>,
    pub gemini: Option<ProviderYaml>,
}

/// Per-provider endpoint and credentials
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProviderYaml {
    pub base_url: Option<String>,
    /// Only used by Gemini
    pub model: Option<String>,
    pub api_keys: Option<Vec<String>>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the YAML is malformed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: YamlConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }
}
