//! Configuration module for the generation engine
//!
//! Configuration comes from a YAML file, environment variables (after `.env` is
//! loaded with dotenvy) and defaults. Priority: YAML > ENV vars > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use waav_studio::config::StudioConfig;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = StudioConfig::from_env()?;
//!
//! // Load from YAML file with environment variable fallbacks
//! let config = StudioConfig::from_file(Path::new("studio.yaml"))?;
//!
//! println!("Artifacts stored in {}", config.artifacts_dir().display());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

mod merge;
mod validation;
mod yaml;

pub use yaml::YamlConfig;

use crate::core::generator::GeneratorConfig;
use crate::core::preferences::ApiKeys;
use crate::core::tts::{ElevenLabsConfig, GeminiConfig, ProviderEndpoints};
use crate::utils::{UrlValidationError, mask_credential};

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid {name} environment variable: {value:?}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("Invalid {field}: {source}")]
    InvalidUrl {
        field: &'static str,
        #[source]
        source: UrlValidationError,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Engine configuration
///
/// Contains storage location, chunking and pacing parameters, provider
/// endpoints and the credentials used to seed the credential store.
#[derive(Clone, PartialEq)]
pub struct StudioConfig {
    /// Root directory for persisted state and artifacts
    pub data_dir: PathBuf,
    /// Maximum characters per provider request
    pub chunk_limit: usize,
    /// Pause between consecutive chunk requests
    pub request_delay_ms: u64,
    /// Requests per Gemini key per UTC day
    pub gemini_daily_limit: u32,
    pub voices_cache_ttl_seconds: u64,
    pub request_timeout_seconds: u64,

    // Provider endpoints
    pub elevenlabs_base_url: String,
    pub gemini_base_url: String,
    pub gemini_model: String,

    // Provider credentials, in failover order
    pub elevenlabs_api_keys: Vec<String>,
    pub gemini_api_keys: Vec<String>,
}

impl fmt::Debug for StudioConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |keys: &[String]| keys.iter().map(|k| mask_credential(k)).collect::<Vec<_>>();
        f.debug_struct("StudioConfig")
            .field("data_dir", &self.data_dir)
            .field("chunk_limit", &self.chunk_limit)
            .field("request_delay_ms", &self.request_delay_ms)
            .field("gemini_daily_limit", &self.gemini_daily_limit)
            .field("voices_cache_ttl_seconds", &self.voices_cache_ttl_seconds)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .field("elevenlabs_base_url", &self.elevenlabs_base_url)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("gemini_model", &self.gemini_model)
            .field("elevenlabs_api_keys", &mask(&self.elevenlabs_api_keys))
            .field("gemini_api_keys", &mask(&self.gemini_api_keys))
            .finish()
    }
}

/// Zeroize all credentials when the configuration is dropped.
impl Drop for StudioConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        self.elevenlabs_api_keys.zeroize();
        self.gemini_api_keys.zeroize();
    }
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(merge::DEFAULT_DATA_DIR),
            chunk_limit: crate::core::chunker::DEFAULT_CHUNK_LIMIT,
            request_delay_ms: merge::DEFAULT_REQUEST_DELAY_MS,
            gemini_daily_limit: crate::core::ledger::DEFAULT_DAILY_LIMIT,
            voices_cache_ttl_seconds: merge::DEFAULT_VOICES_CACHE_TTL_SECONDS,
            request_timeout_seconds: merge::DEFAULT_REQUEST_TIMEOUT_SECONDS,
            elevenlabs_base_url: crate::core::tts::ELEVENLABS_BASE_URL.to_string(),
            gemini_base_url: crate::core::tts::GEMINI_BASE_URL.to_string(),
            gemini_model: crate::core::tts::GEMINI_TTS_MODEL.to_string(),
            elevenlabs_api_keys: Vec::new(),
            gemini_api_keys: Vec::new(),
        }
    }
}

impl StudioConfig {
    /// Load configuration from environment variables
    ///
    /// Loads `.env` first if present, then reads environment variables with
    /// defaults for anything unset.
    ///
    /// # Errors
    /// Returns an error if a numeric variable does not parse or validation fails.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let mut config = merge::merge_config(None)?;
        validation::validate_config(&mut config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, an environment
    /// variable is malformed, or validation fails.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let yaml_config = YamlConfig::from_file(path)?;
        let mut config = merge::merge_config(Some(yaml_config))?;
        validation::validate_config(&mut config)?;
        Ok(config)
    }

    /// Re-run validation, e.g. after editing fields by hand.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        validation::validate_config(self)
    }

    /// Directory holding small JSON state documents
    pub fn state_dir(&self) -> PathBuf {
        self.data_dir.join("state")
    }

    /// Directory holding generated artifacts
    pub fn artifacts_dir(&self) -> PathBuf {
        self.data_dir.join("artifacts")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            chunk_limit: self.chunk_limit,
            request_delay: Duration::from_millis(self.request_delay_ms),
            daily_limit: self.gemini_daily_limit,
            voices_cache_ttl: Duration::from_secs(self.voices_cache_ttl_seconds),
        }
    }

    pub fn provider_endpoints(&self) -> ProviderEndpoints {
        ProviderEndpoints {
            elevenlabs: ElevenLabsConfig {
                base_url: self.elevenlabs_base_url.clone(),
                request_timeout: self.request_timeout(),
            },
            gemini: GeminiConfig {
                base_url: self.gemini_base_url.clone(),
                model: self.gemini_model.clone(),
                request_timeout: self.request_timeout(),
            },
        }
    }

    /// Configured credentials, used to seed an empty credential store.
    pub fn seed_api_keys(&self) -> ApiKeys {
        ApiKeys::new(
            self.elevenlabs_api_keys.clone(),
            self.gemini_api_keys.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::fs;
    use tempfile::TempDir;

    // Helper to clean up environment variables
    fn cleanup_env_vars() {
        unsafe {
            env::remove_var("STUDIO_DATA_DIR");
            env::remove_var("STUDIO_CHUNK_LIMIT");
            env::remove_var("STUDIO_REQUEST_DELAY_MS");
            env::remove_var("GEMINI_DAILY_LIMIT");
            env::remove_var("VOICES_CACHE_TTL_SECONDS");
            env::remove_var("STUDIO_REQUEST_TIMEOUT_SECONDS");
            env::remove_var("ELEVENLABS_BASE_URL");
            env::remove_var("GEMINI_BASE_URL");
            env::remove_var("GEMINI_TTS_MODEL");
            env::remove_var("ELEVENLABS_API_KEYS");
            env::remove_var("GEMINI_API_KEYS");
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        cleanup_env_vars();

        let config = StudioConfig::from_env().unwrap();
        assert_eq!(config, StudioConfig::default());
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.chunk_limit, 9000);
        assert_eq!(config.request_delay_ms, 500);
        assert_eq!(config.gemini_daily_limit, 15);
        assert_eq!(config.voices_cache_ttl_seconds, 86_400);
        assert_eq!(config.elevenlabs_base_url, "https://api.elevenlabs.io/v1");
        assert!(config.elevenlabs_api_keys.is_empty());

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_values() {
        cleanup_env_vars();
        unsafe {
            env::set_var("STUDIO_CHUNK_LIMIT", "1200");
            env::set_var("GEMINI_DAILY_LIMIT", "40");
            env::set_var("ELEVENLABS_API_KEYS", " a , b,,c ");
            env::set_var("GEMINI_BASE_URL", "http://127.0.0.1:8089/v1beta/");
        }

        let config = StudioConfig::from_env().unwrap();
        assert_eq!(config.chunk_limit, 1200);
        assert_eq!(config.gemini_daily_limit, 40);
        assert_eq!(config.elevenlabs_api_keys, vec!["a", "b", "c"]);
        assert_eq!(config.gemini_base_url, "http://127.0.0.1:8089/v1beta");

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_number() {
        cleanup_env_vars();
        unsafe {
            env::set_var("STUDIO_CHUNK_LIMIT", "lots");
        }

        let err = StudioConfig::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnv {
                name: "STUDIO_CHUNK_LIMIT",
                ..
            }
        ));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_zero_limits_rejected() {
        cleanup_env_vars();
        unsafe {
            env::set_var("STUDIO_CHUNK_LIMIT", "0");
        }
        assert!(matches!(
            StudioConfig::from_env(),
            Err(ConfigError::Invalid(_))
        ));

        cleanup_env_vars();
        unsafe {
            env::set_var("GEMINI_DAILY_LIMIT", "0");
        }
        assert!(matches!(
            StudioConfig::from_env(),
            Err(ConfigError::Invalid(_))
        ));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_insecure_base_url_rejected() {
        cleanup_env_vars();
        unsafe {
            env::set_var("ELEVENLABS_BASE_URL", "http://api.elevenlabs.io/v1");
        }

        let err = StudioConfig::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidUrl {
                field: "elevenlabs_base_url",
                ..
            }
        ));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_yaml_overrides_env() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let yaml_content = r#"
storage:
  data_dir: "/tmp/yaml-studio"

generation:
  chunk_limit: 3000

providers:
  gemini:
    api_keys: ["yaml-key"]
"#;

        fs::write(&config_path, yaml_content).unwrap();

        unsafe {
            env::set_var("STUDIO_CHUNK_LIMIT", "100");
            env::set_var("STUDIO_REQUEST_DELAY_MS", "50");
            env::set_var("GEMINI_API_KEYS", "env-key");
        }

        let config = StudioConfig::from_file(&config_path).unwrap();

        // YAML overrides ENV
        assert_eq!(config.data_dir, PathBuf::from("/tmp/yaml-studio"));
        assert_eq!(config.chunk_limit, 3000);
        assert_eq!(config.gemini_api_keys, vec!["yaml-key"]);
        // ENV fills what YAML leaves out
        assert_eq!(config.request_delay_ms, 50);

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_missing_file() {
        cleanup_env_vars();

        let result = StudioConfig::from_file(Path::new("/nonexistent/studio.yaml"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_derived_settings() {
        let mut config = StudioConfig::default();
        config.data_dir = PathBuf::from("/srv/studio");
        config.request_delay_ms = 0;
        config.request_timeout_seconds = 5;
        config.gemini_api_keys = vec!["g".to_string()];

        assert_eq!(config.state_dir(), PathBuf::from("/srv/studio/state"));
        assert_eq!(config.artifacts_dir(), PathBuf::from("/srv/studio/artifacts"));
        assert!(config.generator_config().request_delay.is_zero());

        let endpoints = config.provider_endpoints();
        assert_eq!(endpoints.gemini.request_timeout, Duration::from_secs(5));
        assert_eq!(endpoints.gemini.model, "gemini-2.5-flash-preview-tts");
        assert_eq!(config.seed_api_keys().gemini, vec!["g"]);
    }

    #[test]
    fn test_debug_masks_keys() {
        let mut config = StudioConfig::default();
        config.elevenlabs_api_keys = vec!["sk-very-secret-9876".to_string()];
        let rendered = format!("{config:?}");
        assert!(rendered.contains("...9876"));
        assert!(!rendered.contains("very-secret"));
    }
}
