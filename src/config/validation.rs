use super::{ConfigError, StudioConfig};
use crate::utils::validate_provider_base_url;

/// Validate a merged configuration, normalizing base URLs in place.
pub fn validate_config(config: &mut StudioConfig) -> Result<(), ConfigError> {
    if config.chunk_limit == 0 {
        return Err(ConfigError::Invalid(
            "chunk_limit must be greater than zero".to_string(),
        ));
    }
    if config.gemini_daily_limit == 0 {
        return Err(ConfigError::Invalid(
            "gemini_daily_limit must be greater than zero".to_string(),
        ));
    }
    if config.gemini_model.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "gemini_model must not be empty".to_string(),
        ));
    }

    config.elevenlabs_base_url = validate_provider_base_url(&config.elevenlabs_base_url)
        .map_err(|source| ConfigError::InvalidUrl {
            field: "elevenlabs_base_url",
            source,
        })?;
    config.gemini_base_url =
        validate_provider_base_url(&config.gemini_base_url).map_err(|source| {
            ConfigError::InvalidUrl {
                field: "gemini_base_url",
                source,
            }
        })?;

    Ok(())
}
