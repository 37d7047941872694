//! Error types for generation runs

use crate::core::store::StoreError;
use crate::core::tts::{ProviderError, ProviderErrorKind};

/// Error types for generation runs.
///
/// Provider variants carry the provider's message verbatim so it can be shown
/// to the user as-is.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Missing credential, voice or text. Raised before any network I/O.
    #[error("{0}")]
    Configuration(String),
    /// Credential rejected by the provider.
    #[error("{0}")]
    ProviderAuth(String),
    /// Every usable credential is out of quota.
    #[error("{0}")]
    ProviderQuota(String),
    /// Any other provider failure.
    #[error("{0}")]
    ProviderTransient(String),
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl From<ProviderError> for GenerationError {
    fn from(e: ProviderError) -> Self {
        match e.kind {
            ProviderErrorKind::Auth => Self::ProviderAuth(e.message),
            ProviderErrorKind::Quota => Self::ProviderQuota(e.message),
            ProviderErrorKind::Transient => Self::ProviderTransient(e.message),
        }
    }
}

/// Result type for generation operations
pub type GenerationResult<T> = Result<T, GenerationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_mapping() {
        let e: GenerationError = ProviderError::auth("bad key").into();
        assert!(matches!(e, GenerationError::ProviderAuth(ref m) if m == "bad key"));

        let e: GenerationError = ProviderError::classify("quota exceeded", None).into();
        assert!(matches!(e, GenerationError::ProviderQuota(_)));
        assert_eq!(e.to_string(), "quota exceeded");

        let e: GenerationError = ProviderError::transient("timeout").into();
        assert!(matches!(e, GenerationError::ProviderTransient(_)));
    }

    #[test]
    fn test_storage_error_message() {
        let e: GenerationError = StoreError::Backend("disk full".to_string()).into();
        assert_eq!(e.to_string(), "Storage error: Storage backend error: disk full");
    }
}
