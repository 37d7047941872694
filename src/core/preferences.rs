//! Persisted user preferences: provider credential lists and generation settings.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};
use zeroize::Zeroize;

use crate::core::store::{StateStore, StoreResult, load_json, save_json};
use crate::core::tts::{ElevenLabsModel, ElevenLabsTuning, ProviderKind};
use crate::utils::{mask_credential, normalize_credentials};

pub const API_KEYS_STORAGE_KEY: &str = "tts-api-keys";
pub const SETTINGS_STORAGE_KEY: &str = "tts-user-settings";

// =============================================================================
// API Keys
// =============================================================================

/// Ordered credential lists per provider. Order is failover priority.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiKeys {
    #[serde(
        rename = "elevenLabs",
        default,
        deserialize_with = "deserialize_legacy_keys"
    )]
    pub elevenlabs: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_legacy_keys")]
    pub gemini: Vec<String>,
}

/// Accepts a list of keys, a single legacy key string, or null.
fn deserialize_legacy_keys<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Stored {
        List(Vec<Option<String>>),
        Single(String),
        Other(serde_json::Value),
    }

    let keys = match Stored::deserialize(deserializer)? {
        Stored::List(list) => list.into_iter().flatten().collect(),
        Stored::Single(key) => vec![key],
        Stored::Other(_) => Vec::new(),
    };
    Ok(keys.into_iter().filter(|k| !k.is_empty()).collect())
}

impl ApiKeys {
    pub fn new(elevenlabs: Vec<String>, gemini: Vec<String>) -> Self {
        Self { elevenlabs, gemini }
    }

    pub fn for_provider(&self, kind: ProviderKind) -> &[String] {
        match kind {
            ProviderKind::ElevenLabs => &self.elevenlabs,
            ProviderKind::Gemini => &self.gemini,
        }
    }

    pub fn has_keys(&self, kind: ProviderKind) -> bool {
        !self.for_provider(kind).is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.elevenlabs.is_empty() && self.gemini.is_empty()
    }

    /// Trimmed, deduplicated copy without empty entries.
    pub fn normalized(&self) -> Self {
        Self {
            elevenlabs: normalize_credentials(&self.elevenlabs),
            gemini: normalize_credentials(&self.gemini),
        }
    }
}

impl fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |keys: &[String]| keys.iter().map(|k| mask_credential(k)).collect::<Vec<_>>();
        f.debug_struct("ApiKeys")
            .field("elevenlabs", &mask(&self.elevenlabs))
            .field("gemini", &mask(&self.gemini))
            .finish()
    }
}

impl Drop for ApiKeys {
    fn drop(&mut self) {
        self.elevenlabs.zeroize();
        self.gemini.zeroize();
    }
}

// =============================================================================
// Settings
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceTuning {
    pub stability: f32,
    pub similarity_boost: f32,
}

impl Default for VoiceTuning {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.75,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElevenLabsPreferences {
    pub model_id: String,
    pub settings: VoiceTuning,
}

impl Default for ElevenLabsPreferences {
    fn default() -> Self {
        Self {
            model_id: ElevenLabsModel::default().as_str().to_string(),
            settings: VoiceTuning::default(),
        }
    }
}

/// Selected provider, voice and ElevenLabs tuning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub service: ProviderKind,
    #[serde(default)]
    pub voice_id: String,
    pub eleven_labs: ElevenLabsPreferences,
}

impl Settings {
    pub fn tuning(&self) -> ElevenLabsTuning {
        ElevenLabsTuning {
            model_id: self.eleven_labs.model_id.clone(),
            stability: self.eleven_labs.settings.stability,
            similarity_boost: self.eleven_labs.settings.similarity_boost,
        }
    }

    /// Apply a partial update.
    pub fn merge(&mut self, update: SettingsUpdate) {
        if let Some(service) = update.service {
            self.service = service;
        }
        if let Some(voice_id) = update.voice_id {
            self.voice_id = voice_id;
        }
        if let Some(model_id) = update.model_id {
            self.eleven_labs.model_id = model_id;
        }
        if let Some(stability) = update.stability {
            self.eleven_labs.settings.stability = stability;
        }
        if let Some(similarity_boost) = update.similarity_boost {
            self.eleven_labs.settings.similarity_boost = similarity_boost;
        }
    }
}

/// Partial settings change; `None` fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsUpdate {
    pub service: Option<ProviderKind>,
    pub voice_id: Option<String>,
    pub model_id: Option<String>,
    pub stability: Option<f32>,
    pub similarity_boost: Option<f32>,
}

// =============================================================================
// Preferences Store
// =============================================================================

pub struct Preferences {
    store: Arc<dyn StateStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Stored credential lists; empty when nothing was saved yet.
    pub async fn api_keys(&self) -> StoreResult<ApiKeys> {
        Ok(load_json(self.store.as_ref(), API_KEYS_STORAGE_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Normalize and persist credential lists. Returns what was stored.
    pub async fn save_api_keys(&self, keys: &ApiKeys) -> StoreResult<ApiKeys> {
        let cleaned = keys.normalized();
        save_json(self.store.as_ref(), API_KEYS_STORAGE_KEY, &cleaned).await?;
        info!(
            elevenlabs = cleaned.elevenlabs.len(),
            gemini = cleaned.gemini.len(),
            "API keys saved"
        );
        Ok(cleaned)
    }

    /// Store `seed` only when no credentials are stored yet.
    ///
    /// Returns `true` when the seed was written.
    pub async fn seed_api_keys(&self, seed: &ApiKeys) -> StoreResult<bool> {
        let seed = seed.normalized();
        if seed.is_empty() || !self.api_keys().await?.is_empty() {
            return Ok(false);
        }
        self.save_api_keys(&seed).await?;
        debug!("Credential store seeded from configuration");
        Ok(true)
    }

    /// Stored settings; defaults when missing or unreadable.
    pub async fn settings(&self) -> StoreResult<Settings> {
        Ok(load_json(self.store.as_ref(), SETTINGS_STORAGE_KEY)
            .await?
            .unwrap_or_default())
    }

    pub async fn save_settings(&self, settings: &Settings) -> StoreResult<()> {
        save_json(self.store.as_ref(), SETTINGS_STORAGE_KEY, settings).await
    }

    /// Merge `update` into the stored settings and persist the result.
    pub async fn update_settings(&self, update: SettingsUpdate) -> StoreResult<Settings> {
        let mut settings = self.settings().await?;
        settings.merge(update);
        self.save_settings(&settings).await?;
        Ok(settings)
    }

    /// Switch away from a provider that has no credentials.
    ///
    /// If the selected provider has no keys and another one does, the first
    /// provider with keys becomes selected and the voice is cleared.
    pub async fn reconcile_service(&self) -> StoreResult<Settings> {
        let keys = self.api_keys().await?;
        let settings = self.settings().await?;
        if keys.has_keys(settings.service) {
            return Ok(settings);
        }

        let Some(fallback) = ProviderKind::all()
            .iter()
            .copied()
            .find(|kind| keys.has_keys(*kind))
        else {
            return Ok(settings);
        };

        info!(from = %settings.service, to = %fallback, "Selected provider has no keys, switching");
        self.update_settings(SettingsUpdate {
            service: Some(fallback),
            voice_id: Some(String::new()),
            ..Default::default()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStateStore;
    use bytes::Bytes;

    fn prefs() -> (Arc<MemoryStateStore>, Preferences) {
        let store = Arc::new(MemoryStateStore::new());
        (store.clone(), Preferences::new(store))
    }

    #[tokio::test]
    async fn test_legacy_single_key_is_loaded() {
        let (store, prefs) = prefs();
        store
            .put(
                API_KEYS_STORAGE_KEY,
                Bytes::from_static(br#"{"elevenLabs":"legacy-key","gemini":["g1","",null]}"#),
            )
            .await
            .unwrap();

        let keys = prefs.api_keys().await.unwrap();
        assert_eq!(keys.elevenlabs, vec!["legacy-key"]);
        assert_eq!(keys.gemini, vec!["g1"]);
    }

    #[tokio::test]
    async fn test_missing_fields_default_to_empty() {
        let (store, prefs) = prefs();
        store
            .put(API_KEYS_STORAGE_KEY, Bytes::from_static(br#"{"elevenLabs":null}"#))
            .await
            .unwrap();
        let keys = prefs.api_keys().await.unwrap();
        assert!(keys.is_empty());
    }

    #[tokio::test]
    async fn test_save_normalizes() {
        let (_, prefs) = prefs();
        let saved = prefs
            .save_api_keys(&ApiKeys::new(
                vec![" a ".into(), "a".into(), "".into(), "b".into()],
                vec!["  ".into()],
            ))
            .await
            .unwrap();
        assert_eq!(saved.elevenlabs, vec!["a", "b"]);
        assert!(saved.gemini.is_empty());
        assert_eq!(prefs.api_keys().await.unwrap(), saved);
    }

    #[tokio::test]
    async fn test_seed_only_when_empty() {
        let (_, prefs) = prefs();
        let seed = ApiKeys::new(vec!["env-key".into()], vec![]);
        assert!(prefs.seed_api_keys(&seed).await.unwrap());

        let other = ApiKeys::new(vec!["other".into()], vec![]);
        assert!(!prefs.seed_api_keys(&other).await.unwrap());
        assert_eq!(prefs.api_keys().await.unwrap().elevenlabs, vec!["env-key"]);
    }

    #[tokio::test]
    async fn test_settings_defaults_and_corruption() {
        let (store, prefs) = prefs();
        let defaults = prefs.settings().await.unwrap();
        assert_eq!(defaults.service, ProviderKind::ElevenLabs);
        assert_eq!(defaults.voice_id, "");
        assert_eq!(defaults.eleven_labs.model_id, "eleven_multilingual_v2");
        assert_eq!(defaults.eleven_labs.settings.stability, 0.5);
        assert_eq!(defaults.eleven_labs.settings.similarity_boost, 0.75);

        store
            .put(SETTINGS_STORAGE_KEY, Bytes::from_static(br#"{"voiceId":"x"}"#))
            .await
            .unwrap();
        assert_eq!(prefs.settings().await.unwrap(), Settings::default());
    }

    #[tokio::test]
    async fn test_partial_updates_merge() {
        let (_, prefs) = prefs();
        prefs
            .update_settings(SettingsUpdate {
                voice_id: Some("voice-1".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        let settings = prefs
            .update_settings(SettingsUpdate {
                stability: Some(0.2),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(settings.voice_id, "voice-1");
        assert_eq!(settings.eleven_labs.settings.stability, 0.2);
        assert_eq!(settings.eleven_labs.settings.similarity_boost, 0.75);
        assert_eq!(settings.tuning().stability, 0.2);
    }

    #[tokio::test]
    async fn test_settings_wire_format() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(json["service"], "ElevenLabs");
        assert_eq!(json["elevenLabs"]["modelId"], "eleven_multilingual_v2");
        assert_eq!(json["elevenLabs"]["settings"]["similarity_boost"], 0.75);
    }

    #[tokio::test]
    async fn test_reconcile_switches_to_provider_with_keys() {
        let (_, prefs) = prefs();
        prefs
            .save_api_keys(&ApiKeys::new(vec![], vec!["g".into()]))
            .await
            .unwrap();
        prefs
            .update_settings(SettingsUpdate {
                voice_id: Some("eleven-voice".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        let settings = prefs.reconcile_service().await.unwrap();
        assert_eq!(settings.service, ProviderKind::Gemini);
        assert_eq!(settings.voice_id, "");
    }

    #[test]
    fn test_debug_masks_keys() {
        let keys = ApiKeys::new(vec!["secret-abcd".into()], vec![]);
        let rendered = format!("{keys:?}");
        assert!(rendered.contains("...abcd"));
        assert!(!rendered.contains("secret"));
    }
}
