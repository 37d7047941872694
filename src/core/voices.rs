//! Voice list catalog with a persisted time-limited cache.
//!
//! Voice lists change rarely, so each provider's list is kept in the
//! [`StateStore`] under `tts-voices-cache-{Provider}` together with the time it
//! was fetched, and served from there until it is older than the TTL. A moka
//! cache sits in front of the persisted copy. Empty lists are never cached.

use std::sync::Arc;
use std::time::Duration;

use moka::future::{Cache as MokaCache, CacheBuilder as MokaCacheBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::store::{StateStore, StoreResult, load_json, save_json};
use crate::core::tts::{ProviderKind, SpeechProvider, Voice};
use crate::utils::{Clock, mask_credential};

/// Prefix of the per-provider state-store key.
pub const VOICES_CACHE_KEY_PREFIX: &str = "tts-voices-cache";

/// Default lifetime of a cached voice list.
pub const DEFAULT_VOICES_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Persisted voice list snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedVoices {
    /// Fetch time in epoch milliseconds.
    pub timestamp: u64,
    pub data: Vec<Voice>,
}

pub fn voices_cache_key(kind: ProviderKind) -> String {
    format!("{VOICES_CACHE_KEY_PREFIX}-{}", kind.as_str())
}

pub struct VoiceCatalog {
    store: Arc<dyn StateStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    memory: MokaCache<ProviderKind, Arc<CachedVoices>>,
}

impl VoiceCatalog {
    pub fn new(store: Arc<dyn StateStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        let memory = MokaCacheBuilder::new(ProviderKind::all().len() as u64).build();
        Self {
            store,
            clock,
            ttl,
            memory,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_fresh(&self, cached: &CachedVoices) -> bool {
        let age_ms = self.clock.now_millis().saturating_sub(cached.timestamp);
        u128::from(age_ms) < self.ttl.as_millis()
    }

    /// Cached snapshot regardless of age.
    async fn snapshot(&self, kind: ProviderKind) -> StoreResult<Option<Arc<CachedVoices>>> {
        if let Some(entry) = self.memory.get(&kind).await {
            return Ok(Some(entry));
        }
        let persisted: Option<CachedVoices> =
            load_json(self.store.as_ref(), &voices_cache_key(kind)).await?;
        match persisted {
            Some(cached) => {
                let entry = Arc::new(cached);
                self.memory.insert(kind, entry.clone()).await;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// Voices for `provider`, from cache unless stale or `force_refresh` is set.
    ///
    /// Credentials are tried in order and the first non-empty list wins; a
    /// credential whose listing fails is logged and skipped.
    pub async fn fetch_voices(
        &self,
        provider: &dyn SpeechProvider,
        credentials: &[String],
        force_refresh: bool,
    ) -> StoreResult<Vec<Voice>> {
        let kind = provider.kind();

        if !force_refresh
            && let Some(cached) = self.snapshot(kind).await?
            && self.is_fresh(&cached)
        {
            debug!(provider = %kind, count = cached.data.len(), "Voice list served from cache");
            return Ok(cached.data.clone());
        }

        let voices = self.fetch_from_provider(provider, credentials).await;
        if voices.is_empty() {
            info!(provider = %kind, "Provider returned no voices; cache left untouched");
            return Ok(voices);
        }

        let entry = CachedVoices {
            timestamp: self.clock.now_millis(),
            data: voices,
        };
        save_json(self.store.as_ref(), &voices_cache_key(kind), &entry).await?;
        let voices = entry.data.clone();
        self.memory.insert(kind, Arc::new(entry)).await;

        info!(provider = %kind, count = voices.len(), "Voice list refreshed");
        Ok(voices)
    }

    async fn fetch_from_provider(
        &self,
        provider: &dyn SpeechProvider,
        credentials: &[String],
    ) -> Vec<Voice> {
        // Providers without per-account voice lists ignore the credential.
        if credentials.is_empty() {
            return match provider.list_voices("").await {
                Ok(voices) => voices,
                Err(e) => {
                    warn!(provider = %provider.kind(), error = %e, "Voice listing failed");
                    Vec::new()
                }
            };
        }

        for credential in credentials {
            match provider.list_voices(credential).await {
                Ok(voices) if !voices.is_empty() => return voices,
                Ok(_) => {
                    debug!(key = %mask_credential(credential), "No voices for key, trying next");
                }
                Err(e) => {
                    warn!(
                        key = %mask_credential(credential),
                        error = %e,
                        "Voice listing failed for key, trying next"
                    );
                }
            }
        }
        Vec::new()
    }

    /// Display name of `voice_id` from the cached list, stale or not.
    pub async fn cached_label(
        &self,
        kind: ProviderKind,
        voice_id: &str,
    ) -> StoreResult<Option<String>> {
        Ok(self.snapshot(kind).await?.and_then(|cached| {
            cached
                .data
                .iter()
                .find(|v| v.id == voice_id)
                .map(|v| v.name.clone())
        }))
    }

    /// Drop both the in-memory and persisted copy for `kind`.
    pub async fn invalidate(&self, kind: ProviderKind) -> StoreResult<()> {
        self.memory.invalidate(&kind).await;
        self.store.remove(&voices_cache_key(kind)).await
    }
}
