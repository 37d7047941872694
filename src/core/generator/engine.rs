use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::{Bytes, BytesMut};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::error::{GenerationError, GenerationResult};
use super::observer::GenerationObserver;
use super::{GenerationRequest, GeneratorConfig};
use crate::config::StudioConfig;
use crate::core::audio::encode_wav;
use crate::core::chunker::split_text;
use crate::core::ledger::QuotaLedger;
use crate::core::preferences::Preferences;
use crate::core::store::{
    ArtifactStore, FileStateStore, FilesystemArtifactStore, GeneratedArtifact, StateStore,
};
use crate::core::tts::{
    AccountInfo, AudioPayload, BoxedSpeechProvider, DispatchMode, ProviderError, ProviderKind,
    SynthesisRequest, Voice, create_speech_provider,
};
use crate::core::voices::VoiceCatalog;
use crate::utils::{Clock, SystemClock, mask_credential};

/// Voice name recorded when the voice is not in the cached list.
pub const UNKNOWN_VOICE_NAME: &str = "Unknown";

/// Clears the busy flag on every exit path.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Self {
        if flag.swap(true, Ordering::AcqRel) {
            warn!("Generation started while another run is in progress");
        }
        Self(flag)
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Generation orchestrator.
///
/// Owns the providers and every piece of local state a run touches. Runs are
/// expected to be serialized by the caller; [`Generator::is_busy`] reports
/// whether one is in flight.
pub struct Generator {
    config: GeneratorConfig,
    providers: HashMap<ProviderKind, BoxedSpeechProvider>,
    preferences: Arc<Preferences>,
    ledger: Arc<QuotaLedger>,
    catalog: Arc<VoiceCatalog>,
    artifacts: Arc<dyn ArtifactStore>,
    clock: Arc<dyn Clock>,
    busy: AtomicBool,
    last_created_at: Mutex<u64>,
    account: RwLock<Option<AccountInfo>>,
}

impl Generator {
    /// Create a generator with no providers registered.
    pub fn new(
        config: GeneratorConfig,
        state: Arc<dyn StateStore>,
        artifacts: Arc<dyn ArtifactStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            preferences: Arc::new(Preferences::new(state.clone())),
            ledger: Arc::new(QuotaLedger::new(state.clone(), clock.clone())),
            catalog: Arc::new(VoiceCatalog::new(
                state,
                clock.clone(),
                config.voices_cache_ttl,
            )),
            config,
            providers: HashMap::new(),
            artifacts,
            clock,
            busy: AtomicBool::new(false),
            last_created_at: Mutex::new(0),
            account: RwLock::new(None),
        }
    }

    /// Register a provider, replacing any previous one of the same kind.
    pub fn with_provider(mut self, provider: BoxedSpeechProvider) -> Self {
        self.providers.insert(provider.kind(), provider);
        self
    }

    /// Build a fully wired generator with filesystem persistence under the
    /// configured data directory and every supported provider registered.
    ///
    /// Credentials from the configuration seed the credential store when it
    /// is still empty.
    pub async fn from_config(config: &StudioConfig) -> GenerationResult<Self> {
        let state: Arc<dyn StateStore> = Arc::new(FileStateStore::new(config.state_dir()).await?);
        let artifacts: Arc<dyn ArtifactStore> =
            Arc::new(FilesystemArtifactStore::new(config.artifacts_dir()).await?);

        let endpoints = config.provider_endpoints();
        let mut generator = Self::new(
            config.generator_config(),
            state,
            artifacts,
            Arc::new(SystemClock),
        );
        for kind in ProviderKind::all() {
            let provider = create_speech_provider(*kind, &endpoints)
                .map_err(|e| GenerationError::Configuration(e.message))?;
            generator = generator.with_provider(provider);
        }

        if generator
            .preferences
            .seed_api_keys(&config.seed_api_keys())
            .await?
        {
            info!("Seeded credential store from configuration");
        }

        info!(
            data_dir = %config.data_dir.display(),
            chunk_limit = config.chunk_limit,
            "Generator ready"
        );
        Ok(generator)
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn preferences(&self) -> &Arc<Preferences> {
        &self.preferences
    }

    pub fn ledger(&self) -> &Arc<QuotaLedger> {
        &self.ledger
    }

    pub fn artifacts(&self) -> &Arc<dyn ArtifactStore> {
        &self.artifacts
    }

    /// Most recent account snapshot fetched by a run or [`Self::account_info`].
    pub fn last_account_info(&self) -> Option<AccountInfo> {
        self.account.read().clone()
    }

    fn provider(&self, kind: ProviderKind) -> GenerationResult<&BoxedSpeechProvider> {
        self.providers.get(&kind).ok_or_else(|| {
            GenerationError::Configuration(format!("No {kind} provider is registered."))
        })
    }

    /// Today's per-key request counts for a ledger-dispatched provider.
    pub async fn usage(&self, service: ProviderKind) -> GenerationResult<Vec<(String, u32)>> {
        let keys = self.preferences.api_keys().await?;
        Ok(self.ledger.usage(keys.for_provider(service)).await?)
    }

    /// Generate one artifact from `request`.
    ///
    /// Fails without persisting anything if any chunk fails.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        observer: &dyn GenerationObserver,
    ) -> GenerationResult<GeneratedArtifact> {
        let _busy = BusyGuard::acquire(&self.busy);

        let keys = self.preferences.api_keys().await?;
        let credentials = keys.for_provider(request.service);
        if credentials.is_empty() {
            return Err(GenerationError::Configuration(format!(
                "Please set your {} API key in Settings.",
                request.service
            )));
        }
        if request.text.trim().is_empty() {
            return Err(GenerationError::Configuration(
                "Please enter some text to generate audio.".to_string(),
            ));
        }
        if request.voice_id.trim().is_empty() {
            return Err(GenerationError::Configuration(
                "Please select a voice.".to_string(),
            ));
        }
        let provider = self.provider(request.service)?;

        let chunks = split_text(&request.text, self.config.chunk_limit);
        let total = chunks.len();
        observer.on_progress(0, total);
        info!(
            service = %request.service,
            chunks = total,
            text_len = request.text.chars().count(),
            "Generation started"
        );

        let mut run = RunState::default();
        let mut payloads = Vec::with_capacity(total);

        for (index, chunk) in chunks.into_iter().enumerate() {
            let current = index + 1;
            observer.on_progress(current, total);
            debug!(chunk = current, total, chars = chunk.chars().count(), "Dispatching chunk");

            let synthesis = SynthesisRequest {
                text: chunk,
                voice_id: request.voice_id.clone(),
                tuning: request.tuning.clone(),
            };

            let payload = match provider.dispatch_mode() {
                DispatchMode::CredentialFailover => {
                    self.dispatch_with_failover(provider, credentials, &synthesis, observer, &mut run)
                        .await?
                }
                DispatchMode::DailyLedger => {
                    self.dispatch_with_ledger(provider, credentials, &synthesis, observer, &mut run)
                        .await?
                }
            };
            payloads.push(payload);

            if current < total && !self.config.request_delay.is_zero() {
                tokio::time::sleep(self.config.request_delay).await;
            }
        }

        let audio = assemble_audio(payloads)?;
        let voice_name = self
            .catalog
            .cached_label(request.service, &request.voice_id)
            .await?
            .unwrap_or_else(|| UNKNOWN_VOICE_NAME.to_string());

        let artifact = GeneratedArtifact::new(
            audio,
            request.text.clone(),
            voice_name,
            self.next_created_at(),
        );
        self.artifacts.insert(&artifact).await?;

        info!(
            id = %artifact.id,
            bytes = artifact.audio.len(),
            chunks = total,
            "Generation complete"
        );

        if request.service == ProviderKind::ElevenLabs {
            self.refresh_account(provider, credentials).await;
        }

        Ok(artifact)
    }

    /// Try credentials in priority order, moving on only for quota failures.
    ///
    /// Every chunk starts again from the first credential.
    async fn dispatch_with_failover(
        &self,
        provider: &BoxedSpeechProvider,
        credentials: &[String],
        request: &SynthesisRequest,
        observer: &dyn GenerationObserver,
        run: &mut RunState,
    ) -> GenerationResult<AudioPayload> {
        let mut last_error: Option<ProviderError> = None;

        for credential in credentials {
            match provider.synthesize(credential, request).await {
                Ok(payload) => {
                    run.announce(provider.kind(), credential, observer);
                    return Ok(payload);
                }
                Err(e) if e.is_quota() => {
                    let masked = mask_credential(credential);
                    warn!(key = %masked, error = %e, "Key failed with quota error, trying next");
                    observer.on_notice(&format!(
                        "Key ending in {masked} failed (quota?), trying next."
                    ));
                    last_error = Some(e);
                }
                Err(e) => {
                    warn!(key = %mask_credential(credential), error = %e, "Generation aborted");
                    return Err(e.into());
                }
            }
        }

        Err(match last_error {
            Some(e) => GenerationError::ProviderQuota(e.message),
            None => GenerationError::ProviderQuota(format!(
                "All {} API keys failed.",
                provider.kind()
            )),
        })
    }

    /// Take one credential from the daily ledger. No retry on failure.
    async fn dispatch_with_ledger(
        &self,
        provider: &BoxedSpeechProvider,
        credentials: &[String],
        request: &SynthesisRequest,
        observer: &dyn GenerationObserver,
        run: &mut RunState,
    ) -> GenerationResult<AudioPayload> {
        let Some(credential) = self
            .ledger
            .select_credential(credentials, self.config.daily_limit)
            .await?
        else {
            warn!(service = %provider.kind(), "Daily limit reached on every key");
            return Err(GenerationError::ProviderQuota(format!(
                "All {} API keys have reached their daily limit.",
                provider.kind()
            )));
        };

        run.announce(provider.kind(), &credential, observer);
        provider
            .synthesize(&credential, request)
            .await
            .map_err(|e| {
                warn!(key = %mask_credential(&credential), error = %e, "Generation aborted");
                e.into()
            })
    }

    /// Refresh the account snapshot after a run. Failures are only logged.
    async fn refresh_account(&self, provider: &BoxedSpeechProvider, credentials: &[String]) {
        if let Some(info) = first_account_info(provider, credentials).await {
            *self.account.write() = Some(info);
        } else {
            debug!(service = %provider.kind(), "Account info unavailable after run");
        }
    }

    /// Voices for `service`, from the cache unless stale or `force_refresh`.
    pub async fn fetch_voices(
        &self,
        service: ProviderKind,
        force_refresh: bool,
    ) -> GenerationResult<Vec<Voice>> {
        let provider = self.provider(service)?;
        let keys = self.preferences.api_keys().await?;
        Ok(self
            .catalog
            .fetch_voices(provider.as_ref(), keys.for_provider(service), force_refresh)
            .await?)
    }

    /// Account snapshot from the first credential that returns one.
    pub async fn account_info(&self, service: ProviderKind) -> GenerationResult<Option<AccountInfo>> {
        let provider = self.provider(service)?;
        let keys = self.preferences.api_keys().await?;
        let info = first_account_info(provider, keys.for_provider(service)).await;
        if info.is_some() {
            *self.account.write() = info.clone();
        }
        Ok(info)
    }

    /// Creation timestamp, bumped so ids never repeat within the process.
    fn next_created_at(&self) -> u64 {
        let now = self.clock.now_millis();
        let mut last = self.last_created_at.lock();
        let stamp = now.max(last.saturating_add(1));
        *last = stamp;
        stamp
    }
}

/// Per-run dispatch bookkeeping.
#[derive(Default)]
struct RunState {
    announced: bool,
}

impl RunState {
    fn announce(
        &mut self,
        kind: ProviderKind,
        credential: &str,
        observer: &dyn GenerationObserver,
    ) {
        if self.announced {
            return;
        }
        self.announced = true;
        let masked = mask_credential(credential);
        info!(service = %kind, key = %masked, "Using key");
        observer.on_notice(&format!("Using {kind} Key ending in {masked}"));
    }
}

async fn first_account_info(
    provider: &BoxedSpeechProvider,
    credentials: &[String],
) -> Option<AccountInfo> {
    for credential in credentials {
        match provider.account_info(credential).await {
            Ok(Some(info)) => return Some(info),
            Ok(None) => return None,
            Err(e) => {
                debug!(key = %mask_credential(credential), error = %e, "Account info lookup failed");
            }
        }
    }
    None
}

/// Join per-chunk payloads into the final audio.
///
/// Container payloads are concatenated as-is; raw PCM is concatenated and
/// wrapped in a single WAV header.
fn assemble_audio(payloads: Vec<AudioPayload>) -> GenerationResult<Bytes> {
    let pcm_format = match payloads.first() {
        Some(AudioPayload::RawPcm { format, .. }) => Some(*format),
        Some(AudioPayload::Container { .. }) => None,
        None => {
            return Err(GenerationError::ProviderTransient(
                "No audio was produced.".to_string(),
            ));
        }
    };

    let mut joined = BytesMut::with_capacity(payloads.iter().map(AudioPayload::len).sum());
    for payload in &payloads {
        match (payload, pcm_format) {
            (AudioPayload::RawPcm { data, format }, Some(expected)) if *format == expected => {
                joined.extend_from_slice(data)
            }
            (AudioPayload::Container { data, .. }, None) => joined.extend_from_slice(data),
            _ => {
                return Err(GenerationError::ProviderTransient(
                    "Provider returned inconsistent audio formats.".to_string(),
                ));
            }
        }
    }

    Ok(match pcm_format {
        Some(format) => encode_wav(&joined, format),
        None => joined.freeze(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audio::{PcmFormat, WAV_HEADER_LEN};

    #[test]
    fn test_assemble_containers_concatenate() {
        let audio = assemble_audio(vec![
            AudioPayload::Container {
                data: Bytes::from_static(b"ID3a"),
                mime_type: "audio/mpeg",
            },
            AudioPayload::Container {
                data: Bytes::from_static(b"bc"),
                mime_type: "audio/mpeg",
            },
        ])
        .unwrap();
        assert_eq!(&audio[..], b"ID3abc");
    }

    #[test]
    fn test_assemble_pcm_wraps_once() {
        let format = PcmFormat::MONO_16BIT_24KHZ;
        let audio = assemble_audio(vec![
            AudioPayload::RawPcm {
                data: Bytes::from_static(&[1, 2]),
                format,
            },
            AudioPayload::RawPcm {
                data: Bytes::from_static(&[3, 4]),
                format,
            },
        ])
        .unwrap();
        assert_eq!(audio.len(), WAV_HEADER_LEN + 4);
        assert_eq!(&audio[..4], b"RIFF");
        assert_eq!(&audio[WAV_HEADER_LEN..], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_assemble_rejects_mixed_payloads() {
        let result = assemble_audio(vec![
            AudioPayload::RawPcm {
                data: Bytes::from_static(&[1, 2]),
                format: PcmFormat::MONO_16BIT_24KHZ,
            },
            AudioPayload::Container {
                data: Bytes::from_static(b"x"),
                mime_type: "audio/mpeg",
            },
        ]);
        assert!(matches!(result, Err(GenerationError::ProviderTransient(_))));
        assert!(assemble_audio(Vec::new()).is_err());
    }

    #[test]
    fn test_busy_guard_resets() {
        let flag = AtomicBool::new(false);
        {
            let _guard = BusyGuard::acquire(&flag);
            assert!(flag.load(Ordering::Acquire));
        }
        assert!(!flag.load(Ordering::Acquire));
    }
}
