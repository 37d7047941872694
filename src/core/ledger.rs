//! Per-credential daily request ledger.
//!
//! Providers with a per-key requests-per-day allowance are dispatched through
//! this ledger. Counts are tracked per UTC calendar day; a record stamped with
//! any other date counts as zero. The whole ledger is one JSON document in the
//! [`StateStore`] and every selection is persisted before the credential is
//! handed out.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::core::store::{StateStore, StoreResult, load_json, save_json};
use crate::utils::{Clock, mask_credential};

/// State-store key of the persisted ledger.
pub const USAGE_STORAGE_KEY: &str = "tts-gemini-usage";

/// Default requests allowed per credential per day.
pub const DEFAULT_DAILY_LIMIT: u32 = 15;

/// Usage of one credential on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaRecord {
    pub count: u32,
    /// UTC date as `YYYY-MM-DD`.
    pub date: String,
}

type UsageMap = HashMap<String, QuotaRecord>;

pub struct QuotaLedger {
    store: Arc<dyn StateStore>,
    clock: Arc<dyn Clock>,
    lock: Mutex<()>,
}

impl QuotaLedger {
    pub fn new(store: Arc<dyn StateStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            lock: Mutex::new(()),
        }
    }

    /// Pick the first credential still under `daily_limit` today and charge it
    /// one request.
    ///
    /// The ledger is rewritten to cover exactly `credentials`; records for keys
    /// no longer configured are dropped. Returns `Ok(None)` when every
    /// credential is exhausted. If persisting the incremented count fails the
    /// error is returned and no credential is handed out.
    pub async fn select_credential(
        &self,
        credentials: &[String],
        daily_limit: u32,
    ) -> StoreResult<Option<String>> {
        let _guard = self.lock.lock().await;
        let today = self.clock.today();

        let mut view = self.current_view(credentials, &today).await?;

        let selected = credentials
            .iter()
            .find(|key| view.get(*key).is_none_or(|r| r.count < daily_limit))
            .cloned();

        let Some(key) = selected else {
            info!(
                credentials = credentials.len(),
                daily_limit, "All credentials exhausted for today"
            );
            return Ok(None);
        };

        let record = view.entry(key.clone()).or_insert_with(|| QuotaRecord {
            count: 0,
            date: today.clone(),
        });
        record.count += 1;
        let count = record.count;

        save_json(self.store.as_ref(), USAGE_STORAGE_KEY, &view).await?;
        debug!(key = %mask_credential(&key), count, daily_limit, "Credential charged");

        Ok(Some(key))
    }

    /// Today's request count for each credential, in list order.
    pub async fn usage(&self, credentials: &[String]) -> StoreResult<Vec<(String, u32)>> {
        let _guard = self.lock.lock().await;
        let today = self.clock.today();
        let view = self.current_view(credentials, &today).await?;

        Ok(credentials
            .iter()
            .map(|key| (key.clone(), view.get(key).map_or(0, |r| r.count)))
            .collect())
    }

    /// Stored records restricted to `credentials`, with stale days reset.
    async fn current_view(&self, credentials: &[String], today: &str) -> StoreResult<UsageMap> {
        let stored: UsageMap = load_json(self.store.as_ref(), USAGE_STORAGE_KEY)
            .await?
            .unwrap_or_default();

        Ok(credentials
            .iter()
            .map(|key| {
                let record = match stored.get(key) {
                    Some(r) if r.date == today => r.clone(),
                    _ => QuotaRecord {
                        count: 0,
                        date: today.to_string(),
                    },
                };
                (key.clone(), record)
            })
            .collect())
    }
}
