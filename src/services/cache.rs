use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::db::Store;
use crate::models::TrendResponse;

/// Wire format of the stale row: the payload plus its wall-clock write
/// time, so fallback reads can report their age.
#[derive(Debug, Serialize, Deserialize)]
struct StaleEnvelope {
    data: TrendResponse,
    cached_at: String,
}

/// A stale-cache read, annotated for the fallback response.
#[derive(Debug)]
pub struct StaleHit {
    pub payload: TrendResponse,
    pub age_seconds: i64,
    pub cached_at: String,
}

/// Two-tier response cache keyed by query fingerprint.
///
/// Every successful query writes two rows: the fresh entry under the
/// fingerprint itself and a longer-lived stale entry under
/// `{fingerprint}:stale`, consulted only when the upstream fails. All
/// operations are best-effort: read failures report a miss, write failures
/// are logged, and nothing propagates to the caller.
#[derive(Clone)]
pub struct TrendCache {
    store: Store,
    fresh_ttl_seconds: i64,
    stale_ttl_seconds: i64,
}

impl TrendCache {
    #[must_use]
    pub const fn new(store: Store, fresh_ttl_seconds: i64, stale_ttl_seconds: i64) -> Self {
        Self {
            store,
            fresh_ttl_seconds,
            stale_ttl_seconds,
        }
    }

    #[must_use]
    pub const fn fresh_ttl_seconds(&self) -> i64 {
        self.fresh_ttl_seconds
    }

    pub async fn get_fresh(&self, fingerprint: &str) -> Option<TrendResponse> {
        let entry = match self.store.get_cache_entry(fingerprint).await {
            Ok(entry) => entry?,
            Err(e) => {
                warn!(cache_key = fingerprint, "Cache read failed: {e}");
                return None;
            }
        };

        match serde_json::from_str(&entry.payload) {
            Ok(payload) => Some(payload),
            Err(e) => {
                warn!(cache_key = fingerprint, "Discarding undecodable cache entry: {e}");
                None
            }
        }
    }

    /// Reads the stale backup entry. Only consulted after upstream failure.
    pub async fn get_stale(&self, fingerprint: &str) -> Option<StaleHit> {
        let stale_key = format!("{fingerprint}:stale");

        let entry = match self.store.get_cache_entry(&stale_key).await {
            Ok(entry) => entry?,
            Err(e) => {
                warn!(cache_key = %stale_key, "Stale cache read failed: {e}");
                return None;
            }
        };

        let envelope: StaleEnvelope = match serde_json::from_str(&entry.payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(cache_key = %stale_key, "Discarding undecodable stale entry: {e}");
                return None;
            }
        };

        let age_seconds = DateTime::parse_from_rfc3339(&envelope.cached_at)
            .map(|cached_at| (Utc::now() - cached_at.with_timezone(&Utc)).num_seconds().max(0))
            .unwrap_or(0);

        Some(StaleHit {
            payload: envelope.data,
            age_seconds,
            cached_at: envelope.cached_at,
        })
    }

    /// Writes both tiers. A failed write never fails the request.
    pub async fn set(&self, fingerprint: &str, response: &TrendResponse) {
        let payload = match serde_json::to_string(response) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(cache_key = fingerprint, "Failed to serialize cache payload: {e}");
                return;
            }
        };

        if let Err(e) = self
            .store
            .put_cache_entry(fingerprint, &payload, self.fresh_ttl_seconds)
            .await
        {
            warn!(cache_key = fingerprint, "Failed to write fresh cache entry: {e}");
        }

        let envelope = StaleEnvelope {
            data: response.clone(),
            cached_at: Utc::now().to_rfc3339(),
        };
        let stale_key = format!("{fingerprint}:stale");

        match serde_json::to_string(&envelope) {
            Ok(stale_payload) => {
                if let Err(e) = self
                    .store
                    .put_cache_entry(&stale_key, &stale_payload, self.stale_ttl_seconds)
                    .await
                {
                    warn!(cache_key = %stale_key, "Failed to write stale cache entry: {e}");
                }
            }
            Err(e) => warn!(cache_key = %stale_key, "Failed to serialize stale payload: {e}"),
        }

        debug!(cache_key = fingerprint, "Cached trend response");
    }

    /// Remaining lifetime of the fresh entry, -1 when absent.
    pub async fn ttl(&self, fingerprint: &str) -> i64 {
        match self.store.cache_entry_ttl(fingerprint).await {
            Ok(ttl) => ttl,
            Err(e) => {
                warn!(cache_key = fingerprint, "Cache TTL lookup failed: {e}");
                -1
            }
        }
    }

    /// Removes the fresh entry only; the stale backup stays for fallback.
    pub async fn delete(&self, fingerprint: &str) {
        if let Err(e) = self.store.delete_cache_entry(fingerprint).await {
            warn!(cache_key = fingerprint, "Cache delete failed: {e}");
        }
    }
}
