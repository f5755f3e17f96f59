use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::clients::TrendsProvider;
use crate::db::Store;
use crate::gate::UpstreamGate;
use crate::models::{ByCountryPoint, CacheInfo, SeriesPoint, TrendParams, TrendResponse};
use crate::retry::{self, RetryError, RetryPolicy};
use crate::services::cache::TrendCache;
use crate::services::scoring;

/// Failures the engine can surface to the API layer. Anything recoverable
/// (stale cache, best-effort persistence) is handled internally.
#[derive(Debug, Error)]
pub enum TrendError {
    #[error("No trend data available for keyword \"{keyword}\" in country \"{country}\"")]
    DataNotFound { keyword: String, country: String },

    #[error("Failed to fetch trend data after {attempts} attempts: {message}")]
    ProviderUnavailable {
        message: String,
        attempts: u32,
        blocked: bool,
    },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<RetryError> for TrendError {
    fn from(err: RetryError) -> Self {
        Self::ProviderUnavailable {
            message: err.message,
            attempts: err.attempts,
            blocked: err.blocked,
        }
    }
}

/// Orchestrates one trend query: cache lookup, the serialized upstream
/// fetch, scoring, persistence, and the stale-cache fallback.
pub struct TrendEngine {
    store: Store,
    cache: TrendCache,
    provider: Arc<dyn TrendsProvider>,
    gate: UpstreamGate,
    retry: RetryPolicy,
    request_delay: Duration,
}

impl TrendEngine {
    #[must_use]
    pub fn new(
        store: Store,
        cache: TrendCache,
        provider: Arc<dyn TrendsProvider>,
        retry: RetryPolicy,
        request_delay: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            provider,
            gate: UpstreamGate::new(),
            retry,
            request_delay,
        }
    }

    /// Runs one logical trend query.
    ///
    /// Cache hits return immediately. On a miss the query is recorded as
    /// Running, the upstream is fetched under the gate, and the scored
    /// response is persisted and cached. If the upstream fails, a stale
    /// cache entry is preferred over surfacing the error.
    pub async fn execute(
        &self,
        params: &TrendParams,
        request_id: &str,
    ) -> Result<TrendResponse, TrendError> {
        let fingerprint = params.fingerprint();

        info!(
            request_id,
            keyword = %params.keyword,
            country = %params.country,
            window_days = params.window_days,
            baseline_days = params.baseline_days,
            "Executing trend query"
        );

        if let Some(mut cached) = self.cache.get_fresh(&fingerprint).await {
            let ttl = self.cache.ttl(&fingerprint).await;
            info!(request_id, cache_key = %fingerprint, ttl_seconds = ttl, "Cache hit");

            cached.cache = CacheInfo {
                hit: true,
                ttl_seconds: ttl,
            };
            cached.request_id = request_id.to_string();
            return Ok(cached);
        }

        info!(request_id, cache_key = %fingerprint, "Cache miss - fetching fresh data");

        let query_id = self
            .store
            .create_running(params)
            .await
            .map_err(|e| TrendError::Storage(format!("Failed to record query: {e}")))?;

        match self.fetch_upstream(params).await {
            Ok((series, by_country)) => {
                let scored = scoring::score(
                    &series,
                    &params.country,
                    params.window_days,
                    params.baseline_days,
                );

                let response = TrendResponse {
                    keyword: params.keyword.clone(),
                    country: params.country.clone(),
                    window_days: params.window_days,
                    baseline_days: params.baseline_days,
                    generated_at: Utc::now().to_rfc3339(),
                    sources_used: vec![self.provider.name().to_string()],
                    trend_score: scored.trend_score,
                    signals: scored.signals,
                    series,
                    by_country,
                    explain: scored.explain,
                    cache: CacheInfo {
                        hit: false,
                        ttl_seconds: self.cache.fresh_ttl_seconds(),
                    },
                    request_id: request_id.to_string(),
                    age_seconds: None,
                    cached_at: None,
                    warning: None,
                };

                // Persistence is best-effort past this point: the caller
                // still gets the scored response even if the audit rows
                // never land.
                match self.store.persist_result(&query_id, &response).await {
                    Ok(()) => {
                        if let Err(e) = self.store.mark_done(&query_id).await {
                            warn!(request_id, query_id = %query_id, "Failed to mark query done: {e}");
                        }
                    }
                    Err(e) => {
                        warn!(request_id, query_id = %query_id, "Failed to persist trend result: {e}");
                        let message = format!("Result persistence failed: {e}");
                        if let Err(e) = self.store.mark_error(&query_id, &message).await {
                            warn!(request_id, query_id = %query_id, "Failed to mark query errored: {e}");
                        }
                    }
                }

                self.cache.set(&fingerprint, &response).await;

                info!(
                    request_id,
                    query_id = %query_id,
                    trend_score = response.trend_score,
                    "Trend query completed"
                );
                Ok(response)
            }
            Err(err) => {
                error!(
                    request_id,
                    query_id = %query_id,
                    error = %err,
                    "Trend query failed - attempting stale cache fallback"
                );

                if let Err(e) = self.store.mark_error(&query_id, &err.to_string()).await {
                    warn!(request_id, query_id = %query_id, "Failed to mark query errored: {e}");
                }

                if let Some(stale) = self.cache.get_stale(&fingerprint).await {
                    warn!(
                        request_id,
                        age_seconds = stale.age_seconds,
                        "Serving stale cached data after upstream failure"
                    );

                    let mut response = stale.payload;
                    response.sources_used = vec!["stale_cache".to_string()];
                    response.cache = CacheInfo {
                        hit: true,
                        ttl_seconds: 0,
                    };
                    response.age_seconds = Some(stale.age_seconds);
                    response.cached_at = Some(stale.cached_at);
                    response.warning =
                        Some("Data may be outdated due to temporary upstream issues".to_string());
                    response.request_id = request_id.to_string();
                    return Ok(response);
                }

                Err(err)
            }
        }
    }

    /// Both upstream calls, serialized behind the gate. The series fetch
    /// always precedes the country comparison, with an unconditional delay
    /// between them so a single logical query doesn't trip the provider's
    /// burst detector.
    async fn fetch_upstream(
        &self,
        params: &TrendParams,
    ) -> Result<(Vec<SeriesPoint>, Vec<ByCountryPoint>), TrendError> {
        let _permit = self.gate.acquire().await;

        let (start, end) = date_range(params.baseline_days);
        let provider = &self.provider;
        let keyword = params.keyword.as_str();
        let country = params.country.as_str();

        let series = retry::with_retry(&self.retry, "interest_over_time", || {
            provider.fetch_series(keyword, country, start, end)
        })
        .await?;

        if series.is_empty() {
            return Err(TrendError::DataNotFound {
                keyword: keyword.to_string(),
                country: country.to_string(),
            });
        }

        tokio::time::sleep(self.request_delay).await;

        let by_country = retry::with_retry(&self.retry, "interest_by_country", || {
            provider.fetch_by_country(keyword)
        })
        .await?;

        Ok((series, by_country))
    }
}

/// Date range covered by a query: `baseline_days` back from today, UTC.
fn date_range(baseline_days: i32) -> (NaiveDate, NaiveDate) {
    let end = Utc::now().date_naive();
    let start = end - chrono::Duration::days(i64::from(baseline_days));
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_range_spans_baseline() {
        let (start, end) = date_range(365);
        assert_eq!(end - start, chrono::Duration::days(365));
    }
}
