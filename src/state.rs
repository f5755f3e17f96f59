use std::sync::Arc;
use std::time::Duration;

use crate::clients::{GoogleTrendsClient, TrendsProvider};
use crate::config::Config;
use crate::db::Store;
use crate::retry::RetryPolicy;
use crate::services::{TrendCache, TrendEngine};

#[derive(Clone)]
pub struct SharedState {
    pub config: Config,

    pub store: Store,

    pub cache: TrendCache,

    pub engine: Arc<TrendEngine>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::new(&config.general.database_path).await?;
        let provider: Arc<dyn TrendsProvider> = Arc::new(GoogleTrendsClient::with_timeout(
            Duration::from_secs(config.trends.timeout_seconds),
        )?);

        Ok(Self::with_provider(config, store, provider))
    }

    /// Wires the engine around an explicit provider. Tests inject a spy
    /// connector here instead of the real client.
    #[must_use]
    pub fn with_provider(
        config: Config,
        store: Store,
        provider: Arc<dyn TrendsProvider>,
    ) -> Self {
        let cache = TrendCache::new(
            store.clone(),
            config.cache.fresh_ttl_seconds,
            config.cache.stale_ttl_seconds,
        );

        let retry = RetryPolicy {
            max_attempts: config.trends.max_retries,
            base_delay: Duration::from_millis(config.trends.retry_delay_ms),
            blocked_penalty: Duration::from_millis(config.trends.blocked_penalty_ms),
        };

        let engine = Arc::new(TrendEngine::new(
            store.clone(),
            cache.clone(),
            provider,
            retry,
            Duration::from_millis(config.trends.request_delay_ms),
        ));

        Self {
            config,
            store,
            cache,
            engine,
        }
    }
}
