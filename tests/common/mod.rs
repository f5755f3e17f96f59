#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;

use trendarr::clients::TrendsProvider;
use trendarr::models::{ByCountryPoint, SeriesPoint};

/// Spy connector: serves canned data, counts calls, and can be flipped
/// into a failure mode mid-test.
pub struct MockProvider {
    pub series: Vec<SeriesPoint>,
    pub by_country: Vec<ByCountryPoint>,
    pub fail: AtomicBool,
    pub fail_message: String,
    pub series_calls: AtomicU32,
    pub country_calls: AtomicU32,
}

impl MockProvider {
    pub fn with_series(series: Vec<SeriesPoint>) -> Self {
        Self {
            series,
            by_country: vec![
                ByCountryPoint {
                    country: "MX".to_string(),
                    value: 80,
                },
                ByCountryPoint {
                    country: "ES".to_string(),
                    value: 45,
                },
                ByCountryPoint {
                    country: "CR".to_string(),
                    value: 10,
                },
            ],
            fail: AtomicBool::new(false),
            fail_message: "connection reset by peer".to_string(),
            series_calls: AtomicU32::new(0),
            country_calls: AtomicU32::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        let provider = Self::with_series(flat_series(30, 50));
        provider.fail.store(true, Ordering::SeqCst);
        Self {
            fail_message: message.to_string(),
            ..provider
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    pub fn series_calls(&self) -> u32 {
        self.series_calls.load(Ordering::SeqCst)
    }

    pub fn country_calls(&self) -> u32 {
        self.country_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrendsProvider for MockProvider {
    async fn fetch_series(
        &self,
        _keyword: &str,
        _country: &str,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> anyhow::Result<Vec<SeriesPoint>> {
        self.series_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("{}", self.fail_message);
        }
        Ok(self.series.clone())
    }

    async fn fetch_by_country(&self, _keyword: &str) -> anyhow::Result<Vec<ByCountryPoint>> {
        self.country_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("{}", self.fail_message);
        }
        Ok(self.by_country.clone())
    }
}

pub fn flat_series(len: usize, value: i32) -> Vec<SeriesPoint> {
    let start = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
    (0..len)
        .map(|i| SeriesPoint {
            date: start + chrono::Duration::days(i as i64),
            value,
        })
        .collect()
}

pub fn ramp_series(len: usize, start_value: i32, step: i32) -> Vec<SeriesPoint> {
    let start = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
    (0..len)
        .map(|i| SeriesPoint {
            date: start + chrono::Duration::days(i as i64),
            value: start_value + (i as i32) * step,
        })
        .collect()
}

/// Config pointed at a throwaway SQLite file with near-zero delays so
/// retry/backoff paths run instantly.
pub fn test_config() -> trendarr::Config {
    let db_path = std::env::temp_dir().join(format!("trendarr-test-{}.db", uuid::Uuid::new_v4()));

    let mut config = trendarr::Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    config.trends.retry_delay_ms = 1;
    config.trends.blocked_penalty_ms = 1;
    config.trends.request_delay_ms = 1;
    config.rate_limit.max_requests = 10_000;
    config
}

pub async fn shared_state(
    config: trendarr::Config,
    provider: Arc<MockProvider>,
) -> trendarr::SharedState {
    let store = trendarr::db::Store::new(&config.general.database_path)
        .await
        .expect("failed to open test store");
    trendarr::SharedState::with_provider(config, store, provider)
}

pub async fn spawn_app(
    config: trendarr::Config,
    provider: Arc<MockProvider>,
) -> (Arc<trendarr::api::AppState>, axum::Router) {
    let shared = shared_state(config, provider).await;
    let state = trendarr::api::build_app_state(shared).expect("failed to build app state");
    let router = trendarr::api::router(state.clone());
    (state, router)
}
