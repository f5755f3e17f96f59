use chrono::NaiveDate;

use crate::models::{ByCountryPoint, SeriesPoint};

pub mod google_trends;

pub use google_trends::GoogleTrendsClient;

/// The upstream trends data source.
///
/// Implementations do not retry and do not pace themselves; they surface
/// raw failures (parse errors, timeouts, HTTP statuses) and leave
/// retryability to the retry envelope and pacing to the gate.
#[async_trait::async_trait]
pub trait TrendsProvider: Send + Sync {
    /// Interest over time for `keyword` in `country`, ascending by date
    /// with no duplicates. Granularity is provider-chosen: daily for
    /// windows up to ~90 days, weekly beyond.
    async fn fetch_series(
        &self,
        keyword: &str,
        country: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<Vec<SeriesPoint>>;

    /// Global interest comparison filtered to the supported countries,
    /// sorted descending by value; missing countries appear with value 0.
    async fn fetch_by_country(&self, keyword: &str) -> anyhow::Result<Vec<ByCountryPoint>>;

    /// Source tag recorded in responses and audit rows.
    fn name(&self) -> &'static str {
        "google_trends"
    }
}
