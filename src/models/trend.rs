use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::constants::CACHE_VERSION;

/// One datum of the interest-over-time series. Dates are UTC calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: i32,
}

/// One datum of the cross-country comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByCountryPoint {
    pub country: String,
    pub value: i32,
}

/// The three raw signals the trend score is combined from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signals {
    pub growth_7_vs_30: f64,
    pub slope_14d: f64,
    pub recent_peak_30d: f64,
}

/// Lifecycle of a persisted trend query. Running is the only non-terminal
/// state; terminal rows are never updated again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Running,
    Done,
    Error,
}

impl QueryStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Done => "DONE",
            Self::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated parameters of one logical trend query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendParams {
    pub keyword: String,
    pub country: String,
    pub window_days: i32,
    pub baseline_days: i32,
}

impl TrendParams {
    /// Cache fingerprint for this query. The keyword is lowercased so that
    /// "Bitcoin" and "bitcoin" share an entry; the display casing is kept
    /// on the params themselves.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        format!(
            "trend:{}:{}:{}:{}:{}",
            CACHE_VERSION,
            self.keyword.to_lowercase(),
            self.country,
            self.window_days,
            self.baseline_days
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheInfo {
    pub hit: bool,
    pub ttl_seconds: i64,
}

/// The full response payload for a trend query. This is also exactly what
/// gets written to the cache; on a cache hit only `cache` and `request_id`
/// are rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendResponse {
    pub keyword: String,
    pub country: String,
    pub window_days: i32,
    pub baseline_days: i32,
    pub generated_at: String,
    pub sources_used: Vec<String>,
    pub trend_score: f64,
    pub signals: Signals,
    pub series: Vec<SeriesPoint>,
    pub by_country: Vec<ByCountryPoint>,
    pub explain: Vec<String>,
    pub cache: CacheInfo,
    pub request_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}
