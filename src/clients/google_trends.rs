use anyhow::Result;
use chrono::{DateTime, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::constants::SUPPORTED_COUNTRIES;
use crate::models::{ByCountryPoint, SeriesPoint};

const TRENDS_API: &str = "https://trends.google.com/trends/api";

/// Widget ids inside the explore response.
const WIDGET_TIMESERIES: &str = "TIMESERIES";
const WIDGET_GEO_MAP: &str = "GEO_MAP";

#[derive(Debug, Deserialize)]
struct ExploreResponse {
    widgets: Vec<Widget>,
}

#[derive(Debug, Deserialize)]
struct Widget {
    id: String,
    token: String,
    request: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct MultilineResponse {
    default: MultilineData,
}

#[derive(Debug, Deserialize)]
struct MultilineData {
    #[serde(rename = "timelineData")]
    timeline_data: Vec<TimelinePoint>,
}

#[derive(Debug, Deserialize)]
struct TimelinePoint {
    /// Epoch seconds, as a decimal string.
    time: String,
    #[serde(default)]
    value: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct ComparedGeoResponse {
    default: ComparedGeoData,
}

#[derive(Debug, Deserialize)]
struct ComparedGeoData {
    #[serde(rename = "geoMapData")]
    geo_map_data: Vec<GeoPoint>,
}

#[derive(Debug, Deserialize)]
struct GeoPoint {
    #[serde(rename = "geoCode")]
    geo_code: String,
    #[serde(default)]
    value: Vec<i64>,
}

/// Client for the Google Trends widget API.
///
/// Every fetch is two requests: an explore call that issues widget tokens,
/// then the widget-data call itself. Responses carry an XSSI prefix
/// (`)]}'`) that must be stripped before parsing; a body that still fails
/// to parse is surfaced with its leading bytes so callers can recognize
/// the anti-bot HTML page.
#[derive(Clone)]
pub struct GoogleTrendsClient {
    client: Client,
    base_url: String,
}

impl GoogleTrendsClient {
    pub fn new() -> Self {
        Self::with_timeout(std::time::Duration::from_secs(60))
            .expect("Failed to create GoogleTrendsClient with default timeout")
    }

    /// Creates a client with a custom request timeout.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_timeout(timeout: std::time::Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("Trendarr/1.0")
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))?;

        Ok(Self {
            client,
            base_url: TRENDS_API.to_string(),
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "Trends API error: {} - {}",
                status,
                snippet(&body)
            ));
        }

        Ok(response.text().await?)
    }

    /// Runs an explore request and returns the widget with the given id.
    async fn explore(&self, keyword: &str, geo: &str, time: &str, widget_id: &str) -> Result<Widget> {
        let req = json!({
            "comparisonItem": [{ "keyword": keyword, "geo": geo, "time": time }],
            "category": 0,
            "property": "",
        });

        let url = format!(
            "{}/explore?hl=en-US&tz=0&req={}",
            self.base_url,
            urlencoding::encode(&req.to_string())
        );

        let body = self.get_text(&url).await?;
        let explore: ExploreResponse = parse_payload(&body)?;

        explore
            .widgets
            .into_iter()
            .find(|w| w.id == widget_id)
            .ok_or_else(|| anyhow::anyhow!("No {widget_id} widget in explore response"))
    }
}

impl Default for GoogleTrendsClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl super::TrendsProvider for GoogleTrendsClient {
    async fn fetch_series(
        &self,
        keyword: &str,
        country: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<SeriesPoint>> {
        let time = format!("{} {}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d"));
        debug!(keyword, country, %time, "Fetching interest over time");

        let widget = self
            .explore(keyword, country, &time, WIDGET_TIMESERIES)
            .await?;

        let url = format!(
            "{}/widgetdata/multiline?hl=en-US&tz=0&req={}&token={}",
            self.base_url,
            urlencoding::encode(&widget.request.to_string()),
            widget.token
        );

        let body = self.get_text(&url).await?;
        let multiline: MultilineResponse = parse_payload(&body)?;

        let mut series: Vec<SeriesPoint> = multiline
            .default
            .timeline_data
            .iter()
            .filter_map(|point| {
                let date = epoch_to_date(&point.time)?;
                let value = point.value.first().copied().unwrap_or(0);
                Some(SeriesPoint {
                    date,
                    value: value.clamp(0, 100) as i32,
                })
            })
            .collect();

        series.sort_by_key(|p| p.date);
        series.dedup_by_key(|p| p.date);

        debug!(keyword, points = series.len(), "Fetched interest over time");
        Ok(series)
    }

    async fn fetch_by_country(&self, keyword: &str) -> Result<Vec<ByCountryPoint>> {
        debug!(keyword, "Fetching country comparison");

        // One global query over the last 12 months; fanning out per country
        // would triple the request count and the block risk.
        let widget = self.explore(keyword, "", "today 12-m", WIDGET_GEO_MAP).await?;

        let url = format!(
            "{}/widgetdata/comparedgeo?hl=en-US&tz=0&req={}&token={}",
            self.base_url,
            urlencoding::encode(&widget.request.to_string()),
            widget.token
        );

        let body = self.get_text(&url).await?;
        let geo: ComparedGeoResponse = parse_payload(&body)?;

        let by_country = SUPPORTED_COUNTRIES
            .iter()
            .map(|(code, _)| {
                let value = geo
                    .default
                    .geo_map_data
                    .iter()
                    .find(|point| point.geo_code == *code)
                    .and_then(|point| point.value.first().copied())
                    .unwrap_or(0);
                ByCountryPoint {
                    country: (*code).to_string(),
                    value: value.clamp(0, 100) as i32,
                }
            })
            .collect();

        Ok(sort_by_country(by_country))
    }
}

/// Sorts the comparison descending by value, country code breaking ties.
#[must_use]
pub fn sort_by_country(mut points: Vec<ByCountryPoint>) -> Vec<ByCountryPoint> {
    points.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.country.cmp(&b.country)));
    points
}

/// Strips the XSSI prefix and parses the JSON payload. Parse failures
/// include the body's leading bytes: that is what lets the retry envelope
/// spot the anti-bot HTML page.
fn parse_payload<T: serde::de::DeserializeOwned>(body: &str) -> Result<T> {
    let start = body
        .find(['{', '['])
        .ok_or_else(|| anyhow::anyhow!("Invalid response from trends API: {}", snippet(body)))?;

    serde_json::from_str(&body[start..])
        .map_err(|e| anyhow::anyhow!("Invalid response from trends API ({e}): {}", snippet(body)))
}

fn epoch_to_date(epoch: &str) -> Option<NaiveDate> {
    let seconds: i64 = epoch.parse().ok()?;
    Some(DateTime::from_timestamp(seconds, 0)?.date_naive())
}

fn snippet(body: &str) -> &str {
    let end = body
        .char_indices()
        .nth(200)
        .map_or(body.len(), |(idx, _)| idx);
    &body[..end]
}
