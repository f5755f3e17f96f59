use axum::{Extension, Json, extract::State};
use serde::Deserialize;
use std::sync::Arc;

use crate::constants::{MAX_TOTAL_DAYS, WINDOW_CHOICES, is_supported_country};
use crate::models::{TrendParams, TrendResponse};

use super::{ApiError, AppState, RequestId};

#[derive(Debug, Deserialize)]
pub struct TrendQueryRequest {
    pub keyword: String,
    pub country: String,
    #[serde(default = "default_window_days")]
    pub window_days: i32,
    #[serde(default = "default_baseline_days")]
    pub baseline_days: i32,
}

const fn default_window_days() -> i32 {
    30
}

const fn default_baseline_days() -> i32 {
    365
}

pub async fn query_trends(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Json(request): Json<TrendQueryRequest>,
) -> Result<Json<TrendResponse>, ApiError> {
    let params =
        validate_query(&request).map_err(|message| ApiError::validation(message, &request_id))?;

    let response = state
        .shared
        .engine
        .execute(&params, &request_id)
        .await
        .map_err(|e| ApiError::from_engine(e, &request_id))?;

    Ok(Json(response))
}

fn validate_query(request: &TrendQueryRequest) -> Result<TrendParams, String> {
    let keyword = request.keyword.trim();
    let keyword_len = keyword.chars().count();
    if !(2..=60).contains(&keyword_len) {
        return Err("Keyword must be between 2 and 60 characters".to_string());
    }

    if !is_supported_country(&request.country) {
        return Err(format!(
            "Unsupported country '{}'. Supported countries: MX, CR, ES",
            request.country
        ));
    }

    if !WINDOW_CHOICES.contains(&request.window_days) {
        return Err("window_days must be one of 7, 30, 90, 365".to_string());
    }

    let min_baseline = request.window_days.max(30);
    if request.baseline_days < min_baseline {
        return Err(format!(
            "baseline_days must be at least {min_baseline} for this window"
        ));
    }

    if request.window_days + request.baseline_days > MAX_TOTAL_DAYS {
        return Err(format!(
            "window_days + baseline_days must not exceed {MAX_TOTAL_DAYS}"
        ));
    }

    Ok(TrendParams {
        keyword: keyword.to_string(),
        country: request.country.clone(),
        window_days: request.window_days,
        baseline_days: request.baseline_days,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(keyword: &str, country: &str, window: i32, baseline: i32) -> TrendQueryRequest {
        TrendQueryRequest {
            keyword: keyword.to_string(),
            country: country.to_string(),
            window_days: window,
            baseline_days: baseline,
        }
    }

    #[test]
    fn test_valid_query() {
        let params = validate_query(&request("bitcoin", "MX", 30, 365)).unwrap();
        assert_eq!(params.keyword, "bitcoin");
        assert_eq!(params.country, "MX");
    }

    #[test]
    fn test_keyword_is_trimmed_but_case_preserved() {
        let params = validate_query(&request("  Viva Mexico  ", "MX", 7, 30)).unwrap();
        assert_eq!(params.keyword, "Viva Mexico");
    }

    #[test]
    fn test_keyword_length_bounds() {
        assert!(validate_query(&request("a", "MX", 30, 365)).is_err());
        assert!(validate_query(&request("   b   ", "MX", 30, 365)).is_err());
        assert!(validate_query(&request(&"x".repeat(61), "MX", 30, 365)).is_err());
        assert!(validate_query(&request(&"x".repeat(60), "MX", 30, 365)).is_ok());
    }

    #[test]
    fn test_unsupported_country() {
        assert!(validate_query(&request("bitcoin", "US", 30, 365)).is_err());
        assert!(validate_query(&request("bitcoin", "mx", 30, 365)).is_err());
    }

    #[test]
    fn test_window_must_be_enumerated() {
        assert!(validate_query(&request("bitcoin", "MX", 14, 365)).is_err());
        for window in [7, 30, 90, 365] {
            assert!(validate_query(&request("bitcoin", "MX", window, 400)).is_ok());
        }
    }

    #[test]
    fn test_baseline_bounds() {
        // below the 30-day floor
        assert!(validate_query(&request("bitcoin", "MX", 7, 29)).is_err());
        assert!(validate_query(&request("bitcoin", "MX", 7, 30)).is_ok());

        // must cover the window
        assert!(validate_query(&request("bitcoin", "MX", 90, 60)).is_err());
        assert!(validate_query(&request("bitcoin", "MX", 90, 90)).is_ok());

        // window + baseline capped at 1825
        assert!(validate_query(&request("bitcoin", "MX", 30, 1796)).is_err());
        assert!(validate_query(&request("bitcoin", "MX", 30, 1795)).is_ok());
        assert!(validate_query(&request("bitcoin", "MX", 365, 1461)).is_err());
        assert!(validate_query(&request("bitcoin", "MX", 365, 1460)).is_ok());
    }
}
