use axum::Json;
use serde::Serialize;

use crate::constants::SUPPORTED_COUNTRIES;

#[derive(Debug, Serialize)]
pub struct RegionDto {
    pub code: &'static str,
    pub name: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RegionsResponse {
    pub regions: Vec<RegionDto>,
    pub count: usize,
}

pub async fn list_regions() -> Json<RegionsResponse> {
    let regions: Vec<RegionDto> = SUPPORTED_COUNTRIES
        .iter()
        .map(|(code, name)| RegionDto { code, name })
        .collect();
    let count = regions.len();

    Json(RegionsResponse { regions, count })
}
