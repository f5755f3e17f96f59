pub mod prelude;

pub mod cache_entries;
pub mod country_points;
pub mod series_points;
pub mod trend_queries;
pub mod trend_results;
