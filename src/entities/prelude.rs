pub use super::cache_entries::Entity as CacheEntries;
pub use super::country_points::Entity as CountryPoints;
pub use super::series_points::Entity as SeriesPoints;
pub use super::trend_queries::Entity as TrendQueries;
pub use super::trend_results::Entity as TrendResults;
