pub mod cache;
pub mod scoring;
pub mod trend_engine;

pub use cache::TrendCache;
pub use trend_engine::{TrendEngine, TrendError};
