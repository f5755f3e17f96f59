pub mod trend;

pub use trend::{
    ByCountryPoint, CacheInfo, QueryStatus, SeriesPoint, Signals, TrendParams, TrendResponse,
};
