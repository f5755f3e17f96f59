use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub cache: CacheConfig,

    pub trends: TrendsConfig,

    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Tokio worker threads (0 = runtime default).
    pub worker_threads: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/trendarr.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            cors_allowed_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL of the fresh cache entry (default: 24h).
    pub fresh_ttl_seconds: i64,

    /// TTL of the stale fallback entry (default: 48h, must be >= 2x fresh).
    pub stale_ttl_seconds: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            fresh_ttl_seconds: 86_400,
            stale_ttl_seconds: 172_800,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendsConfig {
    /// Total upstream attempts per call, including the first.
    pub max_retries: u32,

    /// Backoff base for the retry envelope.
    pub retry_delay_ms: u64,

    /// Extra delay when the provider answered with its anti-bot page.
    pub blocked_penalty_ms: u64,

    /// Unconditional pause between the two upstream calls of one query.
    pub request_delay_ms: u64,

    /// Request timeout in seconds (default: 60).
    pub timeout_seconds: u64,

    /// Upstream concurrency. The gate is single-permit; this is fixed at 1.
    pub concurrency: usize,
}

impl Default for TrendsConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 5000,
            blocked_penalty_ms: 3000,
            request_delay_ms: 4000,
            timeout_seconds: 60,
            concurrency: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub window_ms: u64,

    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_ms: 60_000,
            max_requests: 60,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            cache: CacheConfig::default(),
            trends: TrendsConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                let mut config = Self::load_from_path(path)?;
                config.apply_env_overrides();
                return Ok(config);
            }
        }

        info!("No config file found, using defaults");
        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Environment variables override file values for the keys the service
    /// has always recognized from its deployment environment.
    pub fn apply_env_overrides(&mut self) {
        if let Some(value) = env_parse("PORT") {
            self.server.port = value;
        }
        if let Ok(value) = std::env::var("DATABASE_URL") {
            self.general.database_path = value;
        }
        if let Ok(value) = std::env::var("LOG_LEVEL") {
            self.general.log_level = value;
        }
        if let Some(value) = env_parse("CACHE_TTL_SECONDS") {
            self.cache.fresh_ttl_seconds = value;
        }
        if let Some(value) = env_parse("CACHE_STALE_TTL_SECONDS") {
            self.cache.stale_ttl_seconds = value;
        }
        if let Some(value) = env_parse("TRENDS_MAX_RETRIES") {
            self.trends.max_retries = value;
        }
        if let Some(value) = env_parse("TRENDS_RETRY_DELAY_MS") {
            self.trends.retry_delay_ms = value;
        }
        if let Some(value) = env_parse("TRENDS_REQUEST_DELAY_MS") {
            self.trends.request_delay_ms = value;
        }
        if let Some(value) = env_parse("TRENDS_TIMEOUT_SECONDS") {
            self.trends.timeout_seconds = value;
        }
        if let Some(value) = env_parse("TRENDS_CONCURRENCY") {
            self.trends.concurrency = value;
        }
        if let Some(value) = env_parse("RATE_LIMIT_WINDOW_MS") {
            self.rate_limit.window_ms = value;
        }
        if let Some(value) = env_parse("RATE_LIMIT_MAX_REQUESTS") {
            self.rate_limit.max_requests = value;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache.fresh_ttl_seconds <= 0 {
            anyhow::bail!("Cache fresh TTL must be positive");
        }

        if self.cache.stale_ttl_seconds < self.cache.fresh_ttl_seconds * 2 {
            anyhow::bail!("Cache stale TTL must be at least twice the fresh TTL");
        }

        if self.trends.max_retries == 0 {
            anyhow::bail!("Trends max retries must be at least 1");
        }

        if self.trends.concurrency != 1 {
            anyhow::bail!("Upstream concurrency is fixed at 1 in this design");
        }

        if self.rate_limit.max_requests == 0 || self.rate_limit.window_ms == 0 {
            anyhow::bail!("Rate limit window and size must be positive");
        }

        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("trendarr").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".trendarr").join("config.toml"));
        }

        paths
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring unparseable {key}={raw}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.cache.fresh_ttl_seconds, 86_400);
        assert_eq!(config.cache.stale_ttl_seconds, 172_800);
        assert_eq!(config.trends.max_retries, 3);
        assert_eq!(config.trends.request_delay_ms, 4000);
        assert_eq!(config.trends.concurrency, 1);
        assert_eq!(config.rate_limit.max_requests, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[cache]"));
        assert!(toml_str.contains("[trends]"));
        assert!(toml_str.contains("[rate_limit]"));
    }

    #[test]
    fn test_config_deserialization_fills_defaults() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [trends]
            retry_delay_ms = 100
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.trends.retry_delay_ms, 100);

        assert_eq!(config.trends.max_retries, 3);
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_validate_rejects_thin_stale_ttl() {
        let mut config = Config::default();
        config.cache.stale_ttl_seconds = config.cache.fresh_ttl_seconds;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_multi_permit_gate() {
        let mut config = Config::default();
        config.trends.concurrency = 2;
        assert!(config.validate().is_err());
    }
}
