use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::entities::{cache_entries, trend_queries, trend_results};
use crate::models::{TrendParams, TrendResponse};

pub mod migrator;
pub mod repositories;

pub use repositories::query::{CountryPointRow, SeriesPointRow};

/// Facade over the SQLite database. Cloning is cheap; the connection pool
/// is shared.
#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn query_repo(&self) -> repositories::query::QueryRepository {
        repositories::query::QueryRepository::new(self.conn.clone())
    }

    fn cache_repo(&self) -> repositories::cache::CacheRepository {
        repositories::cache::CacheRepository::new(self.conn.clone())
    }

    // -- query lifecycle --

    pub async fn create_running(&self, params: &TrendParams) -> Result<String> {
        self.query_repo().create_running(params).await
    }

    pub async fn persist_result(&self, query_id: &str, response: &TrendResponse) -> Result<()> {
        self.query_repo().persist_result(query_id, response).await
    }

    pub async fn mark_done(&self, query_id: &str) -> Result<()> {
        self.query_repo().mark_done(query_id).await
    }

    pub async fn mark_error(&self, query_id: &str, message: &str) -> Result<()> {
        self.query_repo().mark_error(query_id, message).await
    }

    pub async fn get_query(&self, query_id: &str) -> Result<Option<trend_queries::Model>> {
        self.query_repo().get_query(query_id).await
    }

    pub async fn list_queries(&self) -> Result<Vec<trend_queries::Model>> {
        self.query_repo().list_queries().await
    }

    pub async fn get_result(&self, query_id: &str) -> Result<Option<trend_results::Model>> {
        self.query_repo().get_result(query_id).await
    }

    pub async fn get_series(&self, query_id: &str) -> Result<Vec<SeriesPointRow>> {
        self.query_repo().get_series(query_id).await
    }

    pub async fn get_country_points(&self, query_id: &str) -> Result<Vec<CountryPointRow>> {
        self.query_repo().get_country_points(query_id).await
    }

    // -- cache rows --

    pub async fn get_cache_entry(&self, key: &str) -> Result<Option<cache_entries::Model>> {
        self.cache_repo().get(key).await
    }

    pub async fn put_cache_entry(&self, key: &str, payload: &str, ttl_seconds: i64) -> Result<()> {
        self.cache_repo().put(key, payload, ttl_seconds).await
    }

    pub async fn cache_entry_ttl(&self, key: &str) -> Result<i64> {
        self.cache_repo().ttl(key).await
    }

    pub async fn delete_cache_entry(&self, key: &str) -> Result<()> {
        self.cache_repo().delete(key).await
    }
}
