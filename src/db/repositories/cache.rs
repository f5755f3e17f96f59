use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::entities::{cache_entries, prelude::*};

/// Row-level access to the TTL'd cache table. One row per cache key; the
/// fresh/stale pairing is handled a layer up.
pub struct CacheRepository {
    conn: DatabaseConnection,
}

impl CacheRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Returns the unexpired row for `key`, if any. Expired rows are swept
    /// opportunistically on each read; there is no background job.
    pub async fn get(&self, key: &str) -> Result<Option<cache_entries::Model>> {
        let now = Utc::now().to_rfc3339();

        let _ = CacheEntries::delete_many()
            .filter(cache_entries::Column::ExpiresAt.lt(&now))
            .exec(&self.conn)
            .await;

        let entry = CacheEntries::find()
            .filter(cache_entries::Column::CacheKey.eq(key))
            .filter(cache_entries::Column::ExpiresAt.gt(&now))
            .one(&self.conn)
            .await?;

        Ok(entry)
    }

    /// Upserts `key` with the given payload and TTL. Implemented as
    /// delete-then-insert; the unique index on `cache_key` keeps rows from
    /// piling up even under races.
    pub async fn put(&self, key: &str, payload: &str, ttl_seconds: i64) -> Result<()> {
        let now = Utc::now();
        let expires_at = (now + Duration::seconds(ttl_seconds)).to_rfc3339();

        let _ = CacheEntries::delete_many()
            .filter(cache_entries::Column::CacheKey.eq(key))
            .exec(&self.conn)
            .await;

        let active_model = cache_entries::ActiveModel {
            cache_key: Set(key.to_string()),
            payload: Set(payload.to_string()),
            cached_at: Set(now.to_rfc3339()),
            expires_at: Set(expires_at),
            ..Default::default()
        };

        CacheEntries::insert(active_model).exec(&self.conn).await?;

        Ok(())
    }

    /// Remaining lifetime of `key` in seconds, or -1 when absent or expired.
    pub async fn ttl(&self, key: &str) -> Result<i64> {
        let entry = CacheEntries::find()
            .filter(cache_entries::Column::CacheKey.eq(key))
            .one(&self.conn)
            .await?;

        let Some(entry) = entry else {
            return Ok(-1);
        };

        let expires_at = DateTime::parse_from_rfc3339(&entry.expires_at)
            .map_err(|e| anyhow::anyhow!("Malformed cache expiry '{}': {e}", entry.expires_at))?;

        let remaining = expires_at.with_timezone(&Utc) - Utc::now();
        let seconds = remaining.num_seconds();

        Ok(if seconds > 0 { seconds } else { -1 })
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        CacheEntries::delete_many()
            .filter(cache_entries::Column::CacheKey.eq(key))
            .exec(&self.conn)
            .await?;

        Ok(())
    }
}
