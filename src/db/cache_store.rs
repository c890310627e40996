use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime, Utc};
use duckdb::{Connection, params};
use duckdb::types::Value;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use thiserror::Error;
use tracing::{debug, info};

use super::{DbError, DbPool, value_to_json, with_connection};
use crate::slots::CacheKey;

const TOP_QUERIES: usize = 10;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

const CREATE_CACHE_TABLE: &str = "
CREATE TABLE IF NOT EXISTS nl2sql_cache (
    cache_key VARCHAR PRIMARY KEY,
    sql_query VARCHAR NOT NULL,
    created_at TIMESTAMP NOT NULL,
    last_used TIMESTAMP NOT NULL,
    use_count BIGINT NOT NULL DEFAULT 1,
    created_by VARCHAR,
    metadata VARCHAR
);";

/// Recorded alongside a stored query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub result_count: usize,
    pub timestamp: String,
}

impl CacheMetadata {
    pub fn now(result_count: usize) -> Self {
        Self {
            result_count,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEntry {
    pub cache_key: String,
    pub created_at: Option<String>,
    pub last_used: Option<String>,
    pub use_count: i64,
    pub created_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Json>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopQuery {
    pub cache_key: String,
    pub use_count: i64,
    pub last_used: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub total_entries: i64,
    pub total_hits: i64,
    pub avg_uses_per_query: Option<f64>,
    pub last_cache_hit: Option<String>,
    pub unique_users: i64,
    pub top_queries: Vec<TopQuery>,
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache store unavailable: {0}")]
    Unavailable(String),

    #[error("cache metadata could not be encoded: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl From<DbError> for CacheError {
    fn from(err: DbError) -> Self {
        Self::Unavailable(err.to_string())
    }
}

impl From<duckdb::Error> for CacheError {
    fn from(err: duckdb::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Keyed store of previously generated SQL with usage statistics.
///
/// Every write is a single statement, so concurrent writers to one key resolve
/// as last-write-wins. Implementations must not surface write contention as
/// an error.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the stored SQL and bumps its usage counters.
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError>;

    /// Inserts or replaces the SQL stored under `key`.
    async fn set(
        &self,
        key: &CacheKey,
        sql: &str,
        created_by: &str,
        metadata: &CacheMetadata,
    ) -> Result<(), CacheError>;

    async fn delete(&self, key: &CacheKey) -> Result<bool, CacheError>;

    /// Removes every entry and returns how many there were.
    async fn clear(&self) -> Result<usize, CacheError>;

    /// Most recently used entries first.
    async fn list(&self, limit: usize) -> Result<Vec<CacheEntry>, CacheError>;

    /// Deletes entries not used within `max_age_days`.
    async fn cleanup(&self, max_age_days: u32) -> Result<usize, CacheError>;

    async fn stats(&self) -> Result<CacheStats, CacheError>;
}

/// DuckDB-backed cache store.
///
/// DuckDB aborts concurrent transactions that touch the same row, so every
/// statement that modifies `nl2sql_cache` runs under `writes`.
pub struct DuckDbCacheStore {
    pool: DbPool,
    writes: Arc<Mutex<()>>,
}

impl DuckDbCacheStore {
    /// Wraps `pool`, creating the cache table if it does not exist yet.
    pub fn new(pool: DbPool) -> Result<Self, DbError> {
        pool.get()?.execute_batch(CREATE_CACHE_TABLE)?;
        debug!("Cache table ready");
        Ok(Self {
            pool,
            writes: Arc::new(Mutex::new(())),
        })
    }

    /// Runs `f` on a pooled connection while holding the write lock.
    async fn write<T, F>(&self, f: F) -> Result<T, CacheError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, CacheError> + Send + 'static,
    {
        let writes = Arc::clone(&self.writes);
        with_connection(&self.pool, move |conn| {
            // The guarded value is `()`, so a poisoned lock carries no broken state.
            let _guard = writes.lock().unwrap_or_else(PoisonError::into_inner);
            f(conn)
        })
        .await
    }
}

fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn now_timestamp() -> String {
    format_timestamp(Utc::now().naive_utc())
}

fn timestamp_string(value: Value) -> Option<String> {
    match value_to_json(value) {
        Json::String(s) => Some(s),
        _ => None,
    }
}

#[async_trait]
impl CacheStore for DuckDbCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError> {
        let key = key.to_string();
        let writes = Arc::clone(&self.writes);
        with_connection(&self.pool, move |conn| {
            let sql = {
                let mut stmt =
                    conn.prepare("SELECT sql_query FROM nl2sql_cache WHERE cache_key = ?")?;
                let mut rows = stmt.query([&key])?;
                match rows.next()? {
                    Some(row) => row.get::<_, String>(0)?,
                    None => return Ok(None),
                }
            };

            // Usage statistics are best-effort; the hit stands either way.
            let _guard = writes.lock().unwrap_or_else(PoisonError::into_inner);
            if let Err(e) = conn.execute(
                "UPDATE nl2sql_cache
                 SET last_used = CAST(? AS TIMESTAMP), use_count = use_count + 1
                 WHERE cache_key = ?",
                params![now_timestamp(), key],
            ) {
                debug!("Usage bump for {} skipped: {}", key, e);
            }
            Ok(Some(sql))
        })
        .await
    }

    async fn set(
        &self,
        key: &CacheKey,
        sql: &str,
        created_by: &str,
        metadata: &CacheMetadata,
    ) -> Result<(), CacheError> {
        let key = key.to_string();
        let sql = sql.to_string();
        let created_by = created_by.to_string();
        let metadata = serde_json::to_string(metadata)?;

        self.write(move |conn| {
            let now = now_timestamp();
            conn.execute(
                "INSERT INTO nl2sql_cache
                    (cache_key, sql_query, created_at, last_used, use_count, created_by, metadata)
                 VALUES (?, ?, CAST(? AS TIMESTAMP), CAST(? AS TIMESTAMP), 1, ?, ?)
                 ON CONFLICT (cache_key) DO UPDATE SET
                    sql_query = EXCLUDED.sql_query,
                    last_used = EXCLUDED.last_used,
                    metadata = EXCLUDED.metadata",
                params![key, sql, now, now, created_by, metadata],
            )?;
            info!("Stored cache entry {}", key);
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool, CacheError> {
        let key = key.to_string();
        self.write(move |conn| {
            let removed = conn.execute("DELETE FROM nl2sql_cache WHERE cache_key = ?", [&key])?;
            Ok(removed > 0)
        })
        .await
    }

    async fn clear(&self) -> Result<usize, CacheError> {
        self.write(|conn| {
            let removed = conn.execute("DELETE FROM nl2sql_cache", [])?;
            info!("Cleared {} cache entries", removed);
            Ok(removed)
        })
        .await
    }

    async fn list(&self, limit: usize) -> Result<Vec<CacheEntry>, CacheError> {
        with_connection(&self.pool, move |conn| {
            let sql = format!(
                "SELECT cache_key, created_at, last_used, use_count, created_by, metadata
                 FROM nl2sql_cache
                 ORDER BY last_used DESC, cache_key
                 LIMIT {limit}"
            );
            let mut stmt = conn.prepare(&sql)?;
            let entries = stmt
                .query_map([], |row| {
                    let metadata: Option<String> = row.get(5)?;
                    Ok(CacheEntry {
                        cache_key: row.get(0)?,
                        created_at: timestamp_string(row.get(1)?),
                        last_used: timestamp_string(row.get(2)?),
                        use_count: row.get(3)?,
                        created_by: row.get(4)?,
                        metadata: metadata.and_then(|raw| serde_json::from_str(&raw).ok()),
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(entries)
        })
        .await
    }

    async fn cleanup(&self, max_age_days: u32) -> Result<usize, CacheError> {
        let cutoff = Duration::try_days(i64::from(max_age_days))
            .and_then(|age| Utc::now().naive_utc().checked_sub_signed(age))
            .unwrap_or(NaiveDateTime::MIN);
        let cutoff = format_timestamp(cutoff);

        self.write(move |conn| {
            let removed = conn.execute(
                "DELETE FROM nl2sql_cache WHERE last_used < CAST(? AS TIMESTAMP)",
                [&cutoff],
            )?;
            info!("Removed {} cache entries unused since {}", removed, cutoff);
            Ok(removed)
        })
        .await
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        with_connection(&self.pool, |conn| {
            let (total_entries, total_hits, avg_uses_per_query, last_cache_hit, unique_users) = conn
                .query_row(
                    "SELECT
                        COUNT(*),
                        CAST(COALESCE(SUM(use_count), 0) AS BIGINT),
                        AVG(use_count),
                        MAX(last_used),
                        COUNT(DISTINCT created_by)
                     FROM nl2sql_cache",
                    [],
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, i64>(1)?,
                            row.get::<_, Option<f64>>(2)?,
                            timestamp_string(row.get(3)?),
                            row.get::<_, i64>(4)?,
                        ))
                    },
                )?;

            let mut stmt = conn.prepare(&format!(
                "SELECT cache_key, use_count, last_used
                 FROM nl2sql_cache
                 ORDER BY use_count DESC, cache_key
                 LIMIT {TOP_QUERIES}"
            ))?;
            let top_queries = stmt
                .query_map([], |row| {
                    Ok(TopQuery {
                        cache_key: row.get(0)?,
                        use_count: row.get(1)?,
                        last_used: timestamp_string(row.get(2)?),
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(CacheStats {
                total_entries,
                total_hits,
                avg_uses_per_query,
                last_cache_hit,
                unique_users,
                top_queries,
            })
        })
        .await
    }
}
