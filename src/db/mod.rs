pub mod cache_store;
pub mod db_pool;
pub mod query_engine;
pub mod schema_catalog;

use chrono::{DateTime, NaiveDate};
use duckdb::Connection;
use duckdb::types::{TimeUnit, Value};
use r2d2::Pool;
use serde_json::{Number, Value as Json};
use thiserror::Error;

pub use cache_store::{CacheEntry, CacheError, CacheMetadata, CacheStats, CacheStore, DuckDbCacheStore};
pub use db_pool::DuckDBConnectionManager;
pub use query_engine::{DuckDbQueryEngine, ExecutionError, ExecutionErrorKind, QueryEngine, QueryRows};
pub use schema_catalog::{ColumnInfo, DuckDbSchemaCatalog, SchemaCatalog, SchemaLookupError, TableInfo};

pub type DbPool = Pool<DuckDBConnectionManager>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("duckdb error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Builds the shared pool for `connection_string`.
pub fn build_pool(connection_string: &str, pool_size: u32) -> Result<DbPool, DbError> {
    let manager = DuckDBConnectionManager::new(connection_string)?;
    Ok(Pool::builder().max_size(pool_size.max(1)).build(manager)?)
}

/// Runs `f` on a pooled connection off the async runtime.
///
/// The connection goes back to the pool when the closure returns, on every path.
pub async fn with_connection<T, E, F>(pool: &DbPool, f: F) -> Result<T, E>
where
    F: FnOnce(&Connection) -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: From<DbError> + Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(DbError::from)?;
        f(&conn)
    })
    .await
    .map_err(|e| E::from(DbError::from(e)))?
}

/// Double-quotes an identifier for interpolation into SQL text.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Converts a DuckDB cell to JSON. Temporal values become ISO-8601 strings.
pub fn value_to_json(value: Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Boolean(b) => Json::Bool(b),
        Value::TinyInt(v) => v.into(),
        Value::SmallInt(v) => v.into(),
        Value::Int(v) => v.into(),
        Value::BigInt(v) => v.into(),
        Value::UTinyInt(v) => v.into(),
        Value::USmallInt(v) => v.into(),
        Value::UInt(v) => v.into(),
        Value::UBigInt(v) => v.into(),
        Value::HugeInt(v) => i64::try_from(v)
            .map(Json::from)
            .unwrap_or_else(|_| Json::String(v.to_string())),
        Value::Float(v) => float_to_json(f64::from(v)),
        Value::Double(v) => float_to_json(v),
        Value::Text(s) => Json::String(s),
        Value::Date32(days) => date_from_epoch_days(days)
            .map(|date| Json::String(date.format("%Y-%m-%d").to_string()))
            .unwrap_or(Json::Null),
        Value::Timestamp(unit, raw) => timestamp_to_iso(unit, raw)
            .map(Json::String)
            .unwrap_or(Json::Null),
        other => Json::String(format!("{other:?}")),
    }
}

fn float_to_json(v: f64) -> Json {
    Number::from_f64(v).map(Json::Number).unwrap_or(Json::Null)
}

fn date_from_epoch_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1970, 1, 1)?.checked_add_signed(chrono::Duration::try_days(i64::from(days))?)
}

fn timestamp_to_iso(unit: TimeUnit, raw: i64) -> Option<String> {
    let micros = match unit {
        TimeUnit::Second => raw.checked_mul(1_000_000)?,
        TimeUnit::Millisecond => raw.checked_mul(1_000)?,
        TimeUnit::Microsecond => raw,
        TimeUnit::Nanosecond => raw / 1_000,
    };
    let secs = micros.div_euclid(1_000_000);
    let nanos = u32::try_from(micros.rem_euclid(1_000_000) * 1_000).ok()?;
    let ts = DateTime::from_timestamp(secs, nanos)?;
    Some(ts.naive_utc().format("%Y-%m-%dT%H:%M:%S%.f").to_string())
}
