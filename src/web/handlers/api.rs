use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info};

use crate::db::{CacheEntry, CacheStats};
use crate::orchestrator::{ExecuteOutcome, Extraction, PrepareOutcome};
use crate::slots::CacheKey;
use crate::web::error::{ApiError, ApiResult};
use crate::web::state::AppState;

// Request types

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub sql: String,
    pub cache_key: String,
    #[serde(default = "default_confirm")]
    pub confirm_cache: bool,
}

fn default_confirm() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct CacheKeyRequest {
    pub cache_key: String,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CleanupParams {
    pub days_old: Option<u32>,
}

// Response types

#[derive(Debug, Serialize)]
pub struct CacheListing {
    pub cached_queries: Vec<CacheEntry>,
    pub total_shown: usize,
}

#[derive(Debug, Serialize)]
pub struct TableListing {
    pub tables: Vec<String>,
}

fn non_empty<'a>(field: &str, value: &'a str) -> ApiResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest(format!("{} must not be empty", field)));
    }
    Ok(trimmed)
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let uptime = chrono::Utc::now() - state.startup_time;
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "known_apps": state.nl2sql.known_apps().len(),
        "uptime_seconds": uptime.num_seconds(),
    }))
}

/// POST /api/extract returns slots, key and validation without touching any store.
pub async fn extract(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueryRequest>,
) -> ApiResult<Json<Extraction>> {
    let query = non_empty("query", &payload.query)?;
    Ok(Json(state.nl2sql.extract(query)))
}

/// POST /api/prepare
pub async fn prepare(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueryRequest>,
) -> ApiResult<Json<PrepareOutcome>> {
    let query = non_empty("query", &payload.query)?;
    debug!("Preparing query: {}", query);
    Ok(Json(state.nl2sql.prepare(query).await?))
}

/// POST /api/execute
pub async fn execute(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ExecuteRequest>,
) -> ApiResult<Json<ExecuteOutcome>> {
    let sql = non_empty("sql", &payload.sql)?;
    let cache_key = CacheKey::from_raw(non_empty("cache_key", &payload.cache_key)?);
    Ok(Json(
        state
            .nl2sql
            .execute(sql, &cache_key, payload.confirm_cache)
            .await,
    ))
}

/// GET /api/tables
pub async fn list_tables(State(state): State<Arc<AppState>>) -> ApiResult<Json<TableListing>> {
    let tables = state.nl2sql.list_tables().await?;
    Ok(Json(TableListing { tables }))
}

/// GET /api/cache?limit=
pub async fn list_cache(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<CacheListing>> {
    let limit = params.limit.unwrap_or(state.config.cache.list_limit);
    let cached_queries = state.nl2sql.list_cache(limit).await?;
    Ok(Json(CacheListing {
        total_shown: cached_queries.len(),
        cached_queries,
    }))
}

/// GET /api/cache/stats
pub async fn cache_stats(State(state): State<Arc<AppState>>) -> ApiResult<Json<CacheStats>> {
    Ok(Json(state.nl2sql.cache_stats().await?))
}

/// POST /api/cache/delete
///
/// Keys travel in the body because they may contain `/`.
pub async fn delete_cache_entry(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CacheKeyRequest>,
) -> ApiResult<Json<Value>> {
    let key = CacheKey::from_raw(payload.cache_key);
    if !state.nl2sql.delete_cache_entry(&key).await? {
        return Err(ApiError::NotFound(format!("Cache entry {} not found", key)));
    }
    info!("Deleted cache entry {}", key);
    Ok(Json(json!({
        "status": "success",
        "message": "Cache entry deleted",
    })))
}

/// DELETE /api/cache
pub async fn clear_cache(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let deleted_count = state.nl2sql.clear_cache().await?;
    Ok(Json(json!({
        "status": "success",
        "message": "Cache cleared",
        "deleted_count": deleted_count,
    })))
}

/// POST /api/cache/cleanup?days_old=
pub async fn cleanup_cache(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CleanupParams>,
) -> ApiResult<Json<Value>> {
    let days_old = params
        .days_old
        .unwrap_or(state.config.cache.cleanup_max_age_days);
    let deleted_count = state.nl2sql.cleanup_cache(days_old).await?;
    Ok(Json(json!({
        "status": "success",
        "deleted_count": deleted_count,
        "message": format!("Removed {} entries older than {} days", deleted_count, days_old),
    })))
}
