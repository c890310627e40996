use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use crate::db::{CacheError, SchemaLookupError};
use crate::orchestrator::PrepareError;

/// Error returned by HTTP handlers, rendered as `{"error", "status"}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            ApiError::Internal(msg) => {
                error!("Request failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
        };

        let body = json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Unavailable(_) => ApiError::Unavailable(err.to_string()),
            CacheError::Encoding(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<SchemaLookupError> for ApiError {
    fn from(err: SchemaLookupError) -> Self {
        match err {
            SchemaLookupError::NotFound(_) => ApiError::NotFound(err.to_string()),
            SchemaLookupError::Unavailable(_) => ApiError::Unavailable(err.to_string()),
        }
    }
}

impl From<PrepareError> for ApiError {
    fn from(err: PrepareError) -> Self {
        match err {
            PrepareError::Cache(e) => e.into(),
            PrepareError::SchemaLookup(SchemaLookupError::NotFound(table)) => {
                ApiError::NotFound(format!("Failed to fetch schema: Table '{}' not found", table))
            }
            PrepareError::SchemaLookup(e) => e.into(),
            PrepareError::Instruction(e) => ApiError::Internal(e.to_string()),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn renders_status_and_message() {
        let response = ApiError::NotFound("cache entry k".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], 404);
        assert_eq!(json["error"], "cache entry k");
    }

    #[test]
    fn store_outages_map_to_503() {
        let err: ApiError = CacheError::Unavailable("pool timed out".into()).into();
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn missing_schema_maps_to_404() {
        let err: ApiError = PrepareError::SchemaLookup(SchemaLookupError::NotFound("t".into())).into();
        assert!(matches!(err, ApiError::NotFound(ref m) if m.contains("'t'")));
    }
}
