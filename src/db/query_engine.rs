use async_trait::async_trait;
use duckdb::types::Value;
use serde::Serialize;
use serde_json::{Map, Value as Json};
use thiserror::Error;
use tracing::debug;

use super::{DbError, DbPool, value_to_json, with_connection};

/// Rows produced by a successful statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryRows {
    /// Result columns in select-list order.
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Json>>,
    pub row_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionErrorKind {
    Parser,
    Binder,
    Catalog,
    Conversion,
    Constraint,
    Connection,
    Other,
}

impl ExecutionErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Parser => "parser",
            Self::Binder => "binder",
            Self::Catalog => "catalog",
            Self::Conversion => "conversion",
            Self::Constraint => "constraint",
            Self::Connection => "connection",
            Self::Other => "other",
        }
    }

    /// Classifies an engine message such as `"Binder Error: Referenced column ..."`.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        [
            ("parser error", Self::Parser),
            ("binder error", Self::Binder),
            ("catalog error", Self::Catalog),
            ("conversion error", Self::Conversion),
            ("constraint error", Self::Constraint),
            ("connection error", Self::Connection),
            ("io error", Self::Connection),
        ]
        .into_iter()
        .find(|(marker, _)| lower.contains(marker))
        .map(|(_, kind)| kind)
        .unwrap_or(Self::Other)
    }
}

/// A statement the engine refused or failed to run.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
pub struct ExecutionError {
    pub message: String,
    pub kind: ExecutionErrorKind,
}

impl From<DbError> for ExecutionError {
    fn from(err: DbError) -> Self {
        let message = err.to_string();
        let kind = match &err {
            DbError::DuckDb(inner) => ExecutionErrorKind::classify(&inner.to_string()),
            DbError::Pool(_) | DbError::Task(_) => ExecutionErrorKind::Connection,
        };
        Self { message, kind }
    }
}

impl From<duckdb::Error> for ExecutionError {
    fn from(err: duckdb::Error) -> Self {
        DbError::from(err).into()
    }
}

/// Runs SQL text and returns its rows.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    async fn execute(&self, sql: &str) -> Result<QueryRows, ExecutionError>;
}

pub struct DuckDbQueryEngine {
    pool: DbPool,
}

impl DuckDbQueryEngine {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueryEngine for DuckDbQueryEngine {
    async fn execute(&self, sql: &str) -> Result<QueryRows, ExecutionError> {
        let sql = sql.to_string();
        with_connection(&self.pool, move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query([])?;
            let columns: Vec<String> = rows
                .as_ref()
                .map(|s| s.column_names())
                .unwrap_or_default();

            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                let mut record = Map::with_capacity(columns.len());
                for (idx, name) in columns.iter().enumerate() {
                    let value: Value = row.get(idx)?;
                    record.insert(name.clone(), value_to_json(value));
                }
                out.push(record);
            }

            debug!("Query returned {} rows", out.len());
            Ok(QueryRows {
                columns,
                row_count: out.len(),
                rows: out,
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::build_pool;
    use serde_json::json;

    async fn engine() -> DuckDbQueryEngine {
        let pool = build_pool(":memory:", 2).unwrap();
        pool.get()
            .unwrap()
            .execute_batch(
                "CREATE TABLE deployment_data (app_name VARCHAR, deploy_env VARCHAR, date DATE, build INTEGER);
                 INSERT INTO deployment_data VALUES
                    ('frontend', 'PROD', DATE '2024-01-15', 3),
                    ('backend', 'DEV', DATE '2024-01-16', 7);",
            )
            .unwrap();
        DuckDbQueryEngine::new(pool)
    }

    #[tokio::test]
    async fn returns_rows_keyed_by_column() {
        let engine = engine().await;
        let result = engine
            .execute("SELECT build, app_name, date FROM deployment_data ORDER BY date")
            .await
            .unwrap();

        assert_eq!(result.columns, ["build", "app_name", "date"]);
        assert_eq!(result.row_count, 2);
        assert_eq!(result.rows[0]["app_name"], json!("frontend"));
        assert_eq!(result.rows[0]["build"], json!(3));
        assert_eq!(result.rows[0]["date"], json!("2024-01-15"));
    }

    #[tokio::test]
    async fn empty_result_keeps_columns() {
        let engine = engine().await;
        let result = engine
            .execute("SELECT app_name FROM deployment_data WHERE build > 100")
            .await
            .unwrap();
        assert_eq!(result.row_count, 0);
        assert!(result.rows.is_empty());
    }

    #[tokio::test]
    async fn missing_table_is_a_catalog_error() {
        let err = engine()
            .await
            .execute("SELECT * FROM no_such_table")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ExecutionErrorKind::Catalog);
        assert!(err.message.contains("no_such_table"));
    }

    #[tokio::test]
    async fn syntax_error_is_a_parser_error() {
        let err = engine().await.execute("SELEC 1").await.unwrap_err();
        assert_eq!(err.kind, ExecutionErrorKind::Parser);
    }

    #[test]
    fn classifies_engine_messages() {
        assert_eq!(
            ExecutionErrorKind::classify("Binder Error: Referenced column \"x\" not found"),
            ExecutionErrorKind::Binder
        );
        assert_eq!(
            ExecutionErrorKind::classify("Conversion Error: Could not convert string 'a' to INT32"),
            ExecutionErrorKind::Conversion
        );
        assert_eq!(
            ExecutionErrorKind::classify("something unexpected"),
            ExecutionErrorKind::Other
        );
    }
}
