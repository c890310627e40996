use async_trait::async_trait;
use duckdb::types::Value;
use serde::Serialize;
use serde_json::Value as Json;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

use super::{DbError, DbPool, quote_ident, value_to_json, with_connection};

/// Columns sampled when no explicit list is configured.
pub const DEFAULT_SAMPLE_COLUMNS: [&str; 3] = ["app_name", "deploy_env", "app_version"];
pub const DEFAULT_SAMPLE_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
}

/// Column list and representative values for one table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableInfo {
    pub table_name: String,
    pub columns: Vec<ColumnInfo>,
    pub sample_values: BTreeMap<String, Vec<Json>>,
}

#[derive(Debug, Error)]
pub enum SchemaLookupError {
    #[error("Table '{0}' not found")]
    NotFound(String),

    #[error("schema catalog unavailable: {0}")]
    Unavailable(String),
}

impl From<DbError> for SchemaLookupError {
    fn from(err: DbError) -> Self {
        Self::Unavailable(err.to_string())
    }
}

impl From<duckdb::Error> for SchemaLookupError {
    fn from(err: duckdb::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

#[async_trait]
pub trait SchemaCatalog: Send + Sync {
    /// Fails with [`SchemaLookupError::NotFound`] when the table has no columns.
    async fn table_info(&self, table: &str) -> Result<TableInfo, SchemaLookupError>;

    async fn list_tables(&self) -> Result<Vec<String>, SchemaLookupError>;
}

pub struct DuckDbSchemaCatalog {
    pool: DbPool,
    sample_columns: Vec<String>,
    sample_limit: usize,
}

impl DuckDbSchemaCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            sample_columns: DEFAULT_SAMPLE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            sample_limit: DEFAULT_SAMPLE_LIMIT,
        }
    }

    pub fn with_sampling(mut self, columns: Vec<String>, limit: usize) -> Self {
        self.sample_columns = columns;
        self.sample_limit = limit;
        self
    }
}

#[async_trait]
impl SchemaCatalog for DuckDbSchemaCatalog {
    async fn table_info(&self, table: &str) -> Result<TableInfo, SchemaLookupError> {
        let table = table.to_string();
        let sample_columns = self.sample_columns.clone();
        let sample_limit = self.sample_limit;

        with_connection(&self.pool, move |conn| {
            let mut stmt = conn.prepare(
                "SELECT column_name, data_type, is_nullable, column_default
                 FROM information_schema.columns
                 WHERE table_name = ?
                 ORDER BY ordinal_position",
            )?;
            let columns = stmt
                .query_map([&table], |row| {
                    Ok(ColumnInfo {
                        name: row.get(0)?,
                        data_type: row.get(1)?,
                        nullable: row.get::<_, String>(2)? == "YES",
                        default: row.get(3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            if columns.is_empty() {
                return Err(SchemaLookupError::NotFound(table));
            }

            let mut sample_values = BTreeMap::new();
            for column in sample_columns
                .iter()
                .filter(|wanted| columns.iter().any(|c| &c.name == *wanted))
            {
                let sql = format!(
                    "SELECT DISTINCT {col} FROM {tbl} WHERE {col} IS NOT NULL ORDER BY 1 LIMIT {limit}",
                    col = quote_ident(column),
                    tbl = quote_ident(&table),
                    limit = sample_limit,
                );
                let mut sample_stmt = conn.prepare(&sql)?;
                let values = sample_stmt
                    .query_map([], |row| row.get::<_, Value>(0))?
                    .map(|v| v.map(value_to_json))
                    .collect::<Result<Vec<_>, _>>()?;
                sample_values.insert(column.clone(), values);
            }

            debug!(
                "Loaded {} columns and {} sample sets for {}",
                columns.len(),
                sample_values.len(),
                table
            );
            Ok(TableInfo {
                table_name: table,
                columns,
                sample_values,
            })
        })
        .await
    }

    async fn list_tables(&self) -> Result<Vec<String>, SchemaLookupError> {
        with_connection(&self.pool, |conn| {
            let mut stmt = conn.prepare(
                "SELECT table_name
                 FROM information_schema.tables
                 WHERE table_type = 'BASE TABLE'
                 ORDER BY table_name",
            )?;
            let tables = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(tables)
        })
        .await
    }
}
