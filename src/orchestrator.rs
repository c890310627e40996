//! Two-phase prepare/execute protocol.
//!
//! `prepare` turns a free-text query into either a validation failure, an
//! executed cache hit, or everything a generator needs to write new SQL.
//! `execute` runs generated SQL and, when asked, stores it under the key
//! `prepare` handed out.

use serde::Serialize;
use serde_json::{Map, Value as Json};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::db::{
    CacheEntry, CacheError, CacheMetadata, CacheStats, CacheStore, DbError, DbPool,
    DuckDbCacheStore, DuckDbQueryEngine, DuckDbSchemaCatalog, ExecutionErrorKind, QueryEngine,
    SchemaCatalog, SchemaLookupError, TableInfo, quote_ident,
};
use crate::llm::{InstructionBuilder, InstructionError};
use crate::slots::{
    CacheKey, DEFAULT_TABLE, KnownApps, RuleSet, SlotExtractor, SlotValidator, Slots,
    ValidationResult,
};

/// External systems the orchestrator talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub cache: Arc<dyn CacheStore>,
    pub engine: Arc<dyn QueryEngine>,
    pub catalog: Arc<dyn SchemaCatalog>,
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Attribution recorded with every stored query.
    pub user_id: String,
    /// Table used when the slots carry an empty hint.
    pub default_table: String,
    pub valid_environments: Vec<String>,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            user_id: "unknown".to_string(),
            default_table: DEFAULT_TABLE.to_string(),
            valid_environments: ["PROD", "STAGING", "DEV", "QA"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

/// Result of the first phase.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PrepareOutcome {
    ValidationFailed {
        warnings: Vec<String>,
        suggestions: Vec<String>,
    },
    CacheHit {
        sql: String,
        cache_key: CacheKey,
        execution: ExecuteOutcome,
    },
    NeedsGeneration {
        slots: Slots,
        cache_key: CacheKey,
        schema: TableInfo,
        validation: ValidationResult,
        instruction: String,
    },
}

/// Result of running SQL, with the caching decision actually taken.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecuteOutcome {
    ExecutionFailed {
        message: String,
        kind: ExecutionErrorKind,
    },
    Executed {
        columns: Vec<String>,
        rows: Vec<Map<String, Json>>,
        row_count: usize,
        cached: bool,
        cache_key: CacheKey,
    },
}

/// Offline view of what `prepare` would work with, without touching any store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extraction {
    pub slots: Slots,
    pub cache_key: CacheKey,
    pub validation: ValidationResult,
}

impl Extraction {
    /// Extracts, validates and keys `query`. Pure; no I/O.
    pub fn run(extractor: &SlotExtractor, validator: &SlotValidator, query: &str) -> Self {
        let slots = extractor.extract(query);
        let validation = validator.validate(&slots);
        let cache_key = CacheKey::build(&slots);
        Self {
            slots,
            cache_key,
            validation,
        }
    }
}

#[derive(Debug, Error)]
pub enum PrepareError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Failed to fetch schema: {0}")]
    SchemaLookup(#[from] SchemaLookupError),

    #[error(transparent)]
    Instruction(#[from] InstructionError),
}

/// Failures while wiring the orchestrator at startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("database setup failed: {0}")]
    Db(#[from] DbError),

    #[error("extraction rules failed to compile: {0}")]
    Rules(#[from] regex::Error),

    #[error(transparent)]
    Instruction(#[from] InstructionError),
}

pub struct Nl2Sql {
    extractor: SlotExtractor,
    validator: SlotValidator,
    collaborators: Collaborators,
    instructions: InstructionBuilder,
    settings: OrchestratorSettings,
}

impl Nl2Sql {
    pub fn new(
        rules: Arc<RuleSet>,
        known_apps: KnownApps,
        collaborators: Collaborators,
        instructions: InstructionBuilder,
        settings: OrchestratorSettings,
    ) -> Self {
        let validator = SlotValidator::new(known_apps.names(), &settings.valid_environments);
        info!(
            "Orchestrator ready with {} known apps for user {}",
            known_apps.len(),
            settings.user_id
        );
        Self {
            extractor: SlotExtractor::new(rules, Arc::new(known_apps)),
            validator,
            collaborators,
            instructions,
            settings,
        }
    }

    /// Wires DuckDB-backed collaborators over `pool` and loads the known-apps snapshot.
    pub async fn with_duckdb(pool: DbPool, config: &AppConfig) -> Result<Self, StartupError> {
        let engine: Arc<dyn QueryEngine> = Arc::new(DuckDbQueryEngine::new(pool.clone()));
        let collaborators = Collaborators {
            cache: Arc::new(DuckDbCacheStore::new(pool.clone())?),
            engine: engine.clone(),
            catalog: Arc::new(
                DuckDbSchemaCatalog::new(pool)
                    .with_sampling(config.catalog.sample_columns.clone(), config.catalog.sample_limit),
            ),
        };
        let known_apps = load_known_apps(engine.as_ref(), &config.extraction.app_source_tables).await;

        Ok(Self::new(
            Arc::new(RuleSet::standard()?),
            known_apps,
            collaborators,
            InstructionBuilder::new(config.generation.clone())?,
            config.orchestrator_settings(),
        ))
    }

    pub fn known_apps(&self) -> &KnownApps {
        self.extractor.known_apps()
    }

    /// Extraction, key and validation for `query`. Pure; no I/O.
    pub fn extract(&self, query: &str) -> Extraction {
        Extraction::run(&self.extractor, &self.validator, query)
    }

    pub async fn prepare(&self, query: &str) -> Result<PrepareOutcome, PrepareError> {
        let Extraction {
            slots,
            cache_key,
            validation,
        } = self.extract(query);
        debug!("Extracted slots: {:?}", slots);

        if !validation.is_valid {
            info!("Query rejected by validation: {}", query);
            // Extraction warnings explain why slots the user gave were dropped.
            let mut warnings = slots.warnings;
            warnings.extend(validation.warnings);
            return Ok(PrepareOutcome::ValidationFailed {
                warnings,
                suggestions: validation.suggestions,
            });
        }

        let cached = self.collaborators.cache.get(&cache_key).await?;
        // Blank entries are misses.
        if let Some(cached_sql) = cached.filter(|sql| !sql.trim().is_empty()) {
            info!("Cache hit for {}", cache_key);
            let sql = substitute_dynamic_values(cached_sql, &slots);
            let execution = match self.collaborators.engine.execute(&sql).await {
                Ok(result) => ExecuteOutcome::Executed {
                    columns: result.columns,
                    rows: result.rows,
                    row_count: result.row_count,
                    cached: true,
                    cache_key: cache_key.clone(),
                },
                Err(e) => {
                    warn!("Cached SQL for {} failed: {}", cache_key, e);
                    ExecuteOutcome::ExecutionFailed {
                        message: e.message,
                        kind: e.kind,
                    }
                }
            };
            return Ok(PrepareOutcome::CacheHit {
                sql,
                cache_key,
                execution,
            });
        }

        info!("Cache miss for {}", cache_key);
        let table = if slots.table_hint.is_empty() {
            self.settings.default_table.as_str()
        } else {
            slots.table_hint.as_str()
        };
        let schema = self.collaborators.catalog.table_info(table).await?;
        let instruction = self.instructions.render(&slots, &schema)?;

        Ok(PrepareOutcome::NeedsGeneration {
            slots,
            cache_key,
            schema,
            validation,
            instruction,
        })
    }

    /// Runs `sql` and stores it under `cache_key` when it succeeds and `confirm` is set.
    ///
    /// A failed store is logged and reported as `cached: false`; the rows are
    /// still returned.
    pub async fn execute(&self, sql: &str, cache_key: &CacheKey, confirm: bool) -> ExecuteOutcome {
        let result = match self.collaborators.engine.execute(sql).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Execution failed for {}: {}", cache_key, e);
                return ExecuteOutcome::ExecutionFailed {
                    message: e.message,
                    kind: e.kind,
                };
            }
        };

        let mut cached = false;
        if confirm {
            let metadata = CacheMetadata::now(result.row_count);
            match self
                .collaborators
                .cache
                .set(cache_key, sql, &self.settings.user_id, &metadata)
                .await
            {
                Ok(()) => cached = true,
                Err(e) => warn!("Could not cache SQL for {}: {}", cache_key, e),
            }
        }

        ExecuteOutcome::Executed {
            columns: result.columns,
            rows: result.rows,
            row_count: result.row_count,
            cached,
            cache_key: cache_key.clone(),
        }
    }

    pub async fn cache_stats(&self) -> Result<CacheStats, CacheError> {
        self.collaborators.cache.stats().await
    }

    pub async fn list_cache(&self, limit: usize) -> Result<Vec<CacheEntry>, CacheError> {
        self.collaborators.cache.list(limit).await
    }

    pub async fn delete_cache_entry(&self, cache_key: &CacheKey) -> Result<bool, CacheError> {
        self.collaborators.cache.delete(cache_key).await
    }

    pub async fn clear_cache(&self) -> Result<usize, CacheError> {
        self.collaborators.cache.clear().await
    }

    pub async fn cleanup_cache(&self, max_age_days: u32) -> Result<usize, CacheError> {
        self.collaborators.cache.cleanup(max_age_days).await
    }

    pub async fn list_tables(&self) -> Result<Vec<String>, SchemaLookupError> {
        self.collaborators.catalog.list_tables().await
    }
}

/// Rewrites cached SQL before it runs again. Stored SQL is already concrete,
/// so this currently returns it unchanged.
fn substitute_dynamic_values(sql: String, _slots: &Slots) -> String {
    sql
}

/// Distinct app names across `tables`, in first-seen order.
///
/// Tables that cannot be read are skipped with a warning, so a broken source
/// degrades to a smaller (possibly empty) snapshot instead of failing startup.
pub async fn load_known_apps(engine: &dyn QueryEngine, tables: &[String]) -> KnownApps {
    let mut names: Vec<String> = Vec::new();
    for table in tables {
        let sql = format!(
            "SELECT DISTINCT app_name FROM {} WHERE app_name IS NOT NULL ORDER BY app_name",
            quote_ident(table)
        );
        match engine.execute(&sql).await {
            Ok(result) => names.extend(
                result
                    .rows
                    .iter()
                    .filter_map(|row| row.get("app_name").and_then(Json::as_str))
                    .map(str::to_string),
            ),
            Err(e) => warn!("Could not load app names from {}: {}", table, e),
        }
    }

    match KnownApps::new(names) {
        Ok(apps) if apps.is_empty() => {
            warn!("No known apps found in {:?}", tables);
            apps
        }
        Ok(apps) => {
            info!("Loaded {} known apps", apps.len());
            apps
        }
        Err(e) => {
            warn!("Known app patterns failed to compile: {}", e);
            KnownApps::empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ColumnInfo, ExecutionError, QueryRows};
    use crate::llm::GenerationSettings;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct MemoryCache {
        entries: Mutex<HashMap<String, String>>,
        gets: AtomicUsize,
        fail_writes: bool,
    }

    #[async_trait]
    impl CacheStore for MemoryCache {
        async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            Ok(self.entries.lock().unwrap().get(key.as_str()).cloned())
        }

        async fn set(
            &self,
            key: &CacheKey,
            sql: &str,
            _created_by: &str,
            _metadata: &CacheMetadata,
        ) -> Result<(), CacheError> {
            if self.fail_writes {
                return Err(CacheError::Unavailable("read-only".into()));
            }
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), sql.to_string());
            Ok(())
        }

        async fn delete(&self, key: &CacheKey) -> Result<bool, CacheError> {
            Ok(self.entries.lock().unwrap().remove(key.as_str()).is_some())
        }

        async fn clear(&self) -> Result<usize, CacheError> {
            let mut entries = self.entries.lock().unwrap();
            let n = entries.len();
            entries.clear();
            Ok(n)
        }

        async fn list(&self, _limit: usize) -> Result<Vec<CacheEntry>, CacheError> {
            Ok(Vec::new())
        }

        async fn cleanup(&self, _max_age_days: u32) -> Result<usize, CacheError> {
            Ok(0)
        }

        async fn stats(&self) -> Result<CacheStats, CacheError> {
            Err(CacheError::Unavailable("not tracked".into()))
        }
    }

    /// Answers every statement with one row, or fails statements containing "boom".
    #[derive(Default)]
    struct ScriptedEngine {
        executed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl QueryEngine for ScriptedEngine {
        async fn execute(&self, sql: &str) -> Result<QueryRows, ExecutionError> {
            self.executed.lock().unwrap().push(sql.to_string());
            if sql.contains("boom") {
                return Err(ExecutionError {
                    message: "Parser Error: syntax error at or near \"boom\"".into(),
                    kind: ExecutionErrorKind::Parser,
                });
            }
            if sql.contains("test_data") && sql.contains("DISTINCT app_name") {
                return Err(ExecutionError {
                    message: "Catalog Error: Table with name test_data does not exist!".into(),
                    kind: ExecutionErrorKind::Catalog,
                });
            }
            let mut row = Map::new();
            row.insert("app_name".into(), json!("frontend"));
            Ok(QueryRows {
                columns: vec!["app_name".into()],
                rows: vec![row],
                row_count: 1,
            })
        }
    }

    struct FixedCatalog {
        tables: &'static [&'static str],
    }

    #[async_trait]
    impl SchemaCatalog for FixedCatalog {
        async fn table_info(&self, table: &str) -> Result<TableInfo, SchemaLookupError> {
            if !self.tables.contains(&table) {
                return Err(SchemaLookupError::NotFound(table.to_string()));
            }
            Ok(TableInfo {
                table_name: table.to_string(),
                columns: vec![ColumnInfo {
                    name: "app_name".into(),
                    data_type: "VARCHAR".into(),
                    nullable: true,
                    default: None,
                }],
                sample_values: BTreeMap::from([("app_name".into(), vec![json!("frontend")])]),
            })
        }

        async fn list_tables(&self) -> Result<Vec<String>, SchemaLookupError> {
            Ok(self.tables.iter().map(|t| t.to_string()).collect())
        }
    }

    struct Harness {
        nl2sql: Nl2Sql,
        cache: Arc<MemoryCache>,
        engine: Arc<ScriptedEngine>,
    }

    fn harness_with(cache: MemoryCache, tables: &'static [&'static str]) -> Harness {
        let cache = Arc::new(cache);
        let engine = Arc::new(ScriptedEngine::default());
        let nl2sql = Nl2Sql::new(
            Arc::new(RuleSet::standard().unwrap()),
            KnownApps::new(["frontend", "api-gateway"]).unwrap(),
            Collaborators {
                cache: cache.clone(),
                engine: engine.clone(),
                catalog: Arc::new(FixedCatalog { tables }),
            },
            InstructionBuilder::new(GenerationSettings::default()).unwrap(),
            OrchestratorSettings {
                user_id: "tester".into(),
                ..OrchestratorSettings::default()
            },
        );
        Harness {
            nl2sql,
            cache,
            engine,
        }
    }

    fn harness() -> Harness {
        harness_with(MemoryCache::default(), &["deployment_data", "test_data"])
    }

    #[tokio::test]
    async fn vague_query_stops_before_the_cache() {
        let h = harness();
        let outcome = h.nl2sql.prepare("show me stuff").await.unwrap();

        match outcome {
            PrepareOutcome::ValidationFailed { warnings, .. } => {
                assert!(warnings.iter().any(|w| w.starts_with("Query too vague")));
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
        assert_eq!(h.cache.gets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rejected_date_is_reported_with_vague_query() {
        let h = harness();
        let outcome = h.nl2sql.prepare("deployments on 2024-13-40").await.unwrap();

        let PrepareOutcome::ValidationFailed { warnings, .. } = outcome else {
            panic!("expected validation failure, got {:?}", outcome);
        };
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0], "Ignored '2024-13-40': not a valid calendar date");
        assert!(warnings[1].starts_with("Query too vague"));
        assert_eq!(h.cache.gets.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn offline_extraction_matches_orchestrator() {
        let h = harness();
        let query = "Get the latest 5 deployments for api-gateway in dev";
        let extractor = SlotExtractor::new(
            Arc::new(RuleSet::standard().unwrap()),
            Arc::new(KnownApps::new(["frontend", "api-gateway"]).unwrap()),
        );
        let validator = SlotValidator::new(
            ["frontend", "api-gateway"],
            &OrchestratorSettings::default().valid_environments,
        );

        assert_eq!(
            Extraction::run(&extractor, &validator, query),
            h.nl2sql.extract(query)
        );
    }

    #[tokio::test]
    async fn miss_returns_generation_context() {
        let h = harness();
        let outcome = h
            .nl2sql
            .prepare("How many tests ran for api-gateway this month")
            .await
            .unwrap();

        match outcome {
            PrepareOutcome::NeedsGeneration {
                slots,
                cache_key,
                schema,
                validation,
                instruction,
            } => {
                assert_eq!(slots.table_hint, "test_data");
                assert_eq!(cache_key.as_str(), "COUNT:test_data:api-gateway:*:days:30:*");
                assert_eq!(schema.table_name, "test_data");
                assert!(validation.is_valid);
                assert!(instruction.contains("Query the test_data table"));
            }
            other => panic!("expected needs_generation, got {:?}", other),
        }
        assert!(h.engine.executed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_cached_sql_counts_as_a_miss() {
        let cache = MemoryCache::default();
        cache.entries.lock().unwrap().insert(
            "COUNT:test_data:api-gateway:*:days:30:*".to_string(),
            "  ".to_string(),
        );
        let h = harness_with(cache, &["deployment_data", "test_data"]);

        let outcome = h
            .nl2sql
            .prepare("How many tests ran for api-gateway this month")
            .await
            .unwrap();
        assert!(matches!(outcome, PrepareOutcome::NeedsGeneration { .. }));
        assert_eq!(h.cache.gets.load(Ordering::SeqCst), 1);
        assert!(h.engine.executed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn confirmed_execution_feeds_later_cache_hits() {
        let h = harness();
        let first = h
            .nl2sql
            .prepare("Show deployments for frontend in prod in the last 3 weeks")
            .await
            .unwrap();
        let PrepareOutcome::NeedsGeneration { cache_key, .. } = first else {
            panic!("expected a miss first");
        };

        let executed = h
            .nl2sql
            .execute("SELECT * FROM deployment_data", &cache_key, true)
            .await;
        assert!(matches!(executed, ExecuteOutcome::Executed { cached: true, row_count: 1, .. }));

        let second = h
            .nl2sql
            .prepare("LIST DEPLOYMENTS OF FRONTEND TO PRODUCTION PAST 3 WEEKS")
            .await
            .unwrap();
        match second {
            PrepareOutcome::CacheHit {
                sql,
                cache_key: hit_key,
                execution,
            } => {
                assert_eq!(sql, "SELECT * FROM deployment_data");
                assert_eq!(hit_key, cache_key);
                assert!(matches!(execution, ExecuteOutcome::Executed { cached: true, .. }));
            }
            other => panic!("expected cache hit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn unconfirmed_execution_is_not_stored() {
        let h = harness();
        let key = CacheKey::from_raw("SELECT:deployment_data:frontend:*:*:*");
        let outcome = h.nl2sql.execute("SELECT 1", &key, false).await;

        assert!(matches!(outcome, ExecuteOutcome::Executed { cached: false, .. }));
        assert!(h.cache.entries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_execution_is_reported_and_not_cached() {
        let h = harness();
        let key = CacheKey::from_raw("SELECT:deployment_data:frontend:*:*:*");
        let outcome = h.nl2sql.execute("SELECT boom", &key, true).await;

        assert_eq!(
            outcome,
            ExecuteOutcome::ExecutionFailed {
                message: "Parser Error: syntax error at or near \"boom\"".into(),
                kind: ExecutionErrorKind::Parser,
            }
        );
        assert!(h.cache.entries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cache_write_failure_still_returns_rows() {
        let h = harness_with(
            MemoryCache {
                fail_writes: true,
                ..MemoryCache::default()
            },
            &["deployment_data", "test_data"],
        );
        let key = CacheKey::from_raw("SELECT:deployment_data:frontend:*:*:*");
        let outcome = h.nl2sql.execute("SELECT 1", &key, true).await;

        assert!(matches!(
            outcome,
            ExecuteOutcome::Executed {
                cached: false,
                row_count: 1,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn missing_table_surfaces_schema_error() {
        let h = harness_with(MemoryCache::default(), &["deployment_data"]);
        let err = h
            .nl2sql
            .prepare("How many tests ran for api-gateway this month")
            .await
            .unwrap_err();

        assert!(matches!(err, PrepareError::SchemaLookup(SchemaLookupError::NotFound(_))));
        assert_eq!(err.to_string(), "Failed to fetch schema: Table 'test_data' not found");
    }

    #[tokio::test]
    async fn outcomes_serialize_with_status_tags() {
        let h = harness();
        let outcome = h
            .nl2sql
            .prepare("Show me deployments for frontend in the last week")
            .await
            .unwrap();
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "needs_generation");
        assert_eq!(value["cache_key"], "SELECT:deployment_data:frontend:*:weeks:1:*");
        assert_eq!(value["slots"]["time_range"]["unit"], "weeks");
        assert!(value["slots"].get("environment").is_none());

        let failed = serde_json::to_value(ExecuteOutcome::ExecutionFailed {
            message: "x".into(),
            kind: ExecutionErrorKind::Binder,
        })
        .unwrap();
        assert_eq!(failed, json!({"status": "execution_failed", "message": "x", "kind": "binder"}));
    }

    #[tokio::test]
    async fn admin_operations_pass_through() {
        let h = harness();
        let key = CacheKey::from_raw("k");
        h.nl2sql.execute("SELECT 1", &key, true).await;

        assert!(h.nl2sql.delete_cache_entry(&key).await.unwrap());
        assert!(!h.nl2sql.delete_cache_entry(&key).await.unwrap());
        assert_eq!(h.nl2sql.clear_cache().await.unwrap(), 0);
        assert!(h.nl2sql.cache_stats().await.is_err());
        assert_eq!(
            h.nl2sql.list_tables().await.unwrap(),
            ["deployment_data", "test_data"]
        );
    }

    #[tokio::test]
    async fn known_apps_skip_unreadable_tables() {
        let engine = ScriptedEngine::default();
        let apps = load_known_apps(
            &engine,
            &["deployment_data".to_string(), "test_data".to_string()],
        )
        .await;

        assert_eq!(apps.names().collect::<Vec<_>>(), ["frontend"]);
        assert_eq!(engine.executed.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn known_apps_empty_when_every_table_fails() {
        let engine = ScriptedEngine::default();
        let apps = load_known_apps(&engine, &["test_data".to_string()]).await;
        assert!(apps.is_empty());
        assert_eq!(apps.find_in("frontend"), None);
    }

    #[tokio::test]
    async fn unknown_app_only_warns() {
        let h = harness();
        let extraction = h.nl2sql.extract("deployments for payments in prod");
        assert_eq!(extraction.slots.app_name.as_deref(), Some("payments"));
        assert!(extraction.validation.is_valid);
        assert_eq!(
            extraction.validation.warnings,
            ["App 'payments' not found in database"]
        );
    }
}
