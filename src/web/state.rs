use crate::config::AppConfig;
use crate::orchestrator::Nl2Sql;

/// Shared application state for the web server
pub struct AppState {
    pub config: AppConfig,
    pub nl2sql: Nl2Sql,
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(config: AppConfig, nl2sql: Nl2Sql) -> Self {
        Self {
            config,
            nl2sql,
            startup_time: chrono::Utc::now(),
        }
    }
}
