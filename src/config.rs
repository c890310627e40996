use clap::{Parser, Subcommand};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::db::schema_catalog::{DEFAULT_SAMPLE_COLUMNS, DEFAULT_SAMPLE_LIMIT};
use crate::llm::GenerationSettings;
use crate::orchestrator::OrchestratorSettings;
use crate::slots::DEFAULT_TABLE;

const ENV_PREFIX: &str = "NL2SQL";
const LIST_KEYS: [&str; 3] = [
    "extraction.valid_environments",
    "extraction.app_source_tables",
    "catalog.sample_columns",
];

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    /// DuckDB file path, or `:memory:`.
    pub connection_string: String,
    pub pool_size: u32,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ExtractionConfig {
    pub default_table: String,
    pub valid_environments: Vec<String>,
    /// Tables whose `app_name` values seed the known-apps snapshot.
    pub app_source_tables: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    pub sample_columns: Vec<String>,
    pub sample_limit: usize,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub list_limit: usize,
    pub cleanup_max_age_days: u32,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub web: WebConfig,
    pub extraction: ExtractionConfig,
    pub catalog: CatalogConfig,
    pub cache: CacheConfig,
    pub generation: GenerationSettings,
    pub user_id: String,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// DuckDB database file (or :memory:)
    #[arg(long, global = true)]
    pub database: Option<String>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Identity recorded on cached queries
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Print the slots, cache key and validation for a query
    Extract {
        query: String,

        /// Treat NAME as a known application (repeatable)
        #[arg(long = "known-app", value_name = "NAME")]
        known_apps: Vec<String>,
    },
    /// List tables visible to the schema catalog
    Tables,
}

impl CliArgs {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }
}

impl AppConfig {
    pub fn new(args: &CliArgs) -> Result<Self, ConfigError> {
        // Missing keys fall back to the serde defaults below.
        let mut config_builder = Config::builder();

        if let Some(config_path) = &args.config {
            config_builder = config_builder.add_source(File::from(config_path.as_path()));
        } else {
            let default_locations = ["nl2sql.toml", "config/nl2sql.toml", "/etc/nl2sql/config.toml"];

            for location in default_locations {
                if Path::new(location).exists() {
                    config_builder =
                        config_builder.add_source(File::new(location, config::FileFormat::Toml));
                    break;
                }
            }
        }

        let mut env = Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
            .list_separator(",");
        for key in LIST_KEYS {
            env = env.with_list_parse_key(key);
        }

        let mut config: AppConfig = config_builder.add_source(env).build()?.try_deserialize()?;
        config.apply_args(args);
        Ok(config)
    }

    fn apply_args(&mut self, args: &CliArgs) {
        if let Some(database) = &args.database {
            self.database.connection_string = database.clone();
        }
        if let Some(host) = &args.host {
            self.web.host = host.clone();
        }
        if let Some(port) = args.port {
            self.web.port = port;
        }
        if let Some(user) = &args.user {
            self.user_id = user.clone();
        }
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            user_id: self.user_id.clone(),
            default_table: self.extraction.default_table.clone(),
            valid_environments: self.extraction.valid_environments.clone(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            connection_string: "nl2sql.duckdb".to_string(),
            pool_size: 5,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            default_table: DEFAULT_TABLE.to_string(),
            valid_environments: ["PROD", "STAGING", "DEV", "QA"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
            app_source_tables: vec!["deployment_data".to_string(), "test_data".to_string()],
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            sample_columns: DEFAULT_SAMPLE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            sample_limit: DEFAULT_SAMPLE_LIMIT,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            list_limit: 50,
            cleanup_max_age_days: 90,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            web: WebConfig::default(),
            extraction: ExtractionConfig::default(),
            catalog: CatalogConfig::default(),
            cache: CacheConfig::default(),
            generation: GenerationSettings::default(),
            user_id: "unknown".to_string(),
        }
    }
}
