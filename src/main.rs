use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use tracing::{error, info};

use nl2sql::config::{AppConfig, CliArgs, Command};
use nl2sql::db::{DuckDbSchemaCatalog, SchemaCatalog, build_pool};
use nl2sql::orchestrator::{Extraction, Nl2Sql};
use nl2sql::slots::{KnownApps, RuleSet, SlotExtractor, SlotValidator};
use nl2sql::util::logging::init_tracing;
use nl2sql::web::{self, state::AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = CliArgs::parse();
    init_tracing(args.log_json);

    let config = match AppConfig::new(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    match args.command() {
        Command::Serve => serve(config).await,
        Command::Extract { query, known_apps } => extract(&config, &query, &known_apps),
        Command::Tables => tables(&config).await,
    }
}

async fn serve(config: AppConfig) -> Result<(), Box<dyn Error>> {
    info!(
        "Opening DuckDB at {} (pool size {})",
        config.database.connection_string, config.database.pool_size
    );
    let pool = build_pool(&config.database.connection_string, config.database.pool_size)?;

    let nl2sql = match Nl2Sql::with_duckdb(pool, &config).await {
        Ok(nl2sql) => nl2sql,
        Err(e) => {
            error!("Failed to initialize: {}", e);
            return Err(e.into());
        }
    };

    let web_config = config.web.clone();
    let app_state = Arc::new(AppState::new(config, nl2sql));

    info!("Starting server on {}:{}", web_config.host, web_config.port);
    match web::run_server(web_config, app_state).await {
        Ok(()) => info!("Server stopped gracefully"),
        Err(e) => {
            error!("Server error: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}

/// Offline dry run: no database is opened.
fn extract(config: &AppConfig, query: &str, known_apps: &[String]) -> Result<(), Box<dyn Error>> {
    let known_apps = KnownApps::new(known_apps)?;
    let validator = SlotValidator::new(known_apps.names(), &config.extraction.valid_environments);
    let extractor = SlotExtractor::new(Arc::new(RuleSet::standard()?), Arc::new(known_apps));

    let extraction = Extraction::run(&extractor, &validator, query);
    println!("{}", serde_json::to_string_pretty(&extraction)?);
    Ok(())
}

async fn tables(config: &AppConfig) -> Result<(), Box<dyn Error>> {
    let pool = build_pool(&config.database.connection_string, config.database.pool_size)?;
    for table in DuckDbSchemaCatalog::new(pool).list_tables().await? {
        println!("{}", table);
    }
    Ok(())
}
