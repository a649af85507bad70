//! caselink-en - Case Enrichment Microservice
//!
//! Resolves the property address on a legal case record to a unique parcel
//! record in the county's property registry, persisting the identifier/URL
//! or queueing the case for human review when the lookup is ambiguous.

use anyhow::Result;
use caselink_common::config::{self, TomlConfig};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use caselink_en::enrich::RegistryRouter;
use caselink_en::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting caselink-en (Case Enrichment) microservice");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Step 1: Load config and resolve the data root folder
    let toml_config = TomlConfig::load().map_err(|e| anyhow::anyhow!("{}", e))?;
    let root_folder = config::resolve_root_folder(&toml_config);
    config::ensure_root_folder(&root_folder)
        .map_err(|e| anyhow::anyhow!("Failed to initialize root folder: {}", e))?;

    // Step 2: Open or create database
    let db_path = config::database_path(&root_folder);
    info!("Database: {}", db_path.display());

    let db_pool = caselink_common::db::init_database_pool(&db_path).await?;
    caselink_en::db::init_tables(&db_pool).await?;
    info!("Database connection established");

    // Step 3: Wire up registry adapters
    let router = RegistryRouter::from_config(&toml_config.registry_urls);

    let state = AppState::new(db_pool, router);
    let app = caselink_en::build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:5810").await?;
    info!("Listening on http://127.0.0.1:5810");
    info!("Health check: http://127.0.0.1:5810/health");

    axum::serve(listener, app).await?;

    Ok(())
}
