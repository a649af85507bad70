//! Database access shared across CaseLink services
//!
//! One SQLite database (caselink.db) in the root folder holds case records,
//! enrichment results, and the review log.

pub mod cases;

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
///
/// Connects to caselink.db in the root folder, creating the file and the
/// shared tables if they do not exist.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Use proper SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Initialize shared tables
///
/// Creates the cases table if it doesn't exist. Service-specific tables
/// (enrichments, review_log) are created by the owning service at startup.
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cases (
            case_number TEXT PRIMARY KEY,
            property_address TEXT,
            parcel_hint TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (cases)");

    Ok(())
}
