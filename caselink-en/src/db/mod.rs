//! Database access for caselink-en
//!
//! Owns the enrichment-outcome tables. Every enrichment attempt ends in a
//! row a human can inspect: either an `enrichments` upsert (Resolved/Failed)
//! or a `review_log` entry (NeedsReview). Nothing is silently dropped.

pub mod enrichments;
pub mod reviews;

use anyhow::Result;
use sqlx::SqlitePool;

/// Initialize caselink-en specific tables
///
/// Creates enrichments and review_log tables if they don't exist.
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS enrichments (
            case_id TEXT NOT NULL,
            registry TEXT NOT NULL,
            parcel_id TEXT,
            parcel_url TEXT,
            error TEXT,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (case_id, registry)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS review_log (
            id TEXT PRIMARY KEY,
            case_id TEXT NOT NULL,
            registry TEXT NOT NULL,
            search_method TEXT NOT NULL,
            search_value TEXT NOT NULL,
            match_count INTEGER NOT NULL,
            evidence TEXT NOT NULL,
            created_at TEXT NOT NULL,
            resolved_at TEXT,
            resolution TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (enrichments, review_log)");

    Ok(())
}
