//! Enrichment record persistence
//!
//! One row per (case, registry) holding the last known outcome. Re-running
//! enrichment overwrites the row in place; no attempt history is kept (the
//! review log is the only append-only record).

use caselink_common::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Row, SqlitePool};

/// Last known enrichment outcome for a case at one registry
#[derive(Debug, Clone, Serialize)]
pub struct EnrichmentRecord {
    pub case_id: String,
    pub registry: String,
    pub parcel_id: Option<String>,
    pub parcel_url: Option<String>,
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Persist a successful resolution, clearing any prior error
pub async fn save_resolved(
    pool: &SqlitePool,
    case_id: &str,
    registry: &str,
    parcel_id: &str,
    parcel_url: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO enrichments (case_id, registry, parcel_id, parcel_url, error, updated_at)
        VALUES (?, ?, ?, ?, NULL, ?)
        ON CONFLICT(case_id, registry) DO UPDATE SET
            parcel_id = excluded.parcel_id,
            parcel_url = excluded.parcel_url,
            error = NULL,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(case_id)
    .bind(registry)
    .bind(parcel_id)
    .bind(parcel_url)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    tracing::info!(case_id, registry, parcel_id, "Enrichment resolved");
    Ok(())
}

/// Persist a failed attempt, clearing any prior identifier
pub async fn save_failed(
    pool: &SqlitePool,
    case_id: &str,
    registry: &str,
    message: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO enrichments (case_id, registry, parcel_id, parcel_url, error, updated_at)
        VALUES (?, ?, NULL, NULL, ?, ?)
        ON CONFLICT(case_id, registry) DO UPDATE SET
            parcel_id = NULL,
            parcel_url = NULL,
            error = excluded.error,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(case_id)
    .bind(registry)
    .bind(message)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    tracing::warn!(case_id, registry, error = message, "Enrichment failed");
    Ok(())
}

/// Load the enrichment record for a case at one registry
pub async fn get_enrichment(
    pool: &SqlitePool,
    case_id: &str,
    registry: &str,
) -> Result<Option<EnrichmentRecord>> {
    let row = sqlx::query(
        r#"
        SELECT case_id, registry, parcel_id, parcel_url, error, updated_at
        FROM enrichments
        WHERE case_id = ? AND registry = ?
        "#,
    )
    .bind(case_id)
    .bind(registry)
    .fetch_optional(pool)
    .await?;

    row.map(row_to_record).transpose()
}

/// Load all enrichment records for a case
pub async fn get_enrichments(pool: &SqlitePool, case_id: &str) -> Result<Vec<EnrichmentRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT case_id, registry, parcel_id, parcel_url, error, updated_at
        FROM enrichments
        WHERE case_id = ?
        ORDER BY registry
        "#,
    )
    .bind(case_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(row_to_record).collect()
}

fn row_to_record(row: sqlx::sqlite::SqliteRow) -> Result<EnrichmentRecord> {
    let updated_at: String = row.get("updated_at");
    let updated_at = DateTime::parse_from_rfc3339(&updated_at)
        .map_err(|e| {
            caselink_common::Error::Internal(format!("Invalid updated_at timestamp: {}", e))
        })?
        .with_timezone(&Utc);

    Ok(EnrichmentRecord {
        case_id: row.get("case_id"),
        registry: row.get("registry"),
        parcel_id: row.get("parcel_id"),
        parcel_url: row.get("parcel_url"),
        error: row.get("error"),
        updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::db::init_tables(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_resolved_overwrites_prior_failure() {
        let pool = test_pool().await;

        save_failed(&pool, "24CV000001-910", "Wake", "portal timeout")
            .await
            .unwrap();
        let record = get_enrichment(&pool, "24CV000001-910", "Wake")
            .await
            .unwrap()
            .unwrap();
        assert!(record.parcel_id.is_none());
        assert_eq!(record.error.as_deref(), Some("portal timeout"));

        save_resolved(
            &pool,
            "24CV000001-910",
            "Wake",
            "0012345",
            "https://services.wake.gov/realestate/Account.asp?id=0012345",
        )
        .await
        .unwrap();

        let record = get_enrichment(&pool, "24CV000001-910", "Wake")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.parcel_id.as_deref(), Some("0012345"));
        // No error artifact survives a successful re-run
        assert!(record.error.is_none());
    }

    #[tokio::test]
    async fn test_failed_clears_prior_identifier() {
        let pool = test_pool().await;

        save_resolved(&pool, "24CV000002-910", "Wake", "0099999", "https://example/99999")
            .await
            .unwrap();
        save_failed(&pool, "24CV000002-910", "Wake", "portal moved")
            .await
            .unwrap();

        let record = get_enrichment(&pool, "24CV000002-910", "Wake")
            .await
            .unwrap()
            .unwrap();
        assert!(record.parcel_id.is_none());
        assert!(record.parcel_url.is_none());
        assert_eq!(record.error.as_deref(), Some("portal moved"));
    }

    #[tokio::test]
    async fn test_records_are_per_registry() {
        let pool = test_pool().await;

        save_resolved(&pool, "24CV000003-910", "Wake", "0012345", "https://example/w")
            .await
            .unwrap();
        save_failed(&pool, "24CV000003-910", "Durham", "no address")
            .await
            .unwrap();

        let records = get_enrichments(&pool, "24CV000003-910").await.unwrap();
        assert_eq!(records.len(), 2);
    }
}
