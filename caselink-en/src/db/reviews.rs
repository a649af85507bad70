//! Review queue persistence
//!
//! Ambiguous lookups land here with enough evidence for a human to re-run
//! the search by hand. Entries are resolved exactly once and never deleted;
//! the log doubles as the audit trail for every disambiguation decision.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

/// Which key the ambiguous search used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SearchMethod {
    ParcelId,
    Address,
}

impl SearchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMethod::ParcelId => "ParcelId",
            SearchMethod::Address => "Address",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "ParcelId" => Some(SearchMethod::ParcelId),
            "Address" => Some(SearchMethod::Address),
            _ => None,
        }
    }
}

/// One review-queue entry
#[derive(Debug, Clone, Serialize)]
pub struct ReviewLogEntry {
    pub id: Uuid,
    pub case_id: String,
    pub registry: String,
    pub search_method: SearchMethod,
    pub search_value: String,
    pub match_count: i64,
    /// Structured dump of the query and the candidate set
    pub evidence: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution: Option<String>,
}

/// Review-queue operation errors
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Review entry {0} not found")]
    NotFound(Uuid),

    /// Resolution is single-shot; a second attempt is caller misuse
    #[error("Review entry {0} is already resolved")]
    AlreadyResolved(Uuid),

    #[error("Registry '{0}' is not wired up")]
    UnknownRegistry(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Store(#[from] caselink_common::Error),
}

/// Create a review entry for an ambiguous lookup
pub async fn log_review(
    pool: &SqlitePool,
    case_id: &str,
    registry: &str,
    search_method: SearchMethod,
    search_value: &str,
    match_count: usize,
    evidence: &serde_json::Value,
) -> Result<Uuid, ReviewError> {
    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO review_log (
            id, case_id, registry, search_method, search_value,
            match_count, evidence, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(case_id)
    .bind(registry)
    .bind(search_method.as_str())
    .bind(search_value)
    .bind(match_count as i64)
    .bind(evidence.to_string())
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    tracing::info!(
        case_id,
        registry,
        method = search_method.as_str(),
        match_count,
        entry_id = %id,
        "Ambiguous lookup queued for review"
    );

    Ok(id)
}

/// Load one review entry
pub async fn get_review(pool: &SqlitePool, id: Uuid) -> Result<Option<ReviewLogEntry>, ReviewError> {
    let row = sqlx::query(
        r#"
        SELECT id, case_id, registry, search_method, search_value,
               match_count, evidence, created_at, resolved_at, resolution
        FROM review_log
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(row_to_entry).transpose()
}

/// Pending (unresolved) review entries, oldest first
pub async fn get_pending_reviews(
    pool: &SqlitePool,
    registry: Option<&str>,
    limit: i64,
) -> Result<Vec<ReviewLogEntry>, ReviewError> {
    let rows = match registry {
        Some(registry) => {
            sqlx::query(
                r#"
                SELECT id, case_id, registry, search_method, search_value,
                       match_count, evidence, created_at, resolved_at, resolution
                FROM review_log
                WHERE resolved_at IS NULL AND registry = ?
                ORDER BY created_at
                LIMIT ?
                "#,
            )
            .bind(registry)
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(
                r#"
                SELECT id, case_id, registry, search_method, search_value,
                       match_count, evidence, created_at, resolved_at, resolution
                FROM review_log
                WHERE resolved_at IS NULL
                ORDER BY created_at
                LIMIT ?
                "#,
            )
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
    };

    rows.into_iter().map(row_to_entry).collect()
}

/// Mark a review entry resolved, single-shot
///
/// The guard lives in the UPDATE's WHERE clause, so two racing resolutions
/// cannot both succeed. Returns the updated entry.
pub async fn mark_resolved(
    pool: &SqlitePool,
    id: Uuid,
    notes: &str,
) -> Result<ReviewLogEntry, ReviewError> {
    let result = sqlx::query(
        r#"
        UPDATE review_log
        SET resolved_at = ?, resolution = ?
        WHERE id = ? AND resolved_at IS NULL
        "#,
    )
    .bind(Utc::now().to_rfc3339())
    .bind(notes)
    .bind(id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return match get_review(pool, id).await? {
            Some(_) => Err(ReviewError::AlreadyResolved(id)),
            None => Err(ReviewError::NotFound(id)),
        };
    }

    get_review(pool, id)
        .await?
        .ok_or(ReviewError::NotFound(id))
}

fn row_to_entry(row: sqlx::sqlite::SqliteRow) -> Result<ReviewLogEntry, ReviewError> {
    let id_str: String = row.get("id");
    let id = Uuid::parse_str(&id_str).map_err(|e| {
        ReviewError::Store(caselink_common::Error::Internal(format!(
            "Invalid review entry id: {}",
            e
        )))
    })?;

    let method_str: String = row.get("search_method");
    let search_method = SearchMethod::from_str(&method_str).ok_or_else(|| {
        ReviewError::Store(caselink_common::Error::Internal(format!(
            "Unknown search method '{}'",
            method_str
        )))
    })?;

    let evidence_str: String = row.get("evidence");
    let evidence = serde_json::from_str(&evidence_str).unwrap_or(serde_json::Value::Null);

    Ok(ReviewLogEntry {
        id,
        case_id: row.get("case_id"),
        registry: row.get("registry"),
        search_method,
        search_value: row.get("search_value"),
        match_count: row.get("match_count"),
        evidence,
        created_at: parse_timestamp(row.get("created_at"))?,
        resolved_at: row
            .get::<Option<String>, _>("resolved_at")
            .map(parse_timestamp)
            .transpose()?,
        resolution: row.get("resolution"),
    })
}

fn parse_timestamp(value: String) -> Result<DateTime<Utc>, ReviewError> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            ReviewError::Store(caselink_common::Error::Internal(format!(
                "Invalid timestamp in review_log: {}",
                e
            )))
        })
}
