//! Enrichment endpoints
//!
//! One attempt per request; bulk backfills drive this endpoint one case at
//! a time so portal rate limits stay with the adapters, not here.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use caselink_common::db::cases;

use crate::db::enrichments::{self, EnrichmentRecord};
use crate::enrich::EnrichmentOutcome;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// POST /enrich/{case_number}
///
/// Runs one enrichment attempt for the case, overwriting any prior
/// persisted attempt. Every terminal outcome is a 200 body; routing-level
/// problems (unknown registry, malformed case number) are the only errors.
pub async fn enrich_case(
    State(state): State<AppState>,
    Path(case_number): Path<String>,
) -> ApiResult<Json<EnrichmentOutcome>> {
    let case = cases::get_case(&state.db, &case_number)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Case '{}' not found", case_number)))?;

    let outcome = state.router.route(&state.engine, &case).await?;

    if let EnrichmentOutcome::Failed { message } = &outcome {
        *state.last_error.write().await = Some(message.clone());
    }

    Ok(Json(outcome))
}

/// GET /enrichments/{case_number}
///
/// Current enrichment records for a case, one per registry attempted.
pub async fn get_case_enrichments(
    State(state): State<AppState>,
    Path(case_number): Path<String>,
) -> ApiResult<Json<Vec<EnrichmentRecord>>> {
    let records = enrichments::get_enrichments(&state.db, &case_number).await?;
    Ok(Json(records))
}

/// Build enrichment routes
pub fn enrich_routes() -> Router<AppState> {
    Router::new()
        .route("/enrich/:case_number", post(enrich_case))
        .route("/enrichments/:case_number", get(get_case_enrichments))
}
