//! Review queue endpoints

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::reviews::{self, ReviewLogEntry};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PendingQuery {
    pub registry: Option<String>,
    pub limit: Option<i64>,
}

/// GET /reviews/pending?registry=&limit=
pub async fn pending_reviews(
    State(state): State<AppState>,
    Query(params): Query<PendingQuery>,
) -> ApiResult<Json<Vec<ReviewLogEntry>>> {
    let limit = params.limit.unwrap_or(50).clamp(1, 500);
    let entries =
        reviews::get_pending_reviews(&state.db, params.registry.as_deref(), limit).await?;
    Ok(Json(entries))
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    /// Chosen registry identifier; omit to record "reviewed, no enrichment"
    pub parcel_id: Option<String>,
    pub notes: String,
}

/// POST /reviews/{id}/resolve
///
/// Single-shot: a second resolution attempt answers 409.
pub async fn resolve_review(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ResolveRequest>,
) -> ApiResult<Json<ReviewLogEntry>> {
    let entry = state
        .engine
        .resolve_review(
            &state.router,
            id,
            request.parcel_id.as_deref(),
            &request.notes,
        )
        .await?;
    Ok(Json(entry))
}

/// Build review queue routes
pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/reviews/pending", get(pending_reviews))
        .route("/reviews/:id/resolve", post(resolve_review))
}
