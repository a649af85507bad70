//! caselink-en library interface
//!
//! Exposes the enrichment engine, registry adapters, and HTTP router for
//! integration testing and the service binary.

pub mod address;
pub mod api;
pub mod db;
pub mod enrich;
pub mod error;
pub mod registry;
pub mod resolver;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::enrich::{EnrichmentEngine, RegistryRouter};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Registry dispatch table
    pub router: Arc<RegistryRouter>,
    /// Shared enrichment engine (stateless across attempts)
    pub engine: Arc<EnrichmentEngine>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last enrichment failure message, for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(db: SqlitePool, router: RegistryRouter) -> Self {
        let engine = Arc::new(EnrichmentEngine::new(db.clone()));
        Self {
            db,
            router: Arc::new(router),
            engine,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::enrich_routes())
        .merge(api::review_routes())
        .merge(api::health_routes())
        .with_state(state)
}
