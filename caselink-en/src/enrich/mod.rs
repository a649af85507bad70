//! Enrichment orchestration
//!
//! Composes address normalization, registry search, and match resolution
//! into one attempt per case, ending in exactly one of three terminal
//! outcomes. One parameterized engine serves every registry; per-county
//! variation lives in the `Registry` descriptor and its adapter.

pub mod engine;
pub mod router;

pub use engine::{EnrichmentEngine, Registry};
pub use router::{RegistryRouter, RouteError};

use crate::resolver::AmbiguityReason;
use serde::Serialize;
use uuid::Uuid;

/// Terminal state of one enrichment attempt
///
/// Closed set, never partially populated. `NotImplemented` is produced only
/// by the router, for a recognized registry with no adapter wired up; it is
/// a non-retryable signal, not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome")]
pub enum EnrichmentOutcome {
    /// Exactly one registry record matched; identifier and URL persisted
    Resolved { external_id: String, url: String },
    /// Zero or multiple matches; queued for human review, nothing persisted
    /// as an identifier
    NeedsReview {
        reason: AmbiguityReason,
        match_count: usize,
        entry_id: Uuid,
    },
    /// Parse or adapter failure; error message persisted
    Failed { message: String },
    /// Registry recognized but not wired up
    NotImplemented { registry: String },
}
