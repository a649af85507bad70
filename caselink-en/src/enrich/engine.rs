//! Per-attempt enrichment state machine
//!
//! Each attempt walks Start -> AddressParsed -> Searched -> terminal,
//! holding no state between calls; re-running a case overwrites the prior
//! persisted attempt. Key policy: when a registry supports a structured
//! parcel identifier, that stronger key is tried first, and an ambiguous
//! answer from it is FINAL. The address path runs only when the parcel path
//! is unavailable or outright failed; a weak key coincidentally returning a
//! single match must never mask ambiguity from a strong key.

use crate::address::{self, NormalizedAddress};
use crate::db::{enrichments, reviews};
use crate::db::reviews::{ReviewError, ReviewLogEntry, SearchMethod};
use crate::enrich::router::RegistryRouter;
use crate::enrich::EnrichmentOutcome;
use crate::registry::{AddressQuery, SourceAdapter};
use crate::resolver::{self, AmbiguityReason, Candidate, MatchHints, MatchResult};
use caselink_common::db::cases::CaseRecord;
use caselink_common::{Error, Result};
use regex::Regex;
use serde_json::json;
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

/// Everything registry-specific the engine needs, as a value object
pub struct Registry {
    pub name: &'static str,
    /// County code embedded in case numbers for this registry
    pub county_code: &'static str,
    pub adapter: Arc<dyn SourceAdapter>,
    /// Format of the registry's structured identifier; `None` means the
    /// registry has no identifier index and only the address path runs
    pub parcel_format: Option<Regex>,
    /// Identifier to public record URL
    pub record_url: fn(&str) -> String,
    /// Whether address searches should carry the city-derived municipality
    /// code hint
    pub uses_municipality_hint: bool,
}

/// The per-registry enrichment orchestrator
///
/// Stateless across calls; owns only the pool handle it persists through.
pub struct EnrichmentEngine {
    db: SqlitePool,
}

impl EnrichmentEngine {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Run one enrichment attempt for a case against one registry
    ///
    /// Parse and adapter failures are converted to a persisted `Failed`
    /// outcome here, never raised; only store-level errors propagate.
    pub async fn enrich(&self, registry: &Registry, case: &CaseRecord) -> Result<EnrichmentOutcome> {
        tracing::info!(
            case_id = %case.case_number,
            registry = registry.name,
            "Starting enrichment attempt"
        );

        // Strongest key first
        if let (Some(format), Some(hint)) = (&registry.parcel_format, case.parcel_hint.as_deref()) {
            if format.is_match(hint) {
                match registry.adapter.search_by_identifier(hint).await {
                    // Whatever the candidate count, the strong key's answer
                    // is final; ambiguity here never falls through
                    Ok(candidates) => {
                        return self.conclude_parcel(registry, case, hint, candidates).await;
                    }
                    Err(e) => {
                        tracing::warn!(
                            case_id = %case.case_number,
                            registry = registry.name,
                            error = %e,
                            "Parcel lookup unusable, falling back to address search"
                        );
                    }
                }
            } else {
                tracing::debug!(
                    case_id = %case.case_number,
                    hint,
                    "Parcel hint does not match registry format, using address path"
                );
            }
        }

        self.enrich_by_address(registry, case).await
    }

    /// Terminal handling for the parcel-identifier path
    async fn conclude_parcel(
        &self,
        registry: &Registry,
        case: &CaseRecord,
        parcel_hint: &str,
        candidates: Vec<Candidate>,
    ) -> Result<EnrichmentOutcome> {
        if let [only] = candidates.as_slice() {
            return self.conclude_resolved(registry, case, only).await;
        }

        let match_count = candidates.len();
        let reason = if candidates.is_empty() {
            AmbiguityReason::ZeroMatches
        } else {
            AmbiguityReason::MultipleMatches
        };
        let evidence = json!({
            "parcel_id": parcel_hint,
            "candidates": &candidates,
        });
        let entry_id = self
            .queue_review(
                case,
                registry,
                SearchMethod::ParcelId,
                parcel_hint,
                match_count,
                &evidence,
            )
            .await?;

        Ok(EnrichmentOutcome::NeedsReview {
            reason,
            match_count,
            entry_id,
        })
    }

    /// Address path: Start -> AddressParsed -> Searched -> terminal
    async fn enrich_by_address(
        &self,
        registry: &Registry,
        case: &CaseRecord,
    ) -> Result<EnrichmentOutcome> {
        let Some(raw) = case
            .property_address
            .as_deref()
            .filter(|s| !s.trim().is_empty())
        else {
            return self
                .conclude_failed(
                    registry,
                    case,
                    "Case has no property address and no usable parcel identifier".to_string(),
                )
                .await;
        };

        let addr = address::normalize(raw);
        if !addr.is_searchable() {
            return self
                .conclude_failed(
                    registry,
                    case,
                    format!("Address '{}' is missing a house number or street name", raw),
                )
                .await;
        }

        let hints = MatchHints {
            municipality_code: self.municipality_hint(registry, &addr),
        };
        let Some(query) = AddressQuery::from_normalized(&addr, hints.municipality_code.clone())
        else {
            // is_searchable held above, so this cannot happen; fail loudly
            // rather than unwrap in a non-test path
            return self
                .conclude_failed(registry, case, "Address query construction failed".to_string())
                .await;
        };

        let candidates = match registry.adapter.search_by_address(&query).await {
            Ok(candidates) => candidates,
            Err(e) => return self.conclude_failed(registry, case, e.to_string()).await,
        };

        tracing::debug!(
            case_id = %case.case_number,
            registry = registry.name,
            candidates = candidates.len(),
            "Registry search complete"
        );

        match resolver::resolve(&candidates, &addr, &hints) {
            MatchResult::Unique(candidate) => {
                let candidate = candidate.clone();
                self.conclude_resolved(registry, case, &candidate).await
            }
            MatchResult::Ambiguous { reason, matched } => {
                let match_count = matched.len();
                let matched_ids: Vec<&str> =
                    matched.iter().map(|c| c.external_id.as_str()).collect();
                let evidence = evidence_dump(&addr, &candidates, &matched_ids);
                let entry_id = self
                    .queue_review(
                        case,
                        registry,
                        SearchMethod::Address,
                        &query.combined(),
                        match_count,
                        &evidence,
                    )
                    .await?;

                Ok(EnrichmentOutcome::NeedsReview {
                    reason,
                    match_count,
                    entry_id,
                })
            }
        }
    }

    /// Resolve a review entry, single-shot, optionally persisting a chosen
    /// identifier the same way a Resolved outcome would
    ///
    /// Supplying no identifier records "reviewed, no enrichment" (e.g. the
    /// reviewer determined no matching property exists).
    pub async fn resolve_review(
        &self,
        router: &RegistryRouter,
        entry_id: Uuid,
        chosen_parcel: Option<&str>,
        notes: &str,
    ) -> std::result::Result<ReviewLogEntry, ReviewError> {
        // Validate the registry before mutating anything; the single-shot
        // guard in mark_resolved still decides races
        let record_url = match chosen_parcel {
            Some(_) => {
                let entry = reviews::get_review(&self.db, entry_id)
                    .await?
                    .ok_or(ReviewError::NotFound(entry_id))?;
                let registry = router
                    .registry_by_name(&entry.registry)
                    .ok_or_else(|| ReviewError::UnknownRegistry(entry.registry.clone()))?;
                Some(registry.record_url)
            }
            None => None,
        };

        let entry = reviews::mark_resolved(&self.db, entry_id, notes).await?;

        if let (Some(parcel), Some(record_url)) = (chosen_parcel, record_url) {
            let url = record_url(parcel);
            enrichments::save_resolved(&self.db, &entry.case_id, &entry.registry, parcel, &url)
                .await?;
            tracing::info!(
                entry_id = %entry_id,
                case_id = %entry.case_id,
                parcel_id = parcel,
                "Review resolved with enrichment"
            );
        } else {
            tracing::info!(entry_id = %entry_id, "Review resolved without enrichment");
        }

        Ok(entry)
    }

    fn municipality_hint(&self, registry: &Registry, addr: &NormalizedAddress) -> Option<String> {
        if !registry.uses_municipality_hint {
            return None;
        }
        addr.city
            .as_deref()
            .and_then(address::municipality_code)
            .map(str::to_string)
    }

    async fn conclude_resolved(
        &self,
        registry: &Registry,
        case: &CaseRecord,
        candidate: &Candidate,
    ) -> Result<EnrichmentOutcome> {
        let url = candidate
            .source_url
            .clone()
            .unwrap_or_else(|| (registry.record_url)(&candidate.external_id));

        enrichments::save_resolved(
            &self.db,
            &case.case_number,
            registry.name,
            &candidate.external_id,
            &url,
        )
        .await?;

        Ok(EnrichmentOutcome::Resolved {
            external_id: candidate.external_id.clone(),
            url,
        })
    }

    async fn conclude_failed(
        &self,
        registry: &Registry,
        case: &CaseRecord,
        message: String,
    ) -> Result<EnrichmentOutcome> {
        enrichments::save_failed(&self.db, &case.case_number, registry.name, &message).await?;
        Ok(EnrichmentOutcome::Failed { message })
    }

    async fn queue_review(
        &self,
        case: &CaseRecord,
        registry: &Registry,
        method: SearchMethod,
        search_value: &str,
        match_count: usize,
        evidence: &serde_json::Value,
    ) -> Result<Uuid> {
        reviews::log_review(
            &self.db,
            &case.case_number,
            registry.name,
            method,
            search_value,
            match_count,
            evidence,
        )
        .await
        .map_err(review_store_err)
    }
}

/// Structured dump of the query and candidate set for later human review
fn evidence_dump(
    query: &NormalizedAddress,
    candidates: &[Candidate],
    matched_ids: &[&str],
) -> serde_json::Value {
    json!({
        "query": query,
        "candidates": candidates,
        "matched": matched_ids,
    })
}

fn review_store_err(e: ReviewError) -> Error {
    match e {
        ReviewError::Database(e) => Error::Database(e),
        ReviewError::Store(e) => e,
        other => Error::Internal(other.to_string()),
    }
}
