//! Registry routing
//!
//! Maps a case to the one registry relevant to it, by the county code
//! embedded in the case number's trailing segment, and dispatches to the
//! shared engine. A recognized county with no adapter wired up is a
//! non-retryable `NotImplemented` outcome, not an error.

use crate::enrich::engine::{EnrichmentEngine, Registry};
use crate::enrich::EnrichmentOutcome;
use crate::registry::{durham, johnston, wake};
use crate::registry::durham::DurhamClient;
use crate::registry::johnston::JohnstonClient;
use crate::registry::wake::WakeClient;
use caselink_common::config::RegistryUrls;
use caselink_common::db::cases::CaseRecord;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Routing-level failures; unlike parse/adapter failures these surface to
/// the caller, because the case cannot be processed at all
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("Case number '{0}' has no county code suffix")]
    MissingCountyCode(String),

    #[error("Unknown registry code '{0}'")]
    UnknownRegistry(String),

    #[error(transparent)]
    Store(#[from] caselink_common::Error),
}

/// The set of wired-up registries plus the recognized-but-unwired ones
pub struct RegistryRouter {
    registries: Vec<Registry>,
    /// County code to registry name, for counties we recognize but have no
    /// adapter for yet
    recognized_unwired: HashMap<&'static str, &'static str>,
}

impl RegistryRouter {
    /// Build the production registry set, applying any base-URL overrides
    pub fn from_config(urls: &RegistryUrls) -> Self {
        let registries = vec![
            Registry {
                name: "Wake",
                county_code: "910",
                adapter: Arc::new(WakeClient::new(urls.wake.clone())),
                parcel_format: Some(Regex::new(r"^\d{7}$").expect("valid regex")),
                record_url: wake::record_url,
                uses_municipality_hint: false,
            },
            Registry {
                name: "Durham",
                county_code: "310",
                adapter: Arc::new(DurhamClient::new(urls.durham.clone())),
                parcel_format: Some(Regex::new(r"^\d{6}$").expect("valid regex")),
                record_url: durham::record_url,
                uses_municipality_hint: false,
            },
            Registry {
                name: "Johnston",
                county_code: "500",
                adapter: Arc::new(JohnstonClient::new(urls.johnston.clone())),
                // No public identifier index; address path only
                parcel_format: None,
                record_url: johnston::record_url,
                uses_municipality_hint: true,
            },
        ];

        Self {
            registries,
            recognized_unwired: HashMap::from([("350", "Franklin")]),
        }
    }

    /// Build a router over an explicit registry set (tests, backfills)
    pub fn with_registries(
        registries: Vec<Registry>,
        recognized_unwired: HashMap<&'static str, &'static str>,
    ) -> Self {
        Self {
            registries,
            recognized_unwired,
        }
    }

    pub fn registry_by_code(&self, code: &str) -> Option<&Registry> {
        self.registries.iter().find(|r| r.county_code == code)
    }

    pub fn registry_by_name(&self, name: &str) -> Option<&Registry> {
        self.registries.iter().find(|r| r.name == name)
    }

    /// Dispatch one case to its registry's engine
    pub async fn route(
        &self,
        engine: &EnrichmentEngine,
        case: &CaseRecord,
    ) -> Result<EnrichmentOutcome, RouteError> {
        let code = case
            .county_code()
            .ok_or_else(|| RouteError::MissingCountyCode(case.case_number.clone()))?;

        if let Some(registry) = self.registry_by_code(code) {
            return Ok(engine.enrich(registry, case).await?);
        }

        if let Some(name) = self.recognized_unwired.get(code) {
            tracing::info!(
                case_id = %case.case_number,
                registry = name,
                "Registry recognized but not wired up"
            );
            return Ok(EnrichmentOutcome::NotImplemented {
                registry: (*name).to_string(),
            });
        }

        Err(RouteError::UnknownRegistry(code.to_string()))
    }
}
