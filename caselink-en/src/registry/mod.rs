//! Registry source adapters
//!
//! One adapter per county portal. Each adapter is an interchangeable
//! one-off: it knows how to query its portal and turn raw result rows into
//! `Candidate` values, nothing more. Fetch/parse mechanics are expected to
//! break and be patched independently whenever a portal changes; the
//! enrichment engine only sees the uniform `SourceAdapter` contract.

pub mod durham;
pub mod johnston;
pub mod wake;

use crate::address::NormalizedAddress;
use crate::resolver::Candidate;
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use std::time::Duration;
use thiserror::Error;

/// Direct (un-keyed) rate limiter, one per portal client
pub type PortalRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Transport-level or markup-level failure from a portal
///
/// "No results" is never an error; adapters return an empty candidate list
/// for that. Errors here mean the lookup itself was unusable.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Portal request failed: {0}")]
    Transport(String),

    #[error("Unexpected response from portal: {0}")]
    UnexpectedResponse(String),

    #[error("Identifier search not supported by {0}")]
    IdentifierUnsupported(&'static str),
}

/// Adapter-facing projection of a normalized address
#[derive(Debug, Clone)]
pub struct AddressQuery {
    pub house_number: String,
    pub direction_prefix: Option<String>,
    pub street_name: String,
    /// Jurisdiction hint for portals that index by municipality
    pub municipality_code: Option<String>,
}

impl AddressQuery {
    /// Build a query from a normalized address; `None` when the mandatory
    /// fields (house number, street name) are absent
    pub fn from_normalized(
        addr: &NormalizedAddress,
        municipality_code: Option<String>,
    ) -> Option<Self> {
        Some(Self {
            house_number: addr.house_number.clone()?,
            direction_prefix: addr.direction_prefix.clone(),
            street_name: addr.street_name.clone()?,
            municipality_code,
        })
    }

    /// Combined "number directional name" search string, the form most
    /// portals accept in a single address box
    pub fn combined(&self) -> String {
        match &self.direction_prefix {
            Some(dir) => format!("{} {} {}", self.house_number, dir, self.street_name),
            None => format!("{} {}", self.house_number, self.street_name),
        }
    }
}

/// Uniform search contract over the county portals
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Registry name for logging and review entries
    fn name(&self) -> &'static str;

    /// Search by the registry's structured identifier (account/parcel id).
    ///
    /// Portals without an identifier index keep the default.
    async fn search_by_identifier(&self, _id: &str) -> Result<Vec<Candidate>, AdapterError> {
        Err(AdapterError::IdentifierUnsupported(self.name()))
    }

    /// Search by address fields. Empty vec means no results.
    async fn search_by_address(&self, query: &AddressQuery) -> Result<Vec<Candidate>, AdapterError>;
}

/// Shared HTTP client construction: explicit timeouts, standard user-agent
pub(crate) fn build_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(caselink_common::config::get_user_agent())
        .build()
        .expect("Failed to build HTTP client")
}

/// Shared portal rate limit: one request per two seconds
pub(crate) fn portal_rate_limiter() -> PortalRateLimiter {
    RateLimiter::direct(
        Quota::with_period(Duration::from_secs(2)).expect("non-zero rate limit period"),
    )
}

/// GET with one bounded retry on transient transport failure
///
/// A single retry after a fixed backoff covers the connection resets these
/// portals produce under load; anything beyond that is the caller's problem
/// (the engine persists the failure and a re-run picks it up).
pub(crate) async fn get_with_retry(
    client: &reqwest::Client,
    url: &str,
) -> Result<reqwest::Response, AdapterError> {
    match client.get(url).send().await {
        Ok(response) => Ok(response),
        Err(first) => {
            tracing::warn!(url, error = %first, "Portal request failed, retrying once");
            tokio::time::sleep(Duration::from_millis(500)).await;
            client
                .get(url)
                .send()
                .await
                .map_err(|e| AdapterError::Transport(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::normalize;

    #[test]
    fn test_address_query_requires_mandatory_fields() {
        let addr = normalize("Salem Street, Apex, NC 27502");
        assert!(AddressQuery::from_normalized(&addr, None).is_none());

        let addr = normalize("414 S. Salem Street, Apex, NC 27502");
        let query = AddressQuery::from_normalized(&addr, None).unwrap();
        assert_eq!(query.house_number, "414");
        assert_eq!(query.street_name, "SALEM");
    }

    #[test]
    fn test_combined_query_string() {
        let addr = normalize("414 S. Salem Street, Apex, NC 27502");
        let query = AddressQuery::from_normalized(&addr, None).unwrap();
        assert_eq!(query.combined(), "414 S SALEM");

        let addr = normalize("25 Buckhorn Lane, Garner, NC 27529");
        let query = AddressQuery::from_normalized(&addr, None).unwrap();
        assert_eq!(query.combined(), "25 BUCKHORN");
    }
}
