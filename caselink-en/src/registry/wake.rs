//! Wake County real-estate portal client
//!
//! The portal exposes a JSON search endpoint over the tax office's account
//! records. Accounts are keyed by a seven-digit REID; the same records are
//! reachable by address search. Rate limit kept to one request per two
//! seconds; the office throttles aggressively during revaluation season.

use super::{
    build_http_client, get_with_retry, portal_rate_limiter, AddressQuery, AdapterError,
    PortalRateLimiter, SourceAdapter,
};
use crate::resolver::Candidate;
use async_trait::async_trait;
use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "https://services.wake.gov/realestate/api";

/// One account row from the portal's search response
#[derive(Debug, Deserialize)]
struct WakeAccountRow {
    reid: String,
    #[serde(default)]
    street_number: Option<String>,
    #[serde(default)]
    street_prefix: Option<String>,
    #[serde(default)]
    street_name: Option<String>,
    #[serde(default)]
    planning_jurisdiction: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WakeSearchResponse {
    #[serde(default)]
    accounts: Vec<WakeAccountRow>,
}

/// Wake County portal client
pub struct WakeClient {
    client: reqwest::Client,
    base_url: String,
    rate_limiter: PortalRateLimiter,
}

impl WakeClient {
    pub fn new(base_url: Option<String>) -> Self {
        Self {
            client: build_http_client(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            rate_limiter: portal_rate_limiter(),
        }
    }

    async fn search(&self, url: &str) -> Result<Vec<Candidate>, AdapterError> {
        self.rate_limiter.until_ready().await;

        let response = get_with_retry(&self.client, url).await?;

        let status = response.status();
        if status == 404 {
            // The portal answers 404 for an unknown REID; that is "no
            // results", not a failure
            return Ok(vec![]);
        }
        if !status.is_success() {
            return Err(AdapterError::UnexpectedResponse(format!(
                "Wake portal returned status {}",
                status
            )));
        }

        let body: WakeSearchResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::UnexpectedResponse(format!("Wake response parse: {}", e)))?;

        Ok(body.accounts.into_iter().map(row_to_candidate).collect())
    }
}

fn row_to_candidate(row: WakeAccountRow) -> Candidate {
    let url = record_url(&row.reid);
    Candidate {
        external_id: row.reid,
        house_number: row.street_number,
        direction: row.street_prefix,
        street_name: row.street_name,
        municipality: row.planning_jurisdiction,
        source_url: Some(url),
    }
}

/// Public account page for a Wake REID
pub fn record_url(reid: &str) -> String {
    format!("https://services.wake.gov/realestate/Account.asp?id={}", reid)
}

#[async_trait]
impl SourceAdapter for WakeClient {
    fn name(&self) -> &'static str {
        "Wake"
    }

    async fn search_by_identifier(&self, id: &str) -> Result<Vec<Candidate>, AdapterError> {
        let url = format!("{}/accounts/{}", self.base_url, id);
        tracing::debug!(reid = id, "Wake REID lookup");
        self.search(&url).await
    }

    async fn search_by_address(&self, query: &AddressQuery) -> Result<Vec<Candidate>, AdapterError> {
        // Single address box; the portal tokenizes "number directional name"
        let url = format!(
            "{}/accounts?address={}",
            self.base_url,
            urlencode(&query.combined())
        );
        tracing::debug!(query = %query.combined(), "Wake address search");
        self.search(&url).await
    }
}

/// Percent-encode the characters that actually occur in address queries
fn urlencode(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            ' ' => "+".to_string(),
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '.' | '_' => c.to_string(),
            other => format!("%{:02X}", other as u32),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_url() {
        assert_eq!(
            record_url("0012345"),
            "https://services.wake.gov/realestate/Account.asp?id=0012345"
        );
    }

    #[test]
    fn test_urlencode() {
        assert_eq!(urlencode("414 S SALEM"), "414+S+SALEM");
        assert_eq!(urlencode("O'NEAL"), "O%27NEAL");
    }

    #[test]
    fn test_row_to_candidate() {
        let row = WakeAccountRow {
            reid: "0012345".to_string(),
            street_number: Some("414".to_string()),
            street_prefix: Some("S".to_string()),
            street_name: Some("SALEM".to_string()),
            planning_jurisdiction: Some("APE".to_string()),
        };
        let candidate = row_to_candidate(row);
        assert_eq!(candidate.external_id, "0012345");
        assert_eq!(candidate.house_number.as_deref(), Some("414"));
        assert!(candidate.source_url.unwrap().contains("0012345"));
    }

    #[test]
    fn test_base_url_override() {
        let client = WakeClient::new(Some("http://localhost:9910".to_string()));
        assert_eq!(client.base_url, "http://localhost:9910");

        let default = WakeClient::new(None);
        assert!(default.base_url.contains("wake.gov"));
    }
}
