//! Johnston County GIS parcel search client
//!
//! Address search only; the portal has no public identifier index, so the
//! engine never takes the parcel path for Johnston cases. Searches take
//! discrete house-number/street fields plus an optional municipality code,
//! which matters here: several street names repeat across the county's
//! towns and the code is what separates them.

use super::{
    build_http_client, get_with_retry, portal_rate_limiter, AddressQuery, AdapterError,
    PortalRateLimiter, SourceAdapter,
};
use crate::resolver::Candidate;
use async_trait::async_trait;
use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "https://gis.johnstonnc.com/parcels/api";

#[derive(Debug, Deserialize)]
struct JohnstonParcel {
    pin: String,
    #[serde(default)]
    house_no: Option<String>,
    #[serde(default)]
    street: Option<String>,
    #[serde(default)]
    township_code: Option<String>,
}

/// Johnston County portal client
pub struct JohnstonClient {
    client: reqwest::Client,
    base_url: String,
    rate_limiter: PortalRateLimiter,
}

impl JohnstonClient {
    pub fn new(base_url: Option<String>) -> Self {
        Self {
            client: build_http_client(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            rate_limiter: portal_rate_limiter(),
        }
    }
}

/// Public parcel page for a Johnston PIN
pub fn record_url(pin: &str) -> String {
    format!("https://gis.johnstonnc.com/parcels/detail?pin={}", pin)
}

#[async_trait]
impl SourceAdapter for JohnstonClient {
    fn name(&self) -> &'static str {
        "Johnston"
    }

    async fn search_by_address(&self, query: &AddressQuery) -> Result<Vec<Candidate>, AdapterError> {
        self.rate_limiter.until_ready().await;

        let mut url = format!(
            "{}/search?number={}&street={}",
            self.base_url,
            query.house_number,
            query.street_name.replace(' ', "+")
        );
        if let Some(code) = &query.municipality_code {
            url.push_str(&format!("&township={}", code));
        }
        tracing::debug!(query = %query.combined(), "Johnston address search");

        let response = get_with_retry(&self.client, &url).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::UnexpectedResponse(format!(
                "Johnston portal returned status {}",
                status
            )));
        }

        let parcels: Vec<JohnstonParcel> = response.json().await.map_err(|e| {
            AdapterError::UnexpectedResponse(format!("Johnston response parse: {}", e))
        })?;

        Ok(parcels
            .into_iter()
            .map(|p| Candidate {
                source_url: Some(record_url(&p.pin)),
                external_id: p.pin,
                house_number: p.house_no,
                direction: None,
                street_name: p.street,
                municipality: p.township_code,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_url() {
        assert_eq!(
            record_url("169400-55-1234"),
            "https://gis.johnstonnc.com/parcels/detail?pin=169400-55-1234"
        );
    }

    #[tokio::test]
    async fn test_identifier_search_unsupported() {
        let client = JohnstonClient::new(Some("http://localhost:9500".to_string()));
        let result = client.search_by_identifier("169400-55-1234").await;
        assert!(matches!(result, Err(AdapterError::IdentifierUnsupported("Johnston"))));
    }
}
