//! Durham County tax-record portal client
//!
//! Older portal: the export endpoint answers pipe-delimited text rows
//! rather than JSON, one parcel per line. Supports both parcel-number and
//! address search. The line format has been stable for years, but when it
//! does change this parser is the only thing that needs patching.

use super::{
    build_http_client, get_with_retry, portal_rate_limiter, AddressQuery, AdapterError,
    PortalRateLimiter, SourceAdapter,
};
use crate::resolver::Candidate;
use async_trait::async_trait;

const DEFAULT_BASE_URL: &str = "https://taxcama.dconc.gov/camapwa/export.cgi";

/// Durham County portal client
pub struct DurhamClient {
    client: reqwest::Client,
    base_url: String,
    rate_limiter: PortalRateLimiter,
}

impl DurhamClient {
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
        if !status.is_success() {
            return Err(AdapterError::UnexpectedResponse(format!(
                "Durham portal returned status {}",
                status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AdapterError::Transport(e.to_string()))?;

        parse_rows(&body)
    }
}

/// Parse the export body: header line, then `parcel|number|dir|street|city`
/// rows. Blank lines are tolerated; a row with the wrong column count means
/// the portal changed underneath us and the whole response is unusable.
fn parse_rows(body: &str) -> Result<Vec<Candidate>, AdapterError> {
    let mut candidates = Vec::new();

    for line in body.lines().skip(1) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('|').collect();
        let &[parcel, number, dir, street, _city] = fields.as_slice() else {
            return Err(AdapterError::UnexpectedResponse(format!(
                "Durham export row has {} fields, expected 5",
                fields.len()
            )));
        };

        let parcel = parcel.trim().to_string();
        candidates.push(Candidate {
            source_url: Some(record_url(&parcel)),
            external_id: parcel,
            house_number: non_empty(number),
            direction: Some(dir.trim().to_string()),
            street_name: non_empty(street),
            municipality: None,
        });
    }

    Ok(candidates)
}

fn non_empty(field: &str) -> Option<String> {
    let trimmed = field.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Public record page for a Durham parcel number
pub fn record_url(parcel: &str) -> String {
    format!("https://taxcama.dconc.gov/camapwa/PropertySummary.aspx?parcel={}", parcel)
}

#[async_trait]
impl SourceAdapter for DurhamClient {
    fn name(&self) -> &'static str {
        "Durham"
    }

    async fn search_by_identifier(&self, id: &str) -> Result<Vec<Candidate>, AdapterError> {
        let url = format!("{}?mode=parcel&q={}", self.base_url, id);
        tracing::debug!(parcel = id, "Durham parcel lookup");
        self.search(&url).await
    }

    async fn search_by_address(&self, query: &AddressQuery) -> Result<Vec<Candidate>, AdapterError> {
        let url = format!(
            "{}?mode=address&number={}&street={}",
            self.base_url,
            query.house_number,
            query.street_name.replace(' ', "+")
        );
        tracing::debug!(query = %query.combined(), "Durham address search");
        self.search(&url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rows() {
        let body = "PARCEL|NUMBER|DIR|STREET|CITY\n\
                    100234|414|S|SALEM|DURHAM\n\
                    \n\
                    100567|414||SALEM|DURHAM\n";
        let candidates = parse_rows(body).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].external_id, "100234");
        assert_eq!(candidates[0].direction.as_deref(), Some("S"));
        assert_eq!(candidates[1].direction.as_deref(), Some(""));
        assert_eq!(candidates[1].street_name.as_deref(), Some("SALEM"));
        assert!(candidates[0].source_url.as_deref().unwrap().contains("100234"));
    }

    #[test]
    fn test_parse_rows_header_only_is_empty() {
        let candidates = parse_rows("PARCEL|NUMBER|DIR|STREET|CITY\n").unwrap();
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_parse_rows_bad_column_count_is_error() {
        let body = "PARCEL|NUMBER|DIR|STREET|CITY\n100234|414|S\n";
        let result = parse_rows(body);
        assert!(matches!(result, Err(AdapterError::UnexpectedResponse(_))));
    }
}
