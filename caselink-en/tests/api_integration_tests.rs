//! Integration tests for caselink-en API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use async_trait::async_trait;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tower::util::ServiceExt;

use caselink_common::db::cases::{self, CaseRecord};
use caselink_en::enrich::{Registry, RegistryRouter};
use caselink_en::registry::{AddressQuery, AdapterError, SourceAdapter};
use caselink_en::resolver::Candidate;

/// Canned-response adapter; the tests never touch the network
struct StubAdapter {
    addr_response: Result<Vec<Candidate>, String>,
}

#[async_trait]
impl SourceAdapter for StubAdapter {
    fn name(&self) -> &'static str {
        "Stub"
    }

    async fn search_by_address(&self, _query: &AddressQuery) -> Result<Vec<Candidate>, AdapterError> {
        self.addr_response.clone().map_err(AdapterError::Transport)
    }
}

fn stub_record_url(id: &str) -> String {
    format!("https://registry.test/record/{}", id)
}

fn candidate(id: &str, house: &str, dir: Option<&str>, street: &str) -> Candidate {
    Candidate {
        external_id: id.to_string(),
        house_number: Some(house.to_string()),
        direction: dir.map(str::to_string),
        street_name: Some(street.to_string()),
        municipality: None,
        source_url: None,
    }
}

/// Test helper: create test app with in-memory database and a stub registry
/// wired to county code 999
async fn create_test_app(
    addr_response: Result<Vec<Candidate>, String>,
) -> (axum::Router, sqlx::SqlitePool) {
    let pool = sqlx::SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    caselink_common::db::init_tables(&pool)
        .await
        .expect("Failed to initialize shared tables");
    caselink_en::db::init_tables(&pool)
        .await
        .expect("Failed to initialize service tables");

    let registry = Registry {
        name: "Stub",
        county_code: "999",
        adapter: Arc::new(StubAdapter { addr_response }),
        parcel_format: None,
        record_url: stub_record_url,
        uses_municipality_hint: false,
    };
    let router = RegistryRouter::with_registries(vec![registry], HashMap::from([("350", "Franklin")]));

    let state = caselink_en::AppState::new(pool.clone(), router);
    let app = caselink_en::build_router(state);

    (app, pool)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("response body is JSON")
}

async fn seed_case(pool: &sqlx::SqlitePool, case_number: &str, address: &str) {
    cases::save_case(
        pool,
        &CaseRecord {
            case_number: case_number.to_string(),
            property_address: Some(address.to_string()),
            parcel_hint: None,
        },
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _pool) = create_test_app(Ok(vec![])).await;

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "caselink-en");
}

#[tokio::test]
async fn test_enrich_unknown_case_is_404() {
    let (app, _pool) = create_test_app(Ok(vec![])).await;

    let response = app
        .oneshot(
            Request::post("/enrich/24CV999999-999")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_enrich_unknown_registry_code_is_404() {
    let (app, pool) = create_test_app(Ok(vec![])).await;
    seed_case(&pool, "24CV000001-777", "414 S. Salem Street, Apex, NC 27502").await;

    let response = app
        .oneshot(
            Request::post("/enrich/24CV000001-777")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_enrich_unwired_registry_is_not_implemented_outcome() {
    let (app, pool) = create_test_app(Ok(vec![])).await;
    seed_case(&pool, "24CV000001-350", "414 S. Salem Street, Apex, NC 27502").await;

    let response = app
        .oneshot(
            Request::post("/enrich/24CV000001-350")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Not an error: a recognized registry without an adapter is a terminal,
    // non-retryable outcome
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["outcome"], "NotImplemented");
    assert_eq!(body["registry"], "Franklin");
}

#[tokio::test]
async fn test_enrich_resolves_and_persists() {
    let (app, pool) = create_test_app(Ok(vec![candidate(
        "0012345",
        "414",
        Some("S"),
        "SALEM",
    )]))
    .await;
    seed_case(&pool, "24CV000001-999", "414 S. Salem Street, Apex, NC 27502").await;

    let response = app
        .clone()
        .oneshot(
            Request::post("/enrich/24CV000001-999")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["outcome"], "Resolved");
    assert_eq!(body["external_id"], "0012345");
    assert_eq!(body["url"], "https://registry.test/record/0012345");

    let response = app
        .oneshot(
            Request::get("/enrichments/24CV000001-999")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let records = body_json(response).await;
    assert_eq!(records[0]["parcel_id"], "0012345");
    assert_eq!(records[0]["error"], Value::Null);
}

#[tokio::test]
async fn test_adapter_failure_is_failed_outcome() {
    let (app, pool) = create_test_app(Err("portal timeout".to_string())).await;
    seed_case(&pool, "24CV000002-999", "414 S. Salem Street, Apex, NC 27502").await;

    let response = app
        .clone()
        .oneshot(
            Request::post("/enrich/24CV000002-999")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Adapter failures are persisted and reported, never raised
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["outcome"], "Failed");

    let response = app
        .oneshot(
            Request::get("/enrichments/24CV000002-999")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let records = body_json(response).await;
    assert!(records[0]["error"].as_str().unwrap().contains("portal timeout"));
}

#[tokio::test]
async fn test_ambiguous_enrichment_review_lifecycle() {
    let (app, pool) = create_test_app(Ok(vec![
        candidate("A", "414", Some("S"), "SALEM"),
        candidate("B", "414", Some("S"), "SALEM"),
    ]))
    .await;
    seed_case(&pool, "24CV000003-999", "414 S. Salem Street, Apex, NC 27502").await;

    // Attempt: two agreeing candidates, queued for review
    let response = app
        .clone()
        .oneshot(
            Request::post("/enrich/24CV000003-999")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["outcome"], "NeedsReview");
    assert_eq!(body["reason"], "MultipleMatches");
    assert_eq!(body["match_count"], 2);
    let entry_id = body["entry_id"].as_str().unwrap().to_string();

    // Nothing persisted as an identifier yet
    let response = app
        .clone()
        .oneshot(
            Request::get("/enrichments/24CV000003-999")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let records = body_json(response).await;
    assert_eq!(records.as_array().unwrap().len(), 0);

    // Entry shows up in the pending queue with its evidence
    let response = app
        .clone()
        .oneshot(
            Request::get("/reviews/pending?registry=Stub")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let pending = body_json(response).await;
    assert_eq!(pending[0]["id"], entry_id.as_str());
    assert_eq!(pending[0]["evidence"]["matched"][0], "A");

    // Human picks candidate A
    let response = app
        .clone()
        .oneshot(
            Request::post(format!("/reviews/{}/resolve", entry_id))
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"parcel_id": "A", "notes": "tax card confirms candidate A"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let resolved = body_json(response).await;
    assert!(resolved["resolved_at"].is_string());

    // The chosen identifier is persisted like any Resolved outcome
    let response = app
        .clone()
        .oneshot(
            Request::get("/enrichments/24CV000003-999")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let records = body_json(response).await;
    assert_eq!(records[0]["parcel_id"], "A");
    assert_eq!(records[0]["parcel_url"], "https://registry.test/record/A");

    // Second resolution attempt is rejected
    let response = app
        .oneshot(
            Request::post(format!("/reviews/{}/resolve", entry_id))
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"parcel_id": "B", "notes": "changed my mind"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_review_resolved_without_enrichment() {
    let (app, pool) = create_test_app(Ok(vec![])).await;
    seed_case(&pool, "24CV000004-999", "414 S. Salem Street, Apex, NC 27502").await;

    let response = app
        .clone()
        .oneshot(
            Request::post("/enrich/24CV000004-999")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["outcome"], "NeedsReview");
    assert_eq!(body["reason"], "ZeroMatches");
    let entry_id = body["entry_id"].as_str().unwrap().to_string();

    // Reviewer determines no matching property exists
    let response = app
        .clone()
        .oneshot(
            Request::post(format!("/reviews/{}/resolve", entry_id))
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"notes": "property is outside the county"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Resolved review, still no enrichment record
    let response = app
        .oneshot(
            Request::get("/enrichments/24CV000004-999")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let records = body_json(response).await;
    assert_eq!(records.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_resolve_unknown_review_is_404() {
    let (app, _pool) = create_test_app(Ok(vec![])).await;

    let response = app
        .oneshot(
            Request::post(format!("/reviews/{}/resolve", uuid::Uuid::new_v4()))
                .header("content-type", "application/json")
                .body(Body::from(json!({"notes": "x"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
