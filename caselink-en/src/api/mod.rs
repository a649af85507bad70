//! HTTP API handlers for caselink-en

pub mod enrich;
pub mod health;
pub mod reviews;

pub use enrich::enrich_routes;
pub use health::health_routes;
pub use reviews::review_routes;
