//! HTTP API handlers for stak-enrich

pub mod enrichment;
pub mod health;
pub mod matches;
pub mod profiles;

pub use enrichment::enrichment_routes;
pub use health::health_routes;
pub use matches::match_routes;
pub use profiles::profile_routes;
