//! REST API routes
//!
//! ## Route Structure
//!
//! - `POST /v1/map/{map_name}/synchronize` - Synchronize a map from storage
//! - `GET /v1/map/{map_name}/generate` - Dump a live map as a manifest
//! - `POST /synchronize` - Legacy synchronization, map named in the body
//! - `GET /healthz`, `GET /readyz` - Probes
//! - `GET /metrics` - Prometheus counters

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

pub mod health;
pub mod maps;
pub mod metrics;

/// Create the API router without middleware.
pub fn create_router() -> Router<AppState> {
    let v1_routes = Router::new()
        .route("/map/{map_name}/synchronize", post(maps::synchronize))
        .route("/map/{map_name}/generate", get(maps::generate));

    Router::new()
        .nest("/v1", v1_routes)
        .route("/synchronize", post(maps::synchronize_legacy))
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/metrics", get(metrics::metrics_handler))
}
