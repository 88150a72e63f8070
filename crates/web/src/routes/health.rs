//! Probe endpoints: GET /healthz, GET /readyz

use axum::response::Json;

/// GET /healthz - Liveness probe
pub async fn healthz() -> Json<&'static str> {
    Json("OK")
}

/// GET /readyz - Readiness probe
pub async fn readyz() -> Json<&'static str> {
    Json("OK")
}
