//! Prometheus scrape endpoint: GET /metrics

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
};

use crate::state::AppState;

/// GET /metrics - Prometheus text exposition
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.metrics.render(),
    )
}
