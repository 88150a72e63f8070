//! Map endpoints:
//! POST /v1/map/{map_name}/synchronize, GET /v1/map/{map_name}/generate,
//! and the legacy POST /synchronize

use axum::{
    extract::{Path, State, rejection::JsonRejection},
    response::Json,
};
use mapsync_reconciler::{EntrySet, SourceSelector, SyncReport, SyncRequest};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::state::AppState;

/// Request payload for a synchronization of the map named in the path.
///
/// `bucket_file_name` may be `"*"` to merge every JSON object of the bucket.
#[derive(Debug, Deserialize)]
pub struct SynchronizeRequest {
    #[serde(default)]
    bucket_name: String,
    #[serde(default)]
    bucket_file_name: String,
}

/// Request payload of the legacy route, which names the map in the body.
#[derive(Debug, Deserialize)]
pub struct LegacySynchronizeRequest {
    #[serde(default)]
    map_name: String,
    #[serde(default)]
    bucket_name: String,
    #[serde(default)]
    bucket_file_name: String,
}

/// Response for a successful synchronization
#[derive(Debug, Serialize)]
pub struct SynchronizeResponse {
    status: &'static str,
    created: usize,
    updated: usize,
    deleted: usize,
}

impl From<SyncReport> for SynchronizeResponse {
    fn from(report: SyncReport) -> Self {
        Self {
            status: "synchronization success.",
            created: report.created,
            updated: report.updated,
            deleted: report.deleted,
        }
    }
}

/// POST /v1/map/{map_name}/synchronize - Converge a map towards its manifests
pub async fn synchronize(
    State(state): State<AppState>,
    Path(map_name): Path<String>,
    body: std::result::Result<Json<SynchronizeRequest>, JsonRejection>,
) -> Result<Json<SynchronizeResponse>> {
    let Json(req) = body?;
    let request = SyncRequest::new(
        map_name,
        SourceSelector::named(req.bucket_name, req.bucket_file_name),
    );
    run(&state, &request).await
}

/// POST /synchronize - Legacy synchronization route
pub async fn synchronize_legacy(
    State(state): State<AppState>,
    body: std::result::Result<Json<LegacySynchronizeRequest>, JsonRejection>,
) -> Result<Json<SynchronizeResponse>> {
    let Json(req) = body?;
    let request = SyncRequest::new(
        req.map_name,
        SourceSelector::named(req.bucket_name, req.bucket_file_name),
    );
    run(&state, &request).await
}

async fn run(state: &AppState, request: &SyncRequest) -> Result<Json<SynchronizeResponse>> {
    info!(
        map_name = %request.table,
        bucket = %request.selector.source,
        object = %request.selector.name,
        "Synchronization requested"
    );
    let report = state.reconciler.synchronize(request).await?;
    Ok(Json(report.into()))
}

/// GET /v1/map/{map_name}/generate - Dump the live map as a manifest
pub async fn generate(
    State(state): State<AppState>,
    Path(map_name): Path<String>,
) -> Result<Json<EntrySet>> {
    let entries = state.reconciler.export(&map_name).await?;
    Ok(Json(entries))
}
