//! Error handling with RFC 7807 Problem Details for JSON responses

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use mapsync_reconciler::SyncReport;
use serde::Serialize;

pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    /// A synchronization stopped on a failing entry call.
    #[error("Synchronization aborted: {report}")]
    Aborted {
        status: StatusCode,
        report: Box<SyncReport>,
    },
}

impl AppError {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Aborted { status, .. } => *status,
        }
    }
}

impl From<mapsync_reconciler::Error> for AppError {
    fn from(err: mapsync_reconciler::Error) -> Self {
        use mapsync_reconciler::Error;

        let not_found = err.is_not_found();
        match err {
            Error::Validation(e) => Self::BadRequest(e.to_string()),
            Error::Apply(report) => Self::Aborted {
                status: if not_found {
                    StatusCode::NOT_FOUND
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                },
                report,
            },
            other if not_found => Self::NotFound(other.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(format!(
            "Error reading JSON request body: {}",
            rejection.body_text()
        ))
    }
}

/// RFC 7807 Problem Details for HTTP APIs
#[derive(Serialize)]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    problem_type: Option<String>,
    title: String,
    status: u16,
    detail: String,
    /// What an aborted synchronization applied before stopping.
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<SyncReport>,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            problem_type: None,
            title: title.into(),
            status: status.as_u16(),
            detail: detail.into(),
            report: None,
        }
    }

    pub fn from_error(err: &AppError) -> Self {
        let status = err.status_code();
        let title = status
            .canonical_reason()
            .map_or_else(|| "Error".to_string(), str::to_string);

        let mut response = Self::new(status, title, err.to_string());
        if let AppError::Aborted { report, .. } = err {
            response.report = Some(report.as_ref().clone());
        }
        response
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let response = ErrorResponse::from_error(&self);
        (status, Json(response)).into_response()
    }
}
