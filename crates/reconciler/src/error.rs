//! Error types for the reconciler crate.

use thiserror::Error;

use crate::types::SyncReport;

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Request-level validation failures. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required request field was empty.
    #[error("field '{field}' is required and cannot be empty")]
    EmptyField { field: &'static str },

    /// The resolved desired state declares the same key twice.
    #[error("desired state contains duplicate key '{key}'")]
    DuplicateKey { key: String },
}

/// Failures of the desired-state source (listing, download, parsing).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The source collection could not be listed.
    #[error("failed to list source '{source_id}': {reason}")]
    List { source_id: String, reason: String },

    /// A single resource could not be downloaded.
    #[error("failed to fetch '{name}' from source '{source_id}': {reason}")]
    Fetch {
        source_id: String,
        name: String,
        reason: String,
    },

    /// A resource was downloaded but is not a valid entry manifest.
    #[error("'{name}' is not a valid entry manifest: {reason}")]
    Format { name: String, reason: String },
}

/// Failures of a call against the live table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The table or entry does not exist.
    #[error("resource not found: {resource}")]
    NotFound { resource: String },

    /// The remote store answered with a non-success status.
    #[error("remote store returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// The remote store could not be reached.
    #[error("transport error: {reason}")]
    Transport { reason: String },

    /// The remote store answered with a body that could not be interpreted.
    #[error("invalid payload: {reason}")]
    InvalidPayload { reason: String },
}

/// Reconciler error types.
#[derive(Debug, Error)]
pub enum Error {
    /// The request or the resolved desired state is invalid.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The desired state could not be resolved.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The actual state could not be read.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The apply loop aborted; the report holds what was applied before the failure.
    #[error("{0}")]
    Apply(Box<SyncReport>),

    /// Invalid reconciler configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl Error {
    /// Create an invalid config error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Whether the caller sent a request that can never succeed as-is.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Whether the failure was a lookup against a missing table or entry.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Store(StoreError::NotFound { .. }) => true,
            Self::Apply(report) => report
                .failure
                .as_ref()
                .is_some_and(|f| matches!(f.error, StoreError::NotFound { .. })),
            _ => false,
        }
    }

    /// The partial report of an aborted apply loop, if any.
    #[must_use]
    pub fn report(&self) -> Option<&SyncReport> {
        match self {
            Self::Apply(report) => Some(report),
            _ => None,
        }
    }
}

impl SourceError {
    /// Create a list error.
    pub fn list(source_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::List {
            source_id: source_id.into(),
            reason: reason.into(),
        }
    }

    /// Create a fetch error.
    pub fn fetch(
        source_id: impl Into<String>,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Fetch {
            source_id: source_id.into(),
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a format error.
    pub fn format(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Format {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

impl StoreError {
    /// Create a not found error.
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a status error.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// Create a transport error.
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    /// Create an invalid payload error.
    pub fn invalid_payload(reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ApplyFailure, Operation};

    #[test]
    fn test_error_display() {
        let err = Error::from(ValidationError::DuplicateKey { key: "x".into() });
        assert!(err.to_string().contains("duplicate key 'x'"));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_store_errors_are_not_client_errors() {
        let err = Error::from(StoreError::not_found("map 'hosts'"));
        assert!(!err.is_client_error());
        assert!(err.is_not_found());
    }

    #[test]
    fn test_apply_error_exposes_report() {
        let mut report = SyncReport::new("hosts");
        report.created = 2;
        report.failure = Some(ApplyFailure {
            operation: Operation::Delete,
            key: "b".into(),
            error: StoreError::status(500, "boom"),
        });

        let err = Error::Apply(Box::new(report));
        assert_eq!(err.report().map(|r| r.created), Some(2));
        assert!(err.to_string().contains("delete"));
        assert!(err.to_string().contains("'b'"));
        assert!(!err.is_not_found());
    }
}
