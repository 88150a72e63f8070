//! Fail-fast checks run before any diff or store call.

use itertools::Itertools;

use crate::error::ValidationError;
use crate::types::{EntrySet, SyncRequest};

/// Reject a desired set that declares the same key more than once.
///
/// Reports the first key seen a second time. No tie-break rule is applied:
/// a manifest with duplicates is ambiguous and rejected outright.
///
/// # Errors
///
/// Returns [`ValidationError::DuplicateKey`] for the first repeated key.
pub fn validate_unique_keys(desired: &EntrySet) -> Result<(), ValidationError> {
    match desired.keys().duplicates().next() {
        Some(key) => Err(ValidationError::DuplicateKey {
            key: key.to_owned(),
        }),
        None => Ok(()),
    }
}

impl SyncRequest {
    /// Check that every required field is present.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyField`] naming the first empty field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        [
            ("map_name", self.table.as_str()),
            ("bucket_name", self.selector.source.as_str()),
            ("bucket_file_name", self.selector.name.as_str()),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map_or(Ok(()), |(field, _)| {
            Err(ValidationError::EmptyField { field })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Entry, SourceSelector};

    fn set(entries: &[(&str, &str)]) -> EntrySet {
        entries.iter().map(|(k, v)| Entry::new(*k, *v)).collect()
    }

    #[test]
    fn test_unique_keys_pass() {
        assert_eq!(validate_unique_keys(&set(&[("a", "1"), ("b", "1")])), Ok(()));
        assert_eq!(validate_unique_keys(&EntrySet::new()), Ok(()));
    }

    #[test]
    fn test_duplicate_key_with_differing_values_rejected() {
        let result = validate_unique_keys(&set(&[("x", "1"), ("y", "2"), ("x", "3")]));
        assert_eq!(
            result,
            Err(ValidationError::DuplicateKey { key: "x".into() })
        );
    }

    #[test]
    fn test_duplicate_key_with_equal_values_rejected() {
        let result = validate_unique_keys(&set(&[("x", "1"), ("x", "1")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_first_repeated_key_is_reported() {
        let result = validate_unique_keys(&set(&[("a", "1"), ("b", "1"), ("b", "2"), ("a", "2")]));
        assert_eq!(
            result,
            Err(ValidationError::DuplicateKey { key: "b".into() })
        );
    }

    #[test]
    fn test_request_requires_table() {
        let request = SyncRequest::new("", SourceSelector::named("bucket", "hosts.json"));
        assert_eq!(
            request.validate(),
            Err(ValidationError::EmptyField { field: "map_name" })
        );
    }

    #[test]
    fn test_request_requires_selector_fields() {
        let request = SyncRequest::new("hosts", SourceSelector::named("bucket", " "));
        assert_eq!(
            request.validate(),
            Err(ValidationError::EmptyField {
                field: "bucket_file_name"
            })
        );

        let request = SyncRequest::new("hosts", SourceSelector::all(""));
        assert_eq!(
            request.validate(),
            Err(ValidationError::EmptyField {
                field: "bucket_name"
            })
        );
    }

    #[test]
    fn test_valid_request() {
        let request = SyncRequest::new("hosts", SourceSelector::all("bucket"));
        assert_eq!(request.validate(), Ok(()));
    }
}
