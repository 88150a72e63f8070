//! Three-way partition of a desired set against an actual set.
//!
//! Keys are classified by membership first, then by value:
//!
//! - desired only → create
//! - actual only → delete
//! - both, values differ → update
//! - both, values equal → unchanged
//!
//! Every key of `desired ∪ actual` lands in exactly one class. Result sets
//! keep the order in which entries were scanned: `desired` for creates and
//! updates, `actual` for deletes.

use std::collections::HashMap;

use either::Either;
use itertools::Itertools;

use crate::types::{DiffResult, Entry, EntrySet};

/// Compute the changes needed to turn `actual` into `desired`.
///
/// `desired` is expected to have passed
/// [`validate_unique_keys`](crate::validate::validate_unique_keys).
pub fn diff(desired: &EntrySet, actual: &EntrySet) -> DiffResult {
    let actual_index = index_by_key(actual);

    let (to_create, intersection): (Vec<Entry>, Vec<(&Entry, &Entry)>) =
        desired.iter().partition_map(|entry| {
            match actual_index.get(entry.key.as_str()) {
                None => Either::Left(entry.clone()),
                Some(current) => Either::Right((entry, *current)),
            }
        });

    let desired_index = index_by_key(desired);
    let to_delete: EntrySet = actual
        .iter()
        .filter(|entry| !desired_index.contains_key(entry.key.as_str()))
        .cloned()
        .collect();

    let (to_update, unchanged): (Vec<Entry>, Vec<&Entry>) =
        intersection.into_iter().partition_map(|(wanted, current)| {
            if wanted.converged_with(current) {
                Either::Right(wanted)
            } else {
                Either::Left(with_remote_id(wanted, current))
            }
        });

    DiffResult {
        to_create: to_create.into(),
        to_delete,
        to_update: to_update.into(),
        unchanged: unchanged.len(),
    }
}

fn index_by_key(set: &EntrySet) -> HashMap<&str, &Entry> {
    set.iter().map(|e| (e.key.as_str(), e)).collect()
}

/// Updates carry the id the store already knows the entry by.
fn with_remote_id(wanted: &Entry, current: &Entry) -> Entry {
    Entry {
        id: current.id.clone().or_else(|| wanted.id.clone()),
        key: wanted.key.clone(),
        value: wanted.value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(entries: &[(&str, &str)]) -> EntrySet {
        entries.iter().map(|(k, v)| Entry::new(*k, *v)).collect()
    }

    fn pairs(set: &EntrySet) -> Vec<(&str, &str)> {
        set.iter()
            .map(|e| (e.key.as_str(), e.value.as_str()))
            .collect()
    }

    #[test]
    fn test_create_only() {
        let result = diff(&set(&[("a", "1")]), &EntrySet::new());
        assert_eq!(pairs(&result.to_create), vec![("a", "1")]);
        assert!(result.to_delete.is_empty());
        assert!(result.to_update.is_empty());
    }

    #[test]
    fn test_update_only() {
        let result = diff(&set(&[("a", "2")]), &set(&[("a", "1")]));
        assert!(result.to_create.is_empty());
        assert!(result.to_delete.is_empty());
        assert_eq!(pairs(&result.to_update), vec![("a", "2")]);
    }

    #[test]
    fn test_mixed() {
        let desired = set(&[("a", "1"), ("b", "2")]);
        let actual = set(&[("b", "3"), ("c", "4")]);
        let result = diff(&desired, &actual);

        assert_eq!(pairs(&result.to_create), vec![("a", "1")]);
        assert_eq!(pairs(&result.to_delete), vec![("c", "4")]);
        assert_eq!(pairs(&result.to_update), vec![("b", "2")]);
        assert_eq!(result.unchanged, 0);
    }

    #[test]
    fn test_identical_sets_are_converged() {
        let entries = set(&[("a", "1"), ("b", "2")]);
        let result = diff(&entries, &entries);
        assert!(result.is_empty());
        assert_eq!(result.unchanged, 2);
    }

    #[test]
    fn test_ids_do_not_affect_equality() {
        let desired = set(&[("a", "1")]);
        let actual: EntrySet = vec![Entry::new("a", "1").with_id("0x55d1")].into();
        assert!(diff(&desired, &actual).is_empty());
    }

    #[test]
    fn test_update_carries_remote_id() {
        let desired = set(&[("a", "2")]);
        let actual: EntrySet = vec![Entry::new("a", "1").with_id("0x55d1")].into();
        let result = diff(&desired, &actual);
        assert_eq!(
            result.to_update.get("a").and_then(|e| e.id.as_deref()),
            Some("0x55d1")
        );
    }

    #[test]
    fn test_empty_desired_deletes_everything() {
        let actual = set(&[("b", "1"), ("a", "2")]);
        let result = diff(&EntrySet::new(), &actual);
        assert_eq!(pairs(&result.to_delete), vec![("b", "1"), ("a", "2")]);
        assert_eq!(result.pending(), 2);
    }

    #[test]
    fn test_order_follows_scan_order() {
        let desired = set(&[("z", "1"), ("m", "1"), ("a", "1"), ("q", "9")]);
        let actual = set(&[("y", "0"), ("q", "1"), ("b", "0")]);
        let result = diff(&desired, &actual);

        assert_eq!(
            result.to_create.keys().collect::<Vec<_>>(),
            vec!["z", "m", "a"]
        );
        assert_eq!(result.to_delete.keys().collect::<Vec<_>>(), vec!["y", "b"]);
        assert_eq!(result.to_update.keys().collect::<Vec<_>>(), vec!["q"]);
    }
}
