//! Core types for the reconciler.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::StoreError;

/// One row of a runtime map.
///
/// `key` identifies the entry within its table. `id` is assigned by the
/// remote store and never takes part in comparisons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Opaque identifier assigned by the remote store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Identity of the entry within its table.
    pub key: String,
    /// Payload compared during diffing.
    pub value: String,
}

impl Entry {
    /// Create an entry without a store-assigned id.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: None,
            key: key.into(),
            value: value.into(),
        }
    }

    /// Attach a store-assigned id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Two entries are converged when their values match; `id` is ignored.
    #[must_use]
    pub fn converged_with(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

/// Ordered sequence of entries, semantically a key to value mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntrySet(Vec<Entry>);

impl EntrySet {
    /// Create an empty entry set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, keeping encounter order.
    pub fn push(&mut self, entry: Entry) {
        self.0.push(entry);
    }

    /// Append every entry of another set.
    pub fn extend(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    /// Iterate over the entries in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.0.iter()
    }

    /// Keys in encounter order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|e| e.key.as_str())
    }

    /// Look up an entry by key.
    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.0.iter().find(|e| e.key == key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the entries as a slice.
    pub fn as_slice(&self) -> &[Entry] {
        &self.0
    }

    /// Consume the set into its entries.
    pub fn into_inner(self) -> Vec<Entry> {
        self.0
    }
}

impl From<Vec<Entry>> for EntrySet {
    fn from(entries: Vec<Entry>) -> Self {
        Self(entries)
    }
}

impl FromIterator<Entry> for EntrySet {
    fn from_iter<I: IntoIterator<Item = Entry>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for EntrySet {
    type Item = Entry;
    type IntoIter = std::vec::IntoIter<Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a EntrySet {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// The three disjoint change sets computed from a desired and an actual set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    /// Desired entries whose key is missing from the actual set.
    pub to_create: EntrySet,
    /// Actual entries whose key is missing from the desired set.
    pub to_delete: EntrySet,
    /// Desired entries whose value differs from the actual entry.
    pub to_update: EntrySet,
    /// Keys present on both sides with identical values.
    pub unchanged: usize,
}

impl DiffResult {
    /// Whether the actual set already matches the desired set.
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_delete.is_empty() && self.to_update.is_empty()
    }

    /// Number of single-entry calls an apply would make.
    pub fn pending(&self) -> usize {
        self.to_create.len() + self.to_delete.len() + self.to_update.len()
    }

    /// The entries of one phase.
    pub const fn entries(&self, operation: Operation) -> &EntrySet {
        match operation {
            Operation::Create => &self.to_create,
            Operation::Delete => &self.to_delete,
            Operation::Update => &self.to_update,
        }
    }
}

/// A single-entry mutation against the live table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Delete,
    Update,
}

/// Order in which the apply loop processes the phases of a diff.
///
/// Creates go first so that a replacement key is live before the key it
/// replaces is removed; updates go last as they only touch entries that
/// survive both structural phases.
pub const APPLY_ORDER: [Operation; 3] = [Operation::Create, Operation::Delete, Operation::Update];

impl Operation {
    /// Past-tense label used for entry counters.
    pub const fn outcome(self) -> &'static str {
        match self {
            Self::Create => "created",
            Self::Delete => "deleted",
            Self::Update => "updated",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Delete => write!(f, "delete"),
            Self::Update => write!(f, "update"),
        }
    }
}

/// The call that aborted an apply loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyFailure {
    /// Phase the failing call belonged to.
    pub operation: Operation,
    /// Key of the entry being applied.
    pub key: String,
    /// Underlying store failure.
    #[serde(serialize_with = "serialize_display")]
    pub error: StoreError,
}

impl fmt::Display for ApplyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to {} entry '{}': {}",
            self.operation, self.key, self.error
        )
    }
}

/// Outcome of one synchronization run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Target table.
    pub table: String,
    /// Entries created before the run ended.
    pub created: usize,
    /// Entries updated before the run ended.
    pub updated: usize,
    /// Entries deleted before the run ended.
    pub deleted: usize,
    /// First failure, if the run aborted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ApplyFailure>,
}

impl SyncReport {
    /// Create an empty report for a table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            created: 0,
            updated: 0,
            deleted: 0,
            failure: None,
        }
    }

    /// Whether every planned call succeeded.
    pub const fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Number of calls that took effect.
    pub const fn total_applied(&self) -> usize {
        self.created
            .saturating_add(self.updated)
            .saturating_add(self.deleted)
    }

    pub(crate) fn record(&mut self, operation: Operation) {
        match operation {
            Operation::Create => self.created = self.created.saturating_add(1),
            Operation::Delete => self.deleted = self.deleted.saturating_add(1),
            Operation::Update => self.updated = self.updated.saturating_add(1),
        }
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.failure {
            None => write!(
                f,
                "table '{}': {} created - {} updated - {} deleted",
                self.table, self.created, self.updated, self.deleted
            ),
            Some(failure) => write!(
                f,
                "table '{}': {failure} ({} created - {} updated - {} deleted before abort)",
                self.table, self.created, self.updated, self.deleted
            ),
        }
    }
}

/// Selects the resources making up the desired state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSelector {
    /// Source collection (bucket).
    pub source: String,
    /// Resource name inside the collection, or the wildcard.
    pub name: String,
}

impl SourceSelector {
    /// Selector for a single named resource.
    pub fn named(source: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            name: name.into(),
        }
    }

    /// Selector for every JSON resource of a collection.
    pub fn all(source: impl Into<String>) -> Self {
        Self::named(source, WILDCARD)
    }

    /// Whether the selector targets every JSON resource of the collection.
    pub fn is_wildcard(&self) -> bool {
        self.name == WILDCARD
    }
}

/// Resource name selecting every JSON resource of a collection.
pub const WILDCARD: &str = "*";

/// A resource listed by a desired-state source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceObject {
    /// Resource name inside its collection.
    pub name: String,
    /// Declared MIME type, if any.
    pub content_type: Option<String>,
}

impl SourceObject {
    pub fn new(name: impl Into<String>, content_type: Option<&str>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.map(str::to_owned),
        }
    }
}

/// Input of a synchronization run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRequest {
    /// Target table (HAProxy map name).
    pub table: String,
    /// Desired-state selector.
    pub selector: SourceSelector,
}

impl SyncRequest {
    pub fn new(table: impl Into<String>, selector: SourceSelector) -> Self {
        Self {
            table: table.into(),
            selector,
        }
    }
}

fn serialize_display<T: fmt::Display, S: Serializer>(
    value: &T,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}
