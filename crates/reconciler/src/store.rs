//! The live table being reconciled.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::types::{Entry, EntrySet};

/// Single-entry access to the live runtime tables.
///
/// Every call is keyed by table id. No batch API is assumed.
#[async_trait]
pub trait ActualStateStore: Send + Sync {
    /// Read every entry of a table.
    async fn list(&self, table: &str) -> Result<EntrySet, StoreError>;

    /// Add an entry to a table.
    async fn create(&self, table: &str, entry: &Entry) -> Result<Entry, StoreError>;

    /// Replace the value of an existing entry.
    async fn update(&self, table: &str, entry: &Entry) -> Result<Entry, StoreError>;

    /// Remove an existing entry.
    async fn delete(&self, table: &str, entry: &Entry) -> Result<Entry, StoreError>;
}

/// In-memory table store for tests and local runs.
///
/// Tables must be declared with [`InMemoryTableStore::add_table`] before use,
/// as runtime maps must exist in the proxy configuration.
#[derive(Default)]
pub struct InMemoryTableStore {
    tables: RwLock<HashMap<String, Vec<Entry>>>,
    next_id: AtomicU64,
}

impl InMemoryTableStore {
    /// Create a store without tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a table with its initial entries.
    pub async fn add_table(&self, table: &str, entries: EntrySet) {
        let entries = entries
            .into_iter()
            .map(|e| match e.id {
                Some(_) => e,
                None => {
                    let id = self.allocate_id();
                    e.with_id(id)
                }
            })
            .collect();
        self.tables.write().await.insert(table.to_owned(), entries);
    }

    /// Current contents of a table, if it exists.
    pub async fn snapshot(&self, table: &str) -> Option<EntrySet> {
        self.tables
            .read()
            .await
            .get(table)
            .map(|entries| entries.iter().cloned().collect())
    }

    fn allocate_id(&self) -> String {
        format!("{:#x}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

fn missing_table(table: &str) -> StoreError {
    StoreError::not_found(format!("map '{table}'"))
}

fn missing_entry(table: &str, key: &str) -> StoreError {
    StoreError::not_found(format!("entry '{key}' in map '{table}'"))
}

#[async_trait]
impl ActualStateStore for InMemoryTableStore {
    async fn list(&self, table: &str) -> Result<EntrySet, StoreError> {
        self.snapshot(table).await.ok_or_else(|| missing_table(table))
    }

    async fn create(&self, table: &str, entry: &Entry) -> Result<Entry, StoreError> {
        let mut tables = self.tables.write().await;
        let entries = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
        if entries.iter().any(|e| e.key == entry.key) {
            return Err(StoreError::status(
                409,
                format!("entry '{}' already exists", entry.key),
            ));
        }
        let created = Entry::new(entry.key.clone(), entry.value.clone()).with_id(self.allocate_id());
        entries.push(created.clone());
        Ok(created)
    }

    async fn update(&self, table: &str, entry: &Entry) -> Result<Entry, StoreError> {
        let mut tables = self.tables.write().await;
        let entries = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
        let current = entries
            .iter_mut()
            .find(|e| e.key == entry.key)
            .ok_or_else(|| missing_entry(table, &entry.key))?;
        current.value.clone_from(&entry.value);
        Ok(current.clone())
    }

    async fn delete(&self, table: &str, entry: &Entry) -> Result<Entry, StoreError> {
        let mut tables = self.tables.write().await;
        let entries = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
        let position = entries
            .iter()
            .position(|e| e.key == entry.key)
            .ok_or_else(|| missing_entry(table, &entry.key))?;
        Ok(entries.remove(position))
    }
}
