//! Role store abstraction and in-memory implementation

use crate::error::{Result, StoreError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Value held under a store key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredValue {
    pub value: String,
    pub content_type: Option<String>,
}

impl StoredValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Remote key-value store holding role assignments
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Read a key. `Ok(None)` when the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<StoredValue>>;

    /// Write a key, replacing any existing value
    async fn set(&self, key: &str, value: &str, content_type: &str) -> Result<()>;

    /// Create a key. Fails with [`StoreError::AlreadyExists`] if it is present.
    async fn add(&self, key: &str, value: &str, content_type: &str) -> Result<()>;

    /// Delete a key. `Ok(false)` when there was nothing to delete.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// List keys matching a filter. A trailing `*` matches any suffix;
    /// otherwise the filter must equal the key.
    async fn list(&self, key_filter: &str) -> Result<Vec<String>>;
}

/// Match a key against an App Configuration style key filter
pub fn matches_filter(filter: &str, key: &str) -> bool {
    match filter.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => filter == key,
    }
}

/// In-memory role store
#[derive(Clone, Default)]
pub struct InMemoryRoleStore {
    entries: Arc<RwLock<BTreeMap<String, StoredValue>>>,
}

impl InMemoryRoleStore {
    /// Create a new, empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a key directly, bypassing create/overwrite semantics
    pub async fn insert(&self, key: impl Into<String>, value: StoredValue) {
        self.entries.write().await.insert(key.into(), value);
    }

    /// Snapshot of every key currently stored
    pub async fn keys(&self) -> Vec<String> {
        self.entries.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl RoleStore for InMemoryRoleStore {
    async fn get(&self, key: &str) -> Result<Option<StoredValue>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str, content_type: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            StoredValue::new(value).with_content_type(content_type),
        );
        Ok(())
    }

    async fn add(&self, key: &str, value: &str, content_type: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(key) {
            return Err(StoreError::AlreadyExists(key.to_string()));
        }
        entries.insert(
            key.to_string(),
            StoredValue::new(value).with_content_type(content_type),
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn list(&self, key_filter: &str) -> Result<Vec<String>> {
        let entries = self.entries.read().await;
        Ok(entries
            .keys()
            .filter(|key| matches_filter(key_filter, key))
            .cloned()
            .collect())
    }
}
