// Mock role store for resolver and reconciler tests.
// Wraps the in-memory store, records every call and injects faults.

use crate::error::{Result, StoreError};
use crate::store::{InMemoryRoleStore, RoleStore, StoredValue};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Store operation, as recorded in the call log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Get,
    Set,
    Add,
    Delete,
    List,
}

/// Failure to inject
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Transient,
    Unauthorized,
    /// The key vanished between listing and the operation
    NotFound,
    Http(u16),
}

impl Fault {
    fn to_error(self, key: &str) -> StoreError {
        match self {
            Fault::Transient => StoreError::transient(format!("connection reset ({})", key)),
            Fault::Unauthorized => StoreError::unauthorized(format!("token rejected ({})", key)),
            Fault::NotFound => StoreError::not_found(key),
            Fault::Http(status) => StoreError::Http {
                status,
                message: format!("injected failure for {}", key),
            },
        }
    }
}

/// Role store double with call recording and fault injection
#[derive(Clone, Default)]
pub struct MockRoleStore {
    inner: InMemoryRoleStore,
    calls: Arc<Mutex<Vec<(StoreOp, String)>>>,
    key_faults: Arc<Mutex<HashMap<(StoreOp, String), Fault>>>,
    any_key_faults: Arc<Mutex<HashMap<StoreOp, Fault>>>,
    list_faults: Arc<Mutex<Vec<Fault>>>,
}

impl MockRoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every `op` on `key`
    pub fn with_key_fault(self, op: StoreOp, key: &str, fault: Fault) -> Self {
        self.key_faults.lock().insert((op, key.to_string()), fault);
        self
    }

    /// Fail every `op`, whatever the key
    pub fn with_op_fault(self, op: StoreOp, fault: Fault) -> Self {
        self.any_key_faults.lock().insert(op, fault);
        self
    }

    /// Fail the next `times` list calls
    pub fn with_list_failures(self, times: usize, fault: Fault) -> Self {
        self.list_faults.lock().extend(std::iter::repeat(fault).take(times));
        self
    }

    /// Remove every injected fault
    pub fn heal(&self) {
        self.key_faults.lock().clear();
        self.any_key_faults.lock().clear();
        self.list_faults.lock().clear();
    }

    /// Seed a value directly
    pub async fn insert(&self, key: &str, value: &str) {
        self.inner.insert(key, StoredValue::new(value)).await;
    }

    /// Current value of a key, bypassing the call log
    pub async fn value_of(&self, key: &str) -> Option<String> {
        self.inner.get(key).await.ok().flatten().map(|v| v.value)
    }

    pub async fn keys(&self) -> Vec<String> {
        self.inner.keys().await
    }

    /// Every recorded call, in order
    pub fn calls(&self) -> Vec<(StoreOp, String)> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, op: StoreOp) -> usize {
        self.calls.lock().iter().filter(|(o, _)| *o == op).count()
    }

    /// Whether any call touched `key`
    pub fn touched(&self, key: &str) -> bool {
        self.calls.lock().iter().any(|(_, k)| k == key)
    }

    pub fn reset_calls(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, op: StoreOp, key: &str) -> Result<()> {
        self.calls.lock().push((op, key.to_string()));

        if let Some(fault) = self.key_faults.lock().get(&(op, key.to_string())) {
            return Err(fault.to_error(key));
        }
        if let Some(fault) = self.any_key_faults.lock().get(&op) {
            return Err(fault.to_error(key));
        }
        if op == StoreOp::List {
            let mut list_faults = self.list_faults.lock();
            if !list_faults.is_empty() {
                let fault = list_faults.remove(0);
                return Err(fault.to_error(key));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RoleStore for MockRoleStore {
    async fn get(&self, key: &str) -> Result<Option<StoredValue>> {
        self.record(StoreOp::Get, key)?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, content_type: &str) -> Result<()> {
        self.record(StoreOp::Set, key)?;
        self.inner.set(key, value, content_type).await
    }

    async fn add(&self, key: &str, value: &str, content_type: &str) -> Result<()> {
        self.record(StoreOp::Add, key)?;
        self.inner.add(key, value, content_type).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.record(StoreOp::Delete, key)?;
        self.inner.delete(key).await
    }

    async fn list(&self, key_filter: &str) -> Result<Vec<String>> {
        self.record(StoreOp::List, key_filter)?;
        self.inner.list(key_filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_failures_are_consumed() {
        let store = MockRoleStore::new().with_list_failures(2, Fault::Transient);
        store.insert("users:a@x.com:roles", "Admin").await;

        assert!(store.list("users:*").await.unwrap_err().is_transient());
        assert!(store.list("users:*").await.unwrap_err().is_transient());
        assert_eq!(store.list("users:*").await.unwrap().len(), 1);
        assert_eq!(store.call_count(StoreOp::List), 3);
    }

    #[tokio::test]
    async fn test_key_fault_only_hits_that_key() {
        let store = MockRoleStore::new()
            .with_key_fault(StoreOp::Get, "users:bad@x.com:roles", Fault::Http(500));

        assert!(store.get("users:bad@x.com:roles").await.is_err());
        assert!(store.get("users:ok@x.com:roles").await.unwrap().is_none());
        assert!(store.touched("users:bad@x.com:roles"));
    }

    #[tokio::test]
    async fn test_not_found_fault_leaves_key_listed() {
        let store = MockRoleStore::new()
            .with_key_fault(StoreOp::Delete, "users:b@x.com:roles", Fault::NotFound);
        store.insert("users:b@x.com:roles", "Member").await;

        assert!(store.delete("users:b@x.com:roles").await.unwrap_err().is_not_found());
        assert_eq!(store.list("users:*").await.unwrap(), vec!["users:b@x.com:roles"]);
    }
}
