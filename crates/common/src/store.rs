//! Shared key-value store contract
//!
//! The store is shared by every worker of a test run. Values are JSON;
//! writing `null` removes the key, so a stored value is never `null`.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Result;

/// Key-value store shared across test-runner workers
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Read the value under `key`, `None` when absent
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Overwrite the value under `key`
    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Write `value` only if the current value equals `expected`
    /// (`None` meaning absent). Returns whether the write happened.
    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&Value>,
        value: Value,
    ) -> Result<bool>;
}

/// In-process store backed by a mutex-guarded map
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
    writes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with one entry
    pub fn with_entry(key: impl Into<String>, value: Value) -> Self {
        let store = Self::new();
        let key: String = key.into();
        put(&mut store.entries.lock(), &key, value);
        store
    }

    /// Number of successful writes since creation
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Copy of every entry, for inspection
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.entries.lock().clone()
    }
}

#[async_trait]
impl SharedStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        put(&mut self.entries.lock(), key, value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&Value>,
        value: Value,
    ) -> Result<bool> {
        let mut entries = self.entries.lock();
        if entries.get(key) != expected {
            return Ok(false);
        }
        put(&mut entries, key, value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}

fn put(entries: &mut HashMap<String, Value>, key: &str, value: Value) {
    if value.is_null() {
        entries.remove(key);
    } else {
        entries.insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_set() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        store.set("k", json!([1])).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(json!([1])));
        assert_eq!(store.write_count(), 1);

        store.set("k", Value::Null).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_compare_and_set() {
        let store = MemoryStore::new();

        // Absent key matches `None`
        assert!(store.compare_and_set("k", None, json!(1)).await.unwrap());
        // Stale expectation is rejected
        assert!(!store.compare_and_set("k", None, json!(2)).await.unwrap());
        assert!(!store.compare_and_set("k", Some(&json!(5)), json!(2)).await.unwrap());
        assert!(store.compare_and_set("k", Some(&json!(1)), json!(2)).await.unwrap());

        assert_eq!(store.get("k").await.unwrap(), Some(json!(2)));
        assert_eq!(store.write_count(), 2);
    }
}
