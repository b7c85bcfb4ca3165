//! In-memory durable store
//!
//! Lives as long as the process. Used for tests and for runs started
//! without a store file.

use std::{collections::HashMap, sync::Mutex};

use super::{DurableStore, StoreError, StoreResult};

/// Store backed by a mutex-guarded hash map
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let entries = self.entries.lock()
            .map_err(|e| StoreError::Lock(format!("Failed to lock memory store: {}", e)))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut entries = self.entries.lock()
            .map_err(|e| StoreError::Lock(format!("Failed to lock memory store: {}", e)))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let mut entries = self.entries.lock()
            .map_err(|e| StoreError::Lock(format!("Failed to lock memory store: {}", e)))?;
        entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        let entries = self.entries.lock()
            .map_err(|e| StoreError::Lock(format!("Failed to lock memory store: {}", e)))?;
        Ok(entries.keys().cloned().collect())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
