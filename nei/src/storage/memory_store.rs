//! In-memory store, used by tests and dry runs.

use super::KeyValueStore;
use crate::error::{EngineError, EngineResult};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, keys: &[&str]) -> EngineResult<HashMap<String, Value>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| EngineError::Storage("memory store lock poisoned".to_string()))?;
        Ok(keys
            .iter()
            .filter_map(|k| entries.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect())
    }

    fn set(&self, new_entries: HashMap<String, Value>) -> EngineResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| EngineError::Storage("memory store lock poisoned".to_string()))?;
        entries.extend(new_entries);
        Ok(())
    }
}
