//! Persistent set of pair keys that have already been sent to the oracle.
//!
//! The set only grows. It is stored as a `pair_key -> true` map so that a
//! store shared with other tooling can be read without knowing our types.

use crate::error::EngineResult;
use crate::knowledge::pair_key;
use crate::storage::{self, KeyValueStore, KEY_TRIED_PAIRS};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupTracker {
    tried: BTreeSet<String>,
}

impl DedupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(store: &dyn KeyValueStore) -> EngineResult<Self> {
        let raw: BTreeMap<String, bool> =
            storage::load_value(store, KEY_TRIED_PAIRS)?.unwrap_or_default();
        Ok(Self {
            tried: raw.into_iter().filter(|(_, v)| *v).map(|(k, _)| k).collect(),
        })
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> EngineResult<()> {
        let raw: BTreeMap<&str, bool> = self.tried.iter().map(|k| (k.as_str(), true)).collect();
        storage::save_value(store, KEY_TRIED_PAIRS, &raw)
    }

    pub fn has_tried(&self, a: &str, b: &str) -> bool {
        self.tried.contains(&pair_key(a, b))
    }

    /// Record `(a, b)` as attempted and persist. Returns false if it was
    /// already recorded.
    pub fn mark_tried(&mut self, store: &dyn KeyValueStore, a: &str, b: &str) -> EngineResult<bool> {
        let inserted = self.tried.insert(pair_key(a, b));
        if inserted {
            self.save(store)?;
        }
        Ok(inserted)
    }

    pub fn len(&self) -> usize {
        self.tried.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tried.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_mark_tried_is_unordered_and_persisted() {
        let store = MemoryStore::new();
        let mut dedup = DedupTracker::new();
        assert!(dedup.mark_tried(&store, "Water", "Fire").unwrap());
        assert!(!dedup.mark_tried(&store, "Fire", "Water").unwrap());
        assert!(dedup.has_tried("Fire", "Water"));
        assert_eq!(dedup.len(), 1);

        let reloaded = DedupTracker::load(&store).unwrap();
        assert!(reloaded.has_tried("Water", "Fire"));
        assert!(!reloaded.has_tried("Water", "Earth"));
    }

    #[test]
    fn test_load_reads_plain_key_map() {
        let store = MemoryStore::new();
        let raw = serde_json::json!({ "Fire||Water": true, "Earth||Wind": false });
        storage::save_value(&store, KEY_TRIED_PAIRS, &raw).unwrap();
        let dedup = DedupTracker::load(&store).unwrap();
        assert!(dedup.has_tried("Water", "Fire"));
        assert!(!dedup.has_tried("Wind", "Earth"));
    }
}
