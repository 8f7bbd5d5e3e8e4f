//! Persistent key-value store used by the engine.
//!
//! The engine only needs two operations, `get(keys)` and `set(map)`. Everything
//! it persists lives under a handful of stable keys so that a store written by
//! one session can be picked up by the next.

pub mod file_store;
pub mod memory_store;

pub use file_store::FileStore;
pub use memory_store::MemoryStore;

use crate::error::EngineResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// Key holding the knowledge base (items and failed pairs).
pub const KEY_RECIPES_DB: &str = "recipes_db";
/// Key holding the dedup set of attempted pair keys.
pub const KEY_TRIED_PAIRS: &str = "tried_pairs";
/// Key holding calibration, viewport and restricted-name settings.
pub const KEY_BOT_CONFIG: &str = "bot_config";

/// Minimal storage-agnostic key-value API.
///
/// Notes:
/// - `get` returns only the keys that are present.
/// - `set` must be durable before it returns; callers rely on a flushed write
///   before issuing the next dependent read.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, keys: &[&str]) -> EngineResult<HashMap<String, Value>>;
    fn set(&self, entries: HashMap<String, Value>) -> EngineResult<()>;
}

/// Load and deserialize a single key. Missing keys yield `None`.
pub fn load_value<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> EngineResult<Option<T>> {
    let mut values = store.get(&[key])?;
    match values.remove(key) {
        Some(Value::Null) | None => Ok(None),
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
    }
}

/// Serialize and store a single key.
pub fn save_value<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> EngineResult<()> {
    let mut entries = HashMap::new();
    entries.insert(key.to_string(), serde_json::to_value(value)?);
    store.set(entries)
}
