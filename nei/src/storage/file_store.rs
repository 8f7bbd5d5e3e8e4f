//! File-based implementation of the KeyValueStore trait.
//!
//! All keys live in a single JSON document. Every `set` rewrites the document
//! through a temp file in the same directory followed by a rename, so a crash
//! leaves either the previous or the new state on disk, never a torn file.

use super::KeyValueStore;
use crate::error::{EngineError, EngineResult};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, warn};

pub struct FileStore {
    path: PathBuf,
    /// In-memory copy of the document (interior mutability for trait compat)
    cache: RwLock<Map<String, Value>>,
}

impl FileStore {
    /// Open (or create on first write) the store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    EngineError::Storage(format!(
                        "Failed to create store directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let cache = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| {
                EngineError::Storage(format!("Failed to read store {}: {}", path.display(), e))
            })?;
            if content.trim().is_empty() {
                Map::new()
            } else {
                match serde_json::from_str::<Value>(&content) {
                    Ok(Value::Object(map)) => map,
                    Ok(_) => {
                        return Err(EngineError::Serialization(format!(
                            "Store {} is not a JSON object",
                            path.display()
                        )))
                    }
                    Err(e) => {
                        return Err(EngineError::Serialization(format!(
                            "Failed to parse store {}: {}",
                            path.display(),
                            e
                        )))
                    }
                }
            }
        } else {
            Map::new()
        };

        debug!("[FileStore] opened {} ({} keys)", path.display(), cache.len());
        Ok(Self {
            path,
            cache: RwLock::new(cache),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn atomic_write(&self, data: &[u8]) -> EngineResult<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let tmp = dir.join(format!(".{}.tmp", uuid::Uuid::new_v4()));
        {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(data)?;
            f.sync_all()?;
        }
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(EngineError::Storage(format!(
                "Failed to replace store {}: {}",
                self.path.display(),
                e
            )));
        }
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, keys: &[&str]) -> EngineResult<HashMap<String, Value>> {
        let cache = self
            .cache
            .read()
            .map_err(|_| EngineError::Storage("store cache lock poisoned".to_string()))?;
        Ok(keys
            .iter()
            .filter_map(|k| cache.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect())
    }

    fn set(&self, entries: HashMap<String, Value>) -> EngineResult<()> {
        let mut cache = self
            .cache
            .write()
            .map_err(|_| EngineError::Storage("store cache lock poisoned".to_string()))?;

        let mut next = cache.clone();
        for (k, v) in entries {
            next.insert(k, v);
        }
        let content = serde_json::to_vec_pretty(&Value::Object(next.clone()))?;
        if let Err(e) = self.atomic_write(&content) {
            warn!("[FileStore] write failed, keeping previous state: {}", e);
            return Err(e);
        }
        *cache = next;
        Ok(())
    }
}
