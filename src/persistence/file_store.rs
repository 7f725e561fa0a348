//! File-backed key-value store
//!
//! One JSON document holding the whole key map, flushed on every write. A
//! soft byte quota mirrors the constraints of the quota-limited media the
//! adapter is designed around, which also makes the eviction path reachable
//! outside tests.

use crate::persistence::{KeyValueStore, StorageError};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Soft quota applied when none is configured
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

const STORE_FILE: &str = "storage.json";

/// Key-value store persisted as a single JSON file
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    map: HashMap<String, String>,
    quota_bytes: usize,
}

impl FileStore {
    /// Open the store at the platform-default data location
    pub fn open_default(app_dir: &str) -> Result<Self, StorageError> {
        let base = dirs::data_local_dir()
            .ok_or_else(|| StorageError::Backend("No local data directory".to_string()))?;
        Self::open(base.join(app_dir).join(STORE_FILE))
    }

    /// Open the store at an explicit path, creating parent directories
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| StorageError::Backend(e.to_string()))?;
        }

        let map = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| StorageError::Backend(format!("Corrupt store file: {}", e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(StorageError::Backend(e.to_string())),
        };

        debug!("Opened file store at {}", path.display());
        Ok(FileStore {
            path,
            map,
            quota_bytes: DEFAULT_QUOTA_BYTES,
        })
    }

    pub fn with_quota(mut self, quota_bytes: usize) -> Self {
        self.quota_bytes = quota_bytes;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn used_bytes(&self) -> usize {
        self.map.iter().map(|(k, v)| k.len() + v.len()).sum()
    }

    fn flush(&self) -> Result<(), StorageError> {
        let raw = serde_json::to_string(&self.map)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        fs::write(&self.path, raw).map_err(|e| StorageError::Backend(e.to_string()))
    }
}

impl KeyValueStore for FileStore {
    fn read(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let current = self.map.get(key).map(|v| key.len() + v.len()).unwrap_or(0);
        let after = self.used_bytes() - current + key.len() + value.len();
        if after > self.quota_bytes {
            return Err(StorageError::QuotaExceeded);
        }

        self.map.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn delete(&mut self, key: &str) -> Result<(), StorageError> {
        if self.map.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.map.keys().cloned().collect()
    }
}
