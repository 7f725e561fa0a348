//! Typed key-value persistence with quota recovery
//!
//! The backing store is treated as an unreliable, quota-limited, user
//! clearable medium. The adapter therefore never throws on the read path
//! (missing or corrupt values become the caller's fallback) and degrades the
//! write path to a boolean, with one narrow recovery: on a quota failure it
//! evicts droppable keys and retries exactly once. Game artifacts are written
//! under four redundant key shapes so reads have independent fallbacks.

pub mod file_store;

use crate::core::artifact::StageArtifact;
use crate::llm::Credentials;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

pub use file_store::FileStore;

/// Errors from a backing store
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage quota exceeded")]
    QuotaExceeded,

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Minimal string key-value backend the adapter sits on
pub trait KeyValueStore: Send + Sync {
    fn read(&self, key: &str) -> Option<String>;
    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn delete(&mut self, key: &str) -> Result<(), StorageError>;
    fn keys(&self) -> Vec<String>;
}

/// Storage key layout
pub mod keys {
    /// Aggregate ordered list of all stage artifacts
    pub const STAGE_LIST: &str = "game_stages";
    /// Latest artifact, full copy
    pub const LATEST: &str = "latest_game_stage";
    /// Id of the latest artifact
    pub const LATEST_ID: &str = "latest_game_stage_id";
    /// Latest artifact with documentation stripped
    pub const LATEST_MINIMAL: &str = "latest_game_stage_minimal";
    /// Timestamp of the last successful save
    pub const LAST_SAVE: &str = "last_save_time";
    /// Pipeline configurations and progress
    pub const PIPELINE: &str = "pipeline_config";
    /// Progress record of the active configuration
    pub const PIPELINE_PROGRESS: &str = "pipeline_progress";
    /// Id of the configuration the session is currently working on
    pub const ACTIVE_CONFIGURATION: &str = "active_pipeline_configuration";
    /// Serialized API credential
    pub const API_CREDENTIAL: &str = "api_credential";

    /// Per-artifact key
    pub fn stage(id: &str) -> String {
        format!("game_stage_{}", id)
    }
}

const PROBE_KEY: &str = "__storage_probe__";

/// Substrings marking a key as safe to evict under quota pressure
const EVICTABLE_MARKERS: &[&str] = &["temp", "cache", "old"];

/// Typed adapter over a [`KeyValueStore`]
pub struct StorageAdapter<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> StorageAdapter<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Write-then-delete probe; all failures collapse to `false`
    pub fn is_available(&mut self) -> bool {
        self.store.write(PROBE_KEY, "1").is_ok() && self.store.delete(PROBE_KEY).is_ok()
    }

    /// Read and deserialize, returning `fallback` for a missing key or a
    /// value that fails to parse. Never fails.
    pub fn get<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        match self.store.read(key) {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(value) => value,
                Err(e) => {
                    warn!("Discarding corrupt value under '{}': {}", key, e);
                    fallback
                }
            },
            None => fallback,
        }
    }

    /// Serialize and write. On a quota failure, evicts droppable keys and
    /// retries exactly once. All failures collapse to `false`.
    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> bool {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to serialize value for '{}': {}", key, e);
                return false;
            }
        };
        self.set_raw(key, &raw)
    }

    fn set_raw(&mut self, key: &str, raw: &str) -> bool {
        match self.store.write(key, raw) {
            Ok(()) => true,
            Err(StorageError::QuotaExceeded) => {
                let evicted = self.evict_droppable();
                warn!(
                    "Quota exceeded writing '{}'; evicted {} droppable key(s), retrying",
                    key, evicted
                );
                match self.store.write(key, raw) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("Retry after eviction failed for '{}': {}", key, e);
                        false
                    }
                }
            }
            Err(e) => {
                warn!("Failed to write '{}': {}", key, e);
                false
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.store.delete(key).is_ok()
    }

    fn evict_droppable(&mut self) -> usize {
        let droppable: Vec<String> = self
            .store
            .keys()
            .into_iter()
            .filter(|k| EVICTABLE_MARKERS.iter().any(|m| k.contains(m)))
            .collect();
        let mut evicted = 0;
        for key in droppable {
            if self.store.delete(&key).is_ok() {
                evicted += 1;
            }
        }
        evicted
    }

    /// Persist an artifact under its four redundant key shapes plus the
    /// last-save timestamp. Returns whether the per-id write succeeded; the
    /// remaining shapes are best-effort.
    pub fn save_artifact(&mut self, artifact: &StageArtifact) -> bool {
        let compressed = artifact.compress();
        let primary = self.set_raw(&keys::stage(&artifact.id), &compressed);

        let mut list: Vec<StageArtifact> = self.get(keys::STAGE_LIST, Vec::new());
        match list.iter_mut().find(|a| a.id == artifact.id) {
            Some(slot) => *slot = artifact.clone(),
            None => list.push(artifact.clone()),
        }
        self.set(keys::STAGE_LIST, &list);

        self.set_raw(keys::LATEST, &compressed);
        self.set(keys::LATEST_ID, &artifact.id);
        self.set(keys::LATEST_MINIMAL, &artifact.to_minimal());
        self.set(keys::LAST_SAVE, &chrono::Utc::now().to_rfc3339());

        debug!("Saved artifact '{}' under redundant keys", artifact.id);
        primary
    }

    /// Load one artifact by id
    pub fn load_artifact(&self, id: &str) -> Option<StageArtifact> {
        let raw = self.store.read(&keys::stage(id))?;
        StageArtifact::decompress(&raw).ok()
    }

    /// Load the latest artifact, trying each redundant representation in
    /// turn: full latest copy, latest-id indirection, tail of the aggregate
    /// list, then the minimal copy.
    pub fn load_latest(&self) -> Option<StageArtifact> {
        if let Some(raw) = self.store.read(keys::LATEST) {
            if let Ok(artifact) = StageArtifact::decompress(&raw) {
                return Some(artifact);
            }
            warn!("Latest artifact copy is corrupt, falling back");
        }

        let id: String = self.get(keys::LATEST_ID, String::new());
        if !id.is_empty() {
            if let Some(artifact) = self.load_artifact(&id) {
                return Some(artifact);
            }
        }

        let list: Vec<StageArtifact> = self.get(keys::STAGE_LIST, Vec::new());
        if let Some(artifact) = list.into_iter().last() {
            return Some(artifact);
        }

        let minimal: Option<StageArtifact> = self.get(keys::LATEST_MINIMAL, None);
        minimal
    }

    /// All stored artifacts, in save order
    pub fn load_all(&self) -> Vec<StageArtifact> {
        self.get(keys::STAGE_LIST, Vec::new())
    }

    pub fn save_credentials(&mut self, credentials: &Credentials) -> bool {
        self.set(keys::API_CREDENTIAL, credentials)
    }

    pub fn load_credentials(&self) -> Option<Credentials> {
        self.get(keys::API_CREDENTIAL, None)
    }
}

/// In-memory backend with an optional byte quota
#[derive(Debug, Default)]
pub struct MemoryStore {
    map: HashMap<String, String>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        MemoryStore {
            map: HashMap::new(),
            quota_bytes: Some(quota_bytes),
        }
    }

    fn used_bytes(&self) -> usize {
        self.map.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(quota) = self.quota_bytes {
            let current = self
                .map
                .get(key)
                .map(|v| key.len() + v.len())
                .unwrap_or(0);
            let after = self.used_bytes() - current + key.len() + value.len();
            if after > quota {
                return Err(StorageError::QuotaExceeded);
            }
        }
        self.map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), StorageError> {
        self.map.remove(key);
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.map.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(id: &str) -> StageArtifact {
        StageArtifact {
            id: id.to_string(),
            title: id.to_string(),
            description: "d".to_string(),
            html: "<div></div>".to_string(),
            css: String::new(),
            js: String::new(),
            md: Some("# doc".to_string()),
        }
    }

    #[test]
    fn test_get_returns_fallback_for_missing_and_corrupt() {
        let mut adapter = StorageAdapter::new(MemoryStore::new());
        assert_eq!(adapter.get("absent", 42u32), 42);

        adapter.store.write("bad", "{not json").unwrap();
        assert_eq!(adapter.get("bad", 42u32), 42);
    }

    #[test]
    fn test_set_then_get_round_trips() {
        let mut adapter = StorageAdapter::new(MemoryStore::new());
        assert!(adapter.set("answer", &vec![1u32, 2, 3]));
        assert_eq!(adapter.get("answer", Vec::<u32>::new()), vec![1, 2, 3]);
        assert!(adapter.is_available());
    }

    #[test]
    fn test_quota_eviction_retries_once() {
        // Room for the droppable key or the payload, not both
        let mut adapter = StorageAdapter::new(MemoryStore::with_quota(96));
        assert!(adapter.set_raw("temp_scratch", &"x".repeat(60)));
        assert!(adapter.set_raw("payload", &"y".repeat(60)));

        // The droppable key was evicted to make room
        assert!(adapter.store().read("temp_scratch").is_none());
        assert_eq!(adapter.store().read("payload").unwrap().len(), 60);
    }

    #[test]
    fn test_quota_failure_without_droppable_keys() {
        let mut adapter = StorageAdapter::new(MemoryStore::with_quota(32));
        assert!(adapter.set_raw("keep_this", "v"));
        assert!(!adapter.set_raw("payload", &"y".repeat(60)));
        // The existing key was not touched
        assert_eq!(adapter.store().read("keep_this").as_deref(), Some("v"));
    }

    #[test]
    fn test_save_artifact_writes_redundant_keys() {
        let mut adapter = StorageAdapter::new(MemoryStore::new());
        assert!(adapter.save_artifact(&artifact("core-concept-1")));

        assert!(adapter.store().read(&keys::stage("core-concept-1")).is_some());
        assert!(adapter.store().read(keys::LATEST).is_some());
        assert_eq!(
            adapter.get::<String>(keys::LATEST_ID, String::new()),
            "core-concept-1"
        );
        let minimal: Option<StageArtifact> = adapter.get(keys::LATEST_MINIMAL, None);
        assert!(minimal.unwrap().md.is_none());
        assert!(adapter.store().read(keys::LAST_SAVE).is_some());
    }

    #[test]
    fn test_load_latest_falls_back_across_representations() {
        let mut adapter = StorageAdapter::new(MemoryStore::new());
        adapter.save_artifact(&artifact("core-concept-1"));
        adapter.save_artifact(&artifact("enhanced-mechanics-2"));

        // Corrupt the primary latest copy; the id indirection still works
        adapter.store.write(keys::LATEST, "{corrupt").unwrap();
        let latest = adapter.load_latest().unwrap();
        assert_eq!(latest.id, "enhanced-mechanics-2");

        // Kill the indirection too; the aggregate list is next
        adapter.remove(keys::LATEST_ID);
        adapter.remove(&keys::stage("enhanced-mechanics-2"));
        let latest = adapter.load_latest().unwrap();
        assert_eq!(latest.id, "enhanced-mechanics-2");
    }

    #[test]
    fn test_save_artifact_replaces_list_entry_in_place() {
        let mut adapter = StorageAdapter::new(MemoryStore::new());
        adapter.save_artifact(&artifact("core-concept-1"));

        let mut updated = artifact("core-concept-1");
        updated.title = "Fixed".to_string();
        adapter.save_artifact(&updated);

        let list = adapter.load_all();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].title, "Fixed");
    }

    #[test]
    fn test_credentials_round_trip() {
        let mut adapter = StorageAdapter::new(MemoryStore::new());
        assert!(adapter.load_credentials().is_none());

        adapter.save_credentials(&Credentials::new("sk-test"));
        let loaded = adapter.load_credentials().unwrap();
        assert_eq!(loaded.api_key, "sk-test");
    }
}
