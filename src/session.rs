//! Session context: the one in-memory cache of pipeline state per run
//!
//! Constructed once at application start with an explicit `load`, saved with
//! an explicit `save` after each mutation. Owns the pipeline manager, the
//! ordered artifact list and the storage adapter; nothing here happens as a
//! module-level side effect.

use crate::core::{PipelineError, PipelineManager, StageArtifact};
use crate::llm::Credentials;
use crate::persistence::{keys, KeyValueStore, StorageAdapter};
use tracing::{info, warn};
use uuid::Uuid;

/// Application session state backed by the storage adapter
pub struct Session<S: KeyValueStore> {
    manager: PipelineManager,
    storage: StorageAdapter<S>,
    artifacts: Vec<StageArtifact>,
    active_configuration: Option<Uuid>,
    credentials: Option<Credentials>,
}

impl<S: KeyValueStore> Session<S> {
    /// Load session state from storage. Missing or corrupt keys start the
    /// corresponding piece fresh rather than failing the load.
    pub fn load(store: S) -> Self {
        let storage = StorageAdapter::new(store);
        let manager: PipelineManager = storage.get(keys::PIPELINE, PipelineManager::new());
        let artifacts = storage.load_all();
        let active_configuration: Option<Uuid> = storage.get(keys::ACTIVE_CONFIGURATION, None);
        let credentials = storage.load_credentials();

        info!(
            "Session loaded: {} artifact(s), active configuration {:?}",
            artifacts.len(),
            active_configuration
        );

        Session {
            manager,
            storage,
            artifacts,
            active_configuration,
            credentials,
        }
    }

    /// Persist the session. Write failures are logged by the adapter and
    /// reported as a combined boolean; the in-memory state stays valid.
    pub fn save(&mut self) -> bool {
        let mut ok = self.storage.set(keys::PIPELINE, &self.manager);
        ok &= self
            .storage
            .set(keys::ACTIVE_CONFIGURATION, &self.active_configuration);
        if let Some(progress) = self
            .active_configuration
            .and_then(|id| self.manager.progress(id))
            .cloned()
        {
            ok &= self.storage.set(keys::PIPELINE_PROGRESS, &progress);
        }
        ok
    }

    pub fn manager(&self) -> &PipelineManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut PipelineManager {
        &mut self.manager
    }

    pub fn storage_mut(&mut self) -> &mut StorageAdapter<S> {
        &mut self.storage
    }

    pub fn artifacts(&self) -> &[StageArtifact] {
        &self.artifacts
    }

    pub fn active_configuration(&self) -> Option<Uuid> {
        self.active_configuration
    }

    pub fn set_active_configuration(&mut self, id: Uuid) {
        self.active_configuration = Some(id);
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Store a credential and persist it immediately
    pub fn set_credentials(&mut self, credentials: Credentials) -> bool {
        let saved = self.storage.save_credentials(&credentials);
        self.credentials = Some(credentials);
        saved
    }

    /// The most recent artifact in the ordered stage list
    pub fn latest_artifact(&self) -> Option<&StageArtifact> {
        self.artifacts.last()
    }

    /// Record a stage result: persist the artifact and, for a real (non
    /// sentinel) result, advance pipeline progress.
    ///
    /// Sentinel artifacts are kept for display but never move the pipeline
    /// forward. Returns whether progress advanced.
    pub fn record_stage_result(
        &mut self,
        configuration_id: Uuid,
        stage_id: &str,
        artifact: StageArtifact,
    ) -> Result<bool, PipelineError> {
        self.storage.save_artifact(&artifact);

        match self.artifacts.iter_mut().find(|a| a.id == artifact.id) {
            Some(slot) => *slot = artifact.clone(),
            None => self.artifacts.push(artifact.clone()),
        }

        if artifact.is_sentinel() {
            warn!(
                "Sentinel result for stage '{}', pipeline progress not advanced",
                stage_id
            );
            self.save();
            return Ok(false);
        }

        self.manager
            .update_progress(configuration_id, stage_id, artifact)?;
        self.save();
        Ok(true)
    }

    /// Prepare to regenerate a stage: drop progress and artifacts for that
    /// stage and everything after it, since later stages were generated
    /// against the old artifact as context.
    pub fn truncate_for_regeneration(&mut self, configuration_id: Uuid, stage_id: &str) {
        self.manager.truncate_before(configuration_id, stage_id);

        let kept: std::collections::HashSet<String> = self
            .manager
            .progress(configuration_id)
            .map(|p| p.stage_results.values().map(|a| a.id.clone()).collect())
            .unwrap_or_default();

        self.artifacts
            .retain(|a| kept.contains(&a.id) || a.is_sentinel());
        self.save();
    }
}
