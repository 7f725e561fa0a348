//! Pipeline manager - configurations, progress and execution planning

use crate::core::{
    artifact::StageArtifact,
    pipeline::PipelineConfig,
    progress::PipelineProgress,
    template::{StageTemplate, TemplateSet},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Seconds of generation time per complexity weight unit
pub const SECS_PER_COMPLEXITY_UNIT: u64 = 90;

/// Version string written into configuration exports
pub const EXPORT_VERSION: &str = "1.0";

/// Errors surfaced by pipeline manager operations
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Unknown configuration: {0}")]
    UnknownConfiguration(Uuid),

    #[error("Unknown stage '{stage}' in configuration {configuration}")]
    UnknownStage { configuration: Uuid, stage: String },

    #[error("No schedulable stage among remaining stages {remaining:?} - dependency cycle or unresolved reference")]
    ScheduleCycle { remaining: Vec<String> },

    #[error("Invalid configuration export: {0}")]
    InvalidImport(String),
}

/// Serialized export of one configuration plus its progress
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationExport {
    pub configuration: PipelineConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<PipelineProgress>,
    #[serde(rename = "exportedAt")]
    pub exported_at: DateTime<Utc>,
    pub version: String,
}

/// In-memory cache of pipeline configurations and their progress.
///
/// Constructed once at application start; persistence load/save are explicit
/// lifecycle hooks on the owning session, not implicit side effects here.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PipelineManager {
    configurations: HashMap<Uuid, PipelineConfig>,
    progress: HashMap<Uuid, PipelineProgress>,
}

impl PipelineManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh configuration from a template set and register it
    pub fn create_configuration(
        &mut self,
        name: &str,
        description: &str,
        theme: &str,
        set: &TemplateSet,
    ) -> Uuid {
        let config = PipelineConfig::from_template(name, description, theme, set);
        let id = config.id;
        info!("Created configuration {} from template '{}'", id, set.id);
        self.configurations.insert(id, config);
        id
    }

    /// Look up a configuration
    pub fn configuration(&self, id: Uuid) -> Option<&PipelineConfig> {
        self.configurations.get(&id)
    }

    /// Progress record for a configuration, if any stage has been executed
    pub fn progress(&self, configuration_id: Uuid) -> Option<&PipelineProgress> {
        self.progress.get(&configuration_id)
    }

    /// All registered configurations
    pub fn configurations(&self) -> impl Iterator<Item = &PipelineConfig> {
        self.configurations.values()
    }

    /// Selected stages of a configuration, in configured order
    pub fn stages_for_configuration(&self, id: Uuid) -> Vec<StageTemplate> {
        self.configurations
            .get(&id)
            .map(|c| c.selected().into_iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Replace the configured stage order.
    ///
    /// Rejects (no mutation) when the proposed order violates dependency
    /// precedence or references unknown stages. Every dependency of a stage
    /// at position `i` must appear at a position strictly before `i`.
    pub fn update_stage_order(&mut self, id: Uuid, ordered_ids: Vec<String>) -> bool {
        let config = match self.configurations.get(&id) {
            Some(c) => c,
            None => return false,
        };

        let positions: HashMap<&str, usize> = ordered_ids
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), i))
            .collect();

        for (i, stage_id) in ordered_ids.iter().enumerate() {
            let stage = match config.stage(stage_id) {
                Some(s) => s,
                None => {
                    warn!("Rejecting stage order: unknown stage '{}'", stage_id);
                    return false;
                }
            };
            for dep in &stage.dependencies {
                match positions.get(dep.as_str()) {
                    Some(&dep_pos) if dep_pos < i => {}
                    _ => {
                        warn!(
                            "Rejecting stage order: '{}' placed before its dependency '{}'",
                            stage_id, dep
                        );
                        return false;
                    }
                }
            }
        }

        if let Some(config) = self.configurations.get_mut(&id) {
            config.selected_stages = ordered_ids;
        }
        true
    }

    /// Toggle dependency-batched parallel planning for a configuration
    pub fn set_parallel_execution(&mut self, id: Uuid, allow: bool) -> bool {
        match self.configurations.get_mut(&id) {
            Some(config) => {
                config.allow_parallel = allow;
                true
            }
            None => false,
        }
    }

    /// Authoritative readiness test: a stage is available iff it is not yet
    /// completed and every one of its dependencies is completed.
    ///
    /// With no progress record only the entry stage is offered.
    pub fn next_available_stages(&self, id: Uuid) -> Vec<StageTemplate> {
        let config = match self.configurations.get(&id) {
            Some(c) => c,
            None => return Vec::new(),
        };

        let progress = match self.progress.get(&id) {
            Some(p) => p,
            None => {
                return config.entry_stage().cloned().into_iter().collect();
            }
        };

        let completed: HashSet<&str> =
            progress.completed_stages.iter().map(|s| s.as_str()).collect();

        config
            .selected()
            .into_iter()
            .filter(|s| {
                !completed.contains(s.id.as_str())
                    && s.dependencies.iter().all(|d| completed.contains(d.as_str()))
            })
            .cloned()
            .collect()
    }

    /// Whether the given stage may be executed right now
    pub fn can_execute_stage(&self, stage_id: &str, configuration_id: Uuid) -> bool {
        self.next_available_stages(configuration_id)
            .iter()
            .any(|s| s.id == stage_id)
    }

    /// Create the progress record for a configuration's first run
    pub fn initialize_progress(&mut self, id: Uuid) -> Result<&PipelineProgress, PipelineError> {
        let config = self
            .configurations
            .get(&id)
            .ok_or(PipelineError::UnknownConfiguration(id))?;

        let mut progress = PipelineProgress::new(id);
        progress.current_stage = config.entry_stage().map(|s| s.id.clone());
        progress.estimated_time_remaining_secs = config
            .selected()
            .iter()
            .map(|s| s.estimated_complexity.weight() * SECS_PER_COMPLEXITY_UNIT)
            .sum();

        Ok(self.progress.entry(id).or_insert(progress))
    }

    /// Record a successful stage result and advance the pipeline.
    ///
    /// Appends the stage to the completed set, stores the artifact,
    /// recomputes the current stage, overall progress and remaining time.
    pub fn update_progress(
        &mut self,
        configuration_id: Uuid,
        stage_id: &str,
        artifact: StageArtifact,
    ) -> Result<(), PipelineError> {
        let config = self
            .configurations
            .get(&configuration_id)
            .ok_or(PipelineError::UnknownConfiguration(configuration_id))?;

        if config.stage(stage_id).is_none() {
            return Err(PipelineError::UnknownStage {
                configuration: configuration_id,
                stage: stage_id.to_string(),
            });
        }

        let total = config.selected().len();
        let stage_weights: Vec<(String, u64)> = config
            .selected()
            .iter()
            .map(|s| {
                (
                    s.id.clone(),
                    s.estimated_complexity.weight() * SECS_PER_COMPLEXITY_UNIT,
                )
            })
            .collect();

        {
            let progress = self
                .progress
                .entry(configuration_id)
                .or_insert_with(|| PipelineProgress::new(configuration_id));

            if !progress.is_completed(stage_id) {
                progress.completed_stages.push(stage_id.to_string());
            }
            progress.stage_results.insert(stage_id.to_string(), artifact);
            progress.total_progress = if total == 0 {
                0.0
            } else {
                progress.completed_stages.len() as f64 / total as f64
            };
        }

        // Recompute derived fields with the mutable borrow released
        let completed: HashSet<String> = self.progress[&configuration_id]
            .completed_stages
            .iter()
            .cloned()
            .collect();
        let next = self
            .next_available_stages(configuration_id)
            .first()
            .map(|s| s.id.clone());
        let secs: u64 = stage_weights
            .iter()
            .filter(|(id, _)| !completed.contains(id))
            .map(|(_, w)| w)
            .sum();

        if let Some(progress) = self.progress.get_mut(&configuration_id) {
            progress.current_stage = next;
            progress.estimated_time_remaining_secs = secs;

            info!(
                "Stage '{}' completed for configuration {} ({}/{})",
                stage_id,
                configuration_id,
                progress.completed_stages.len(),
                total
            );
        }

        Ok(())
    }

    /// Truncate progress to everything strictly before `stage_id`, in
    /// preparation for regenerating that stage. Later stages depend on the
    /// regenerated artifact as textual context, so their results are dropped.
    pub fn truncate_before(&mut self, configuration_id: Uuid, stage_id: &str) {
        if let Some(progress) = self.progress.get_mut(&configuration_id) {
            if let Some(pos) = progress.completed_stages.iter().position(|s| s == stage_id) {
                let dropped: Vec<String> = progress.completed_stages.split_off(pos);
                for id in &dropped {
                    progress.stage_results.remove(id);
                }
                progress.current_stage = Some(stage_id.to_string());
                warn!(
                    "Truncated {} stage result(s) at and after '{}' for regeneration",
                    dropped.len(),
                    stage_id
                );
            }
        }
    }

    /// Percentage of selected stages represented by `completed_ids`
    pub fn calculate_progress(&self, configuration_id: Uuid, completed_ids: &[String]) -> f64 {
        let total = self
            .configurations
            .get(&configuration_id)
            .map(|c| c.selected().len())
            .unwrap_or(0);
        if total == 0 {
            return 0.0;
        }
        (completed_ids.len() as f64 / total as f64) * 100.0
    }

    /// Complexity-weighted time estimate over not-yet-completed stages,
    /// formatted for display
    pub fn estimated_time_remaining(
        &self,
        configuration_id: Uuid,
        completed_ids: &[String],
    ) -> String {
        let done: HashSet<&str> = completed_ids.iter().map(|s| s.as_str()).collect();
        let secs: u64 = self
            .configurations
            .get(&configuration_id)
            .map(|c| {
                c.selected()
                    .iter()
                    .filter(|s| !done.contains(s.id.as_str()))
                    .map(|s| s.estimated_complexity.weight() * SECS_PER_COMPLEXITY_UNIT)
                    .sum()
            })
            .unwrap_or(0);

        format_duration_secs(secs)
    }

    /// Compute the execution plan as ordered batches.
    ///
    /// Sequential configurations get one stage per batch in configured
    /// order. Parallel configurations get a topological layering where each
    /// batch holds every stage whose dependencies are satisfied by prior
    /// batches combined. Fails if stages remain but none is schedulable.
    pub fn execution_plan(
        &self,
        configuration_id: Uuid,
    ) -> Result<Vec<Vec<StageTemplate>>, PipelineError> {
        let config = self
            .configurations
            .get(&configuration_id)
            .ok_or(PipelineError::UnknownConfiguration(configuration_id))?;

        let stages = config.selected();

        if !config.allow_parallel {
            return Ok(stages.into_iter().map(|s| vec![s.clone()]).collect());
        }

        let mut scheduled: HashSet<String> = HashSet::new();
        let mut remaining: Vec<&StageTemplate> = stages;
        let mut batches = Vec::new();

        while !remaining.is_empty() {
            // Dependencies outside the selected set are never satisfied, so a
            // stage referencing one ends up in the cycle error below.
            let (ready, blocked): (Vec<_>, Vec<_>) = remaining
                .into_iter()
                .partition(|s| s.dependencies.iter().all(|d| scheduled.contains(d)));

            if ready.is_empty() {
                return Err(PipelineError::ScheduleCycle {
                    remaining: blocked.iter().map(|s| s.id.clone()).collect(),
                });
            }

            for stage in &ready {
                scheduled.insert(stage.id.clone());
            }
            batches.push(ready.into_iter().cloned().collect());
            remaining = blocked;
        }

        Ok(batches)
    }

    /// Serialize a configuration (plus any progress) for export
    pub fn export_configuration(&self, id: Uuid) -> Result<String, PipelineError> {
        let configuration = self
            .configurations
            .get(&id)
            .ok_or(PipelineError::UnknownConfiguration(id))?
            .clone();

        let export = ConfigurationExport {
            configuration,
            progress: self.progress.get(&id).cloned(),
            exported_at: Utc::now(),
            version: EXPORT_VERSION.to_string(),
        };

        serde_json::to_string_pretty(&export)
            .map_err(|e| PipelineError::InvalidImport(e.to_string()))
    }

    /// Import a previously exported configuration.
    ///
    /// A fresh ID is assigned to avoid collisions with existing
    /// configurations and any embedded progress is re-keyed to it.
    pub fn import_configuration(&mut self, data: &str) -> Result<Uuid, PipelineError> {
        let export: ConfigurationExport =
            serde_json::from_str(data).map_err(|e| PipelineError::InvalidImport(e.to_string()))?;

        let mut configuration = export.configuration;
        let fresh_id = Uuid::new_v4();
        configuration.id = fresh_id;

        if let Some(mut progress) = export.progress {
            progress.configuration_id = fresh_id;
            self.progress.insert(fresh_id, progress);
        }
        self.configurations.insert(fresh_id, configuration);

        info!("Imported configuration as {}", fresh_id);
        Ok(fresh_id)
    }
}

/// Format seconds as a compact human-readable duration
pub fn format_duration_secs(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
