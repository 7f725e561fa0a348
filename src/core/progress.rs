//! Pipeline progress tracking

use crate::core::artifact::StageArtifact;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Progress of one pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineProgress {
    /// The configuration this progress belongs to
    pub configuration_id: Uuid,

    /// Completed stage IDs, in completion order
    pub completed_stages: Vec<String>,

    /// The stage currently up for execution, if any stage remains
    pub current_stage: Option<String>,

    /// Generated artifacts keyed by stage ID
    pub stage_results: HashMap<String, StageArtifact>,

    /// Fraction of stages completed (0.0 to 1.0)
    pub total_progress: f64,

    /// Estimated seconds of generation work remaining
    pub estimated_time_remaining_secs: u64,
}

impl PipelineProgress {
    /// Create an empty progress record for a configuration
    pub fn new(configuration_id: Uuid) -> Self {
        Self {
            configuration_id,
            completed_stages: Vec::new(),
            current_stage: None,
            stage_results: HashMap::new(),
            total_progress: 0.0,
            estimated_time_remaining_secs: 0,
        }
    }

    /// Whether the given stage has been completed
    pub fn is_completed(&self, stage_id: &str) -> bool {
        self.completed_stages.iter().any(|s| s == stage_id)
    }

    /// The most recently completed artifact, if any
    pub fn latest_result(&self) -> Option<&StageArtifact> {
        self.completed_stages
            .last()
            .and_then(|id| self.stage_results.get(id))
    }
}
