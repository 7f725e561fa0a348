//! Pipeline configuration domain model

use crate::core::template::{StageTemplate, TemplateSet};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A concrete pipeline configuration built from a template set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Unique configuration ID
    pub id: Uuid,

    /// Configuration name
    pub name: String,

    /// Configuration description
    #[serde(default)]
    pub description: String,

    /// The game theme this pipeline generates for
    pub theme: String,

    /// ID of the template set this configuration was built from
    pub template_id: String,

    /// Stage templates copied from the template set
    pub stages: Vec<StageTemplate>,

    /// User-authored stages added on top of the template set
    #[serde(default)]
    pub custom_stages: Vec<StageTemplate>,

    /// Ordered stage IDs selected for execution
    pub selected_stages: Vec<String>,

    /// Whether independent stages may be batched together
    #[serde(default)]
    pub allow_parallel: bool,
}

impl PipelineConfig {
    /// Build a fresh configuration from a template set.
    ///
    /// The template's stage list is copied in as-is and every stage is
    /// selected in template order.
    pub fn from_template(name: &str, description: &str, theme: &str, set: &TemplateSet) -> Self {
        PipelineConfig {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.to_string(),
            theme: theme.to_string(),
            template_id: set.id.clone(),
            stages: set.stages.clone(),
            custom_stages: Vec::new(),
            selected_stages: set.stages.iter().map(|s| s.id.clone()).collect(),
            allow_parallel: false,
        }
    }

    /// Look up a stage among template and custom stages
    pub fn stage(&self, id: &str) -> Option<&StageTemplate> {
        self.stages
            .iter()
            .chain(self.custom_stages.iter())
            .find(|s| s.id == id)
    }

    /// Union of template and custom stages, restricted to and ordered by
    /// the selected stage list
    pub fn selected(&self) -> Vec<&StageTemplate> {
        self.selected_stages
            .iter()
            .filter_map(|id| self.stage(id))
            .collect()
    }

    /// The first stage in configured order (pipeline entry point)
    pub fn entry_stage(&self) -> Option<&StageTemplate> {
        self.selected_stages.first().and_then(|id| self.stage(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::template::default_template_set;

    #[test]
    fn test_from_template_selects_all_stages() {
        let set = default_template_set();
        let config = PipelineConfig::from_template("Run", "", "space adventure", &set);

        assert_eq!(config.selected_stages.len(), set.stages.len());
        assert_eq!(config.entry_stage().unwrap().id, "core-concept");
        assert_eq!(config.theme, "space adventure");
    }

    #[test]
    fn test_selected_respects_order() {
        let set = default_template_set();
        let mut config = PipelineConfig::from_template("Run", "", "t", &set);
        config.selected_stages =
            vec!["enhanced-mechanics".to_string(), "core-concept".to_string()];

        let ids: Vec<_> = config.selected().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["enhanced-mechanics", "core-concept"]);
    }
}
