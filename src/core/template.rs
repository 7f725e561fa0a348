//! Stage templates and template sets loaded from YAML

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Estimated complexity of a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl Complexity {
    /// Weight used for progress and time estimation
    pub fn weight(&self) -> u64 {
        match self {
            Complexity::Low => 1,
            Complexity::Medium => 2,
            Complexity::High => 3,
        }
    }
}

impl Default for Complexity {
    fn default() -> Self {
        Complexity::Medium
    }
}

/// A single stage template in a pipeline template set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTemplate {
    /// Unique stage identifier
    pub id: String,

    /// Human-readable stage name
    pub name: String,

    /// What this stage is about
    #[serde(default)]
    pub description: String,

    /// Concrete objectives the generated stage must meet
    #[serde(default)]
    pub objectives: Vec<String>,

    /// Focus areas (gameplay, visuals, audio, ...)
    #[serde(default)]
    pub focus: Vec<String>,

    /// Technical requirements passed through to the collaborator
    #[serde(default)]
    pub requirements: Vec<String>,

    /// List of stage IDs this stage depends on
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Estimated complexity (drives time estimates)
    #[serde(default)]
    pub estimated_complexity: Complexity,

    /// Whether this stage can be skipped
    #[serde(default)]
    pub is_optional: bool,
}

/// A declarative set of stage templates, authored in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSet {
    /// Template set identifier
    pub id: String,

    /// Template set name
    pub name: String,

    /// What kind of game pipeline this set describes
    #[serde(default)]
    pub description: String,

    /// Minimum number of stages a valid set may carry
    pub min_stages: usize,

    /// Maximum number of stages a valid set may carry
    pub max_stages: usize,

    /// Whether configurations built from this set may add custom stages
    #[serde(default)]
    pub allow_custom_stages: bool,

    /// Ordered stage templates
    pub stages: Vec<StageTemplate>,
}

impl TemplateSet {
    /// Load a template set from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse a template set from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let set: TemplateSet = serde_yaml::from_str(yaml)?;
        set.validate()?;
        Ok(set)
    }

    /// Validate the template set
    pub fn validate(&self) -> Result<()> {
        if self.stages.len() < self.min_stages || self.stages.len() > self.max_stages {
            anyhow::bail!(
                "Template set '{}' has {} stages, expected between {} and {}",
                self.id,
                self.stages.len(),
                self.min_stages,
                self.max_stages
            );
        }

        // Check that all stage IDs are unique
        let mut seen_ids = HashSet::new();
        for stage in &self.stages {
            if !seen_ids.insert(&stage.id) {
                anyhow::bail!("Duplicate stage ID: {}", stage.id);
            }
        }

        // Check that all dependencies reference existing stages
        let stage_ids: HashSet<_> = self.stages.iter().map(|s| &s.id).collect();
        for stage in &self.stages {
            for dep in &stage.dependencies {
                if !stage_ids.contains(dep) {
                    anyhow::bail!(
                        "Stage '{}' depends on non-existent stage '{}'",
                        stage.id,
                        dep
                    );
                }
            }
        }

        self.check_cycles()?;

        Ok(())
    }

    /// Boolean form of [`validate`](Self::validate), for callers that only
    /// need a yes/no answer
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Check for cycles in the stage dependency graph
    fn check_cycles(&self) -> Result<()> {
        let mut visited = HashSet::new();
        let mut recursion_stack = HashSet::new();

        for stage in &self.stages {
            if !visited.contains(&stage.id) {
                self.dfs_check(&stage.id, &mut visited, &mut recursion_stack)?;
            }
        }

        Ok(())
    }

    fn dfs_check(
        &self,
        stage_id: &str,
        visited: &mut HashSet<String>,
        recursion_stack: &mut HashSet<String>,
    ) -> Result<()> {
        visited.insert(stage_id.to_string());
        recursion_stack.insert(stage_id.to_string());

        if let Some(stage) = self.stages.iter().find(|s| s.id == stage_id) {
            for dep in &stage.dependencies {
                if recursion_stack.contains(dep) {
                    anyhow::bail!(
                        "Cycle detected in dependency graph involving stage '{}'",
                        dep
                    );
                }
                if !visited.contains(dep) {
                    self.dfs_check(dep, visited, recursion_stack)?;
                }
            }
        }

        recursion_stack.remove(stage_id);
        Ok(())
    }

    /// Get a stage by ID
    pub fn stage_by_id(&self, id: &str) -> Option<&StageTemplate> {
        self.stages.iter().find(|s| s.id == id)
    }

    /// Get a stage by position
    pub fn stage_at(&self, index: usize) -> Option<&StageTemplate> {
        self.stages.get(index)
    }

    /// Stages positioned after `completed_id` whose dependency set is empty
    /// or contains `completed_id`.
    ///
    /// This is a local successor heuristic used for suggestions; the
    /// authoritative readiness check lives on the pipeline manager.
    pub fn next_stages_after(&self, completed_id: &str) -> Vec<&StageTemplate> {
        let position = match self.stages.iter().position(|s| s.id == completed_id) {
            Some(p) => p,
            None => return Vec::new(),
        };

        self.stages[position + 1..]
            .iter()
            .filter(|s| {
                s.dependencies.is_empty() || s.dependencies.iter().any(|d| d == completed_id)
            })
            .collect()
    }
}

/// The built-in five-stage game pipeline
pub fn default_template_set() -> TemplateSet {
    TemplateSet {
        id: "classic-game".to_string(),
        name: "Classic Game Pipeline".to_string(),
        description: "Incrementally builds a playable HTML5 game in five stages".to_string(),
        min_stages: 3,
        max_stages: 8,
        allow_custom_stages: true,
        stages: vec![
            StageTemplate {
                id: "core-concept".to_string(),
                name: "Core Concept".to_string(),
                description: "A minimal playable core loop for the chosen theme".to_string(),
                objectives: vec![
                    "Render the play area and the player entity".to_string(),
                    "Implement the primary interaction loop".to_string(),
                    "Keep everything self-contained in one page".to_string(),
                ],
                focus: vec!["gameplay".to_string(), "structure".to_string()],
                requirements: vec![
                    "Single HTML container mount point".to_string(),
                    "requestAnimationFrame game loop".to_string(),
                ],
                dependencies: vec![],
                estimated_complexity: Complexity::Low,
                is_optional: false,
            },
            StageTemplate {
                id: "enhanced-mechanics".to_string(),
                name: "Enhanced Mechanics".to_string(),
                description: "Scoring, obstacles and difficulty on top of the core loop"
                    .to_string(),
                objectives: vec![
                    "Add a scoring model and win/lose conditions".to_string(),
                    "Introduce at least one obstacle or enemy type".to_string(),
                ],
                focus: vec!["gameplay".to_string(), "balance".to_string()],
                requirements: vec!["Extend the existing loop, do not rewrite it".to_string()],
                dependencies: vec!["core-concept".to_string()],
                estimated_complexity: Complexity::Medium,
                is_optional: false,
            },
            StageTemplate {
                id: "visual-polish".to_string(),
                name: "Visual Polish".to_string(),
                description: "Animations, particles and theme-consistent styling".to_string(),
                objectives: vec![
                    "Animate state transitions".to_string(),
                    "Apply a coherent visual theme".to_string(),
                ],
                focus: vec!["visuals".to_string()],
                requirements: vec!["CSS transitions where possible, canvas otherwise".to_string()],
                dependencies: vec!["enhanced-mechanics".to_string()],
                estimated_complexity: Complexity::Medium,
                is_optional: false,
            },
            StageTemplate {
                id: "ui-overlay".to_string(),
                name: "UI Overlay".to_string(),
                description: "Menus, HUD and pause/restart flow".to_string(),
                objectives: vec![
                    "Start, pause and game-over screens".to_string(),
                    "Persistent HUD with score and lives".to_string(),
                ],
                focus: vec!["ui".to_string()],
                requirements: vec!["Pointer and touch input for all controls".to_string()],
                dependencies: vec!["enhanced-mechanics".to_string()],
                estimated_complexity: Complexity::Medium,
                is_optional: true,
            },
            StageTemplate {
                id: "final-polish".to_string(),
                name: "Final Polish".to_string(),
                description: "Integration pass tying mechanics, visuals and UI together"
                    .to_string(),
                objectives: vec![
                    "Resolve interactions between all prior stages".to_string(),
                    "Tune difficulty and pacing".to_string(),
                ],
                focus: vec!["integration".to_string()],
                requirements: vec!["No regressions in earlier stage features".to_string()],
                dependencies: vec!["visual-polish".to_string(), "ui-overlay".to_string()],
                estimated_complexity: Complexity::High,
                is_optional: false,
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_set_is_valid() {
        let set = default_template_set();
        set.validate().expect("built-in template set should validate");
        assert_eq!(set.stages.len(), 5);
    }

    #[test]
    fn test_parse_template_set() {
        let yaml = r#"
id: "mini"
name: "Mini Pipeline"
min_stages: 1
max_stages: 4
stages:
  - id: "first"
    name: "First"
  - id: "second"
    name: "Second"
    dependencies: ["first"]
    estimated_complexity: high
"#;

        let set = TemplateSet::from_yaml(yaml).unwrap();
        assert_eq!(set.stages.len(), 2);
        assert_eq!(
            set.stage_by_id("second").unwrap().estimated_complexity,
            Complexity::High
        );
    }

    #[test]
    fn test_duplicate_stage_id_fails() {
        let yaml = r#"
id: "dup"
name: "Dup"
min_stages: 1
max_stages: 4
stages:
  - id: "first"
    name: "First"
  - id: "first"
    name: "Also First"
"#;

        assert!(TemplateSet::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_invalid_dependency_fails() {
        let yaml = r#"
id: "bad"
name: "Bad"
min_stages: 1
max_stages: 4
stages:
  - id: "first"
    name: "First"
    dependencies: ["nonexistent"]
"#;

        assert!(TemplateSet::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_cycle_fails() {
        let yaml = r#"
id: "cyclic"
name: "Cyclic"
min_stages: 1
max_stages: 4
stages:
  - id: "a"
    name: "A"
    dependencies: ["b"]
  - id: "b"
    name: "B"
    dependencies: ["a"]
"#;

        assert!(TemplateSet::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_stage_count_bounds() {
        let yaml = r#"
id: "tiny"
name: "Tiny"
min_stages: 3
max_stages: 8
stages:
  - id: "only"
    name: "Only"
"#;

        assert!(TemplateSet::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_next_stages_after() {
        let set = default_template_set();
        let next = set.next_stages_after("enhanced-mechanics");
        let ids: Vec<_> = next.iter().map(|s| s.id.as_str()).collect();
        assert!(ids.contains(&"visual-polish"));
        assert!(ids.contains(&"ui-overlay"));
        // final-polish does not name enhanced-mechanics directly
        assert!(!ids.contains(&"final-polish"));
    }

    #[test]
    fn test_unknown_id_queries_are_empty() {
        let set = default_template_set();
        assert!(set.stage_by_id("missing").is_none());
        assert!(set.stage_at(99).is_none());
        assert!(set.next_stages_after("missing").is_empty());
    }
}
