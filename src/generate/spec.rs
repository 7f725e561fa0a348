//! Structured stage specification produced by the first collaborator pass

use serde::{Deserialize, Serialize};

/// Specification for one stage, as returned by the collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSpec {
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub objectives: Vec<String>,

    #[serde(default)]
    pub features: Vec<String>,

    #[serde(default)]
    pub technical_requirements: Vec<String>,

    #[serde(default)]
    pub ux_notes: Vec<String>,

    #[serde(default)]
    pub improvements: Vec<String>,

    #[serde(default)]
    pub dependencies: Vec<String>,

    #[serde(default)]
    pub complexity: Option<String>,

    #[serde(default)]
    pub estimated_duration: Option<String>,

    #[serde(default)]
    pub validation_criteria: Vec<String>,
}

impl StageSpec {
    /// Render the fixed-section markdown documentation for an artifact
    pub fn render_markdown(&self) -> String {
        let mut md = String::new();
        md.push_str(&format!("# {}\n\n", self.title));

        if !self.description.is_empty() {
            md.push_str(&format!("{}\n\n", self.description));
        }

        push_section(&mut md, "Objectives", &self.objectives);
        push_section(&mut md, "Features", &self.features);
        push_section(&mut md, "Technical Requirements", &self.technical_requirements);
        push_section(&mut md, "User Experience", &self.ux_notes);
        push_section(&mut md, "Improvements Over Previous Stage", &self.improvements);
        push_section(&mut md, "Depends On", &self.dependencies);

        if let Some(complexity) = &self.complexity {
            md.push_str(&format!("## Complexity\n\n{}\n\n", complexity));
        }
        if let Some(duration) = &self.estimated_duration {
            md.push_str(&format!("## Estimated Duration\n\n{}\n\n", duration));
        }

        push_section(&mut md, "Validation Criteria", &self.validation_criteria);

        md
    }
}

fn push_section(md: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    md.push_str(&format!("## {}\n\n", heading));
    for item in items {
        md.push_str(&format!("- {}\n", item));
    }
    md.push('\n');
}

/// Code artifact shape returned by the implementation pass
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedCode {
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub html: String,

    #[serde(default)]
    pub css: String,

    #[serde(default)]
    pub js: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_markdown_sections() {
        let spec = StageSpec {
            title: "Core Concept".to_string(),
            description: "The minimal loop".to_string(),
            objectives: vec!["Render the play area".to_string()],
            features: vec!["Player movement".to_string()],
            technical_requirements: vec![],
            ux_notes: vec![],
            improvements: vec![],
            dependencies: vec![],
            complexity: Some("low".to_string()),
            estimated_duration: Some("2 minutes".to_string()),
            validation_criteria: vec!["Game renders".to_string()],
        };

        let md = spec.render_markdown();
        assert!(md.starts_with("# Core Concept"));
        assert!(md.contains("## Objectives"));
        assert!(md.contains("- Render the play area"));
        assert!(md.contains("## Complexity"));
        assert!(md.contains("## Validation Criteria"));
        // Empty sections are omitted entirely
        assert!(!md.contains("## User Experience"));
    }

    #[test]
    fn test_spec_parses_with_missing_fields() {
        let spec: StageSpec = serde_json::from_str(r#"{"title": "Bare"}"#).unwrap();
        assert_eq!(spec.title, "Bare");
        assert!(spec.objectives.is_empty());
        assert!(spec.complexity.is_none());
    }
}
