//! Prompt builders for the two-pass stage generation flow
//!
//! Pure functions from template + theme + prior-stage data to prompt text,
//! unit-testable without any network call.

use crate::core::artifact::StageArtifact;
use crate::core::pipeline::PipelineConfig;
use crate::core::template::{Complexity, StageTemplate};
use crate::harness::GAME_CONTAINER_ID;

/// Upper bound on prior-stage documentation quoted into a prompt
pub const PRIOR_DOC_EXCERPT_LIMIT: usize = 1500;

/// Complexity-specific guidance included in the specification prompt
pub fn complexity_guidance(complexity: Complexity) -> &'static str {
    match complexity {
        Complexity::Low => {
            "Keep the scope small: one mechanic, minimal state, no more than a \
             few hundred lines of script. Prefer clarity over cleverness."
        }
        Complexity::Medium => {
            "Balance scope and polish: a handful of interacting mechanics with \
             clean state management. Structure the script so later stages can \
             extend it."
        }
        Complexity::High => {
            "This is an integration stage: reconcile all prior mechanics, \
             resolve conflicts between systems, and tune the overall \
             experience. Expect to touch most of the existing code."
        }
    }
}

/// Build the specification-pass prompt
pub fn build_specification_prompt(
    template: &StageTemplate,
    stage_index: usize,
    theme: &str,
    config: &PipelineConfig,
    prior: Option<&StageArtifact>,
    feedback: Option<&str>,
) -> String {
    let mut prompt = format!(
        "You are designing stage {} (\"{}\") of an incrementally built HTML5 game.\n\
         Game theme: {}\n\n\
         Stage description: {}\n",
        stage_index + 1,
        template.name,
        theme,
        template.description,
    );

    push_list(&mut prompt, "Objectives", &template.objectives);
    push_list(&mut prompt, "Focus areas", &template.focus);
    push_list(&mut prompt, "Technical requirements", &template.requirements);

    prompt.push_str(&format!(
        "\nComplexity guidance: {}\n",
        complexity_guidance(template.estimated_complexity)
    ));

    // Names and descriptions of declared dependency stages
    if !template.dependencies.is_empty() {
        prompt.push_str("\nThis stage builds on:\n");
        for dep in &template.dependencies {
            if let Some(dep_stage) = config.stage(dep) {
                prompt.push_str(&format!("- {}: {}\n", dep_stage.name, dep_stage.description));
            }
        }
    }

    if let Some(prior) = prior {
        prompt.push_str(&format!(
            "\nThe most recent completed stage is \"{}\": {}\n",
            prior.title, prior.description
        ));
        if let Some(md) = &prior.md {
            let excerpt: String = md.chars().take(PRIOR_DOC_EXCERPT_LIMIT).collect();
            prompt.push_str(&format!("\nIts documentation (excerpt):\n{}\n", excerpt));
        }
    }

    if let Some(feedback) = feedback {
        prompt.push_str(&format!("\nUser feedback to incorporate:\n{}\n", feedback));
    }

    prompt.push_str(
        "\nRespond with a single JSON object with the keys: title, description, \
         objectives, features, technical_requirements, ux_notes, improvements, \
         dependencies, complexity, estimated_duration, validation_criteria. \
         List values must be arrays of strings.",
    );

    prompt
}

/// Build the implementation-pass prompt from a rendered specification
pub fn build_implementation_prompt(spec_json: &str, prior: Option<&StageArtifact>) -> String {
    let mut prompt = format!(
        "Implement the following HTML5 game stage specification as a \
         self-contained bundle of markup, styles and script.\n\n\
         Specification:\n{}\n\n\
         Rules:\n\
         - The markup must mount inside the element with id \"{}\".\n\
         - Initialize on the DOMContentLoaded event.\n\
         - Use requestAnimationFrame for any animation loop.\n\
         - Handle both pointer and touch input.\n\
         - Reference assets with relative paths only.\n",
        spec_json, GAME_CONTAINER_ID,
    );

    if let Some(prior) = prior {
        prompt.push_str(&format!(
            "\nThe previous stage's code follows. EXTEND it - keep its working \
             mechanics intact and build the new stage on top; do not replace it.\n\n\
             Previous HTML:\n{}\n\nPrevious CSS:\n{}\n\nPrevious JS:\n{}\n",
            prior.html, prior.css, prior.js,
        ));
    }

    prompt.push_str(
        "\nRespond with a single JSON object with the keys: title, description, \
         html, css, js. The html/css/js values are the complete stage bundle.",
    );

    prompt
}

/// Build the fix prompt: current code plus the observed error and the fixed
/// browser-compatibility requirements.
pub fn build_fix_prompt(artifact: &StageArtifact, error_description: &str) -> String {
    format!(
        "The following HTML5 game stage has a problem. Fix it while keeping \
         the rest of the behavior unchanged.\n\n\
         Reported problem:\n{}\n\n\
         Current HTML:\n{}\n\nCurrent CSS:\n{}\n\nCurrent JS:\n{}\n\n\
         Browser-compatibility requirements the fixed code must satisfy:\n\
         - Initialize on the DOMContentLoaded event.\n\
         - Mount into the element with id \"{}\".\n\
         - Reference assets with relative paths only.\n\
         - Handle both pointer and touch input.\n\
         - Use requestAnimationFrame for animation loops.\n\n\
         Respond with a single JSON object with the keys: title, description, \
         html, css, js.",
        error_description, artifact.html, artifact.css, artifact.js, GAME_CONTAINER_ID,
    )
}

fn push_list(prompt: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    prompt.push_str(&format!("\n{}:\n", heading));
    for item in items {
        prompt.push_str(&format!("- {}\n", item));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::template::default_template_set;

    fn config() -> PipelineConfig {
        PipelineConfig::from_template("Run", "", "space adventure", &default_template_set())
    }

    #[test]
    fn test_specification_prompt_includes_template_data() {
        let config = config();
        let template = config.stage("enhanced-mechanics").unwrap();

        let prompt =
            build_specification_prompt(template, 1, "space adventure", &config, None, None);

        assert!(prompt.contains("stage 2"));
        assert!(prompt.contains("space adventure"));
        assert!(prompt.contains("scoring model"));
        // Dependency context names the dependency stage
        assert!(prompt.contains("Core Concept"));
    }

    #[test]
    fn test_specification_prompt_bounds_prior_doc() {
        let config = config();
        let template = config.stage("visual-polish").unwrap();
        let prior = StageArtifact {
            id: "enhanced-mechanics-1".to_string(),
            title: "Enhanced Mechanics".to_string(),
            description: "Scoring added".to_string(),
            html: String::new(),
            css: String::new(),
            js: String::new(),
            md: Some("m".repeat(PRIOR_DOC_EXCERPT_LIMIT * 3)),
        };

        let prompt =
            build_specification_prompt(template, 2, "t", &config, Some(&prior), None);

        let excerpt_len = prompt.matches('m').count();
        assert!(excerpt_len <= PRIOR_DOC_EXCERPT_LIMIT + 100);
        assert!(prompt.contains("Enhanced Mechanics"));
    }

    #[test]
    fn test_implementation_prompt_extends_prior_code() {
        let prior = StageArtifact {
            id: "core-concept-1".to_string(),
            title: "Core".to_string(),
            description: String::new(),
            html: "<canvas id=\"play\"></canvas>".to_string(),
            css: String::new(),
            js: "let score = 0;".to_string(),
            md: None,
        };

        let prompt = build_implementation_prompt("{\"title\":\"x\"}", Some(&prior));
        assert!(prompt.contains("EXTEND"));
        assert!(prompt.contains("let score = 0;"));
        assert!(prompt.contains(GAME_CONTAINER_ID));
    }

    #[test]
    fn test_fix_prompt_lists_compat_requirements() {
        let artifact = StageArtifact {
            id: "core-concept-1".to_string(),
            title: "Core".to_string(),
            description: String::new(),
            html: String::new(),
            css: String::new(),
            js: "boom(".to_string(),
            md: None,
        };

        let prompt = build_fix_prompt(&artifact, "SyntaxError: unexpected end of input");
        assert!(prompt.contains("SyntaxError"));
        assert!(prompt.contains("DOMContentLoaded"));
        assert!(prompt.contains("requestAnimationFrame"));
        assert!(prompt.contains("touch"));
    }
}
