//! Stage artifact domain model

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Markdown documentation above this size is dropped when an artifact is
/// compressed for storage.
pub const MD_COMPRESSION_CUTOFF: usize = 16 * 1024;

/// Title marker used by the missing-credential sentinel
pub const MISSING_KEY_MARKER: &str = "API Key Required";

/// Title marker used by the generation-failure sentinel
pub const GENERATION_ERROR_MARKER: &str = "Generation Error";

/// The concrete generated output of one pipeline stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageArtifact {
    /// Stable identifier, assigned at creation (storage and routing key)
    pub id: String,

    /// Stage title from the collaborator
    pub title: String,

    /// Short description of what this stage adds
    pub description: String,

    /// Markup fragment mounted into the game container
    pub html: String,

    /// Styles scoped to the stage
    pub css: String,

    /// Game script
    pub js: String,

    /// Synthesized markdown documentation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md: Option<String>,
}

impl StageArtifact {
    /// Sentinel artifact for the missing-credential condition.
    ///
    /// Consumers must treat any artifact whose title carries
    /// [`MISSING_KEY_MARKER`] as non-generative output, not a playable stage.
    pub fn missing_credentials(theme: &str, template_name: &str) -> Self {
        let message = format!(
            "No API credential is configured, so the '{}' stage for the '{}' theme \
             could not be generated. Add a credential and regenerate this stage.",
            template_name, theme
        );

        StageArtifact {
            id: format!("error-missing-key-{}", chrono::Utc::now().timestamp_millis()),
            title: format!("{}: {}", MISSING_KEY_MARKER, template_name),
            description: message.clone(),
            html: format!(
                "<div class=\"stage-error\"><h2>{}</h2><p>{}</p></div>",
                MISSING_KEY_MARKER, message
            ),
            css: ".stage-error { padding: 2rem; color: #b91c1c; font-family: sans-serif; }"
                .to_string(),
            js: String::new(),
            md: Some(format!("# {}\n\n{}\n", MISSING_KEY_MARKER, message)),
        }
    }

    /// Sentinel artifact for a collaborator transport or parse failure.
    ///
    /// Embeds the failure message in every renderable field so the UI always
    /// has something to show in place of the game.
    pub fn generation_failure(theme: &str, template_name: &str, error: &str) -> Self {
        let message = format!(
            "Generating the '{}' stage for the '{}' theme failed: {}",
            template_name, theme, error
        );

        StageArtifact {
            id: format!("error-generation-{}", chrono::Utc::now().timestamp_millis()),
            title: format!("{}: {}", GENERATION_ERROR_MARKER, template_name),
            description: message.clone(),
            html: format!(
                "<div class=\"stage-error\"><h2>{}</h2><p>{}</p></div>",
                GENERATION_ERROR_MARKER, message
            ),
            css: ".stage-error { padding: 2rem; color: #b91c1c; font-family: sans-serif; }"
                .to_string(),
            js: format!("console.log({});", serde_json::json!(message)),
            md: Some(format!("# {}\n\n{}\n", GENERATION_ERROR_MARKER, message)),
        }
    }

    /// Whether this artifact is a failure sentinel rather than a playable stage
    pub fn is_sentinel(&self) -> bool {
        self.title.contains(MISSING_KEY_MARKER) || self.title.contains(GENERATION_ERROR_MARKER)
    }

    /// Serialize for storage, dropping markdown documentation above the
    /// size cutoff. Artifacts whose `md` is under the cutoff round-trip
    /// exactly through [`decompress`](Self::decompress).
    pub fn compress(&self) -> String {
        let mut copy = self.clone();
        if copy.md.as_ref().is_some_and(|md| md.len() > MD_COMPRESSION_CUTOFF) {
            copy.md = None;
        }
        // In-memory serialization of plain string fields cannot fail
        serde_json::to_string(&copy).unwrap_or_default()
    }

    /// Parse an artifact previously produced by [`compress`](Self::compress)
    pub fn decompress(data: &str) -> Result<StageArtifact> {
        Ok(serde_json::from_str(data)?)
    }

    /// Size-reduced copy used for the "minimal latest" storage key
    pub fn to_minimal(&self) -> StageArtifact {
        let mut copy = self.clone();
        copy.md = None;
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(md_len: usize) -> StageArtifact {
        StageArtifact {
            id: "core-concept-1".to_string(),
            title: "Core Concept".to_string(),
            description: "Minimal loop".to_string(),
            html: "<div id=\"game\"></div>".to_string(),
            css: "#game { width: 100%; }".to_string(),
            js: "console.log('hi');".to_string(),
            md: Some("x".repeat(md_len)),
        }
    }

    #[test]
    fn test_compress_round_trip_below_cutoff() {
        let artifact = sample(128);
        let restored = StageArtifact::decompress(&artifact.compress()).unwrap();
        assert_eq!(restored, artifact);
    }

    #[test]
    fn test_compress_drops_oversized_md() {
        let artifact = sample(MD_COMPRESSION_CUTOFF + 1);
        let restored = StageArtifact::decompress(&artifact.compress()).unwrap();
        assert!(restored.md.is_none());
        // All other fields survive untouched
        assert_eq!(restored.html, artifact.html);
        assert_eq!(restored.js, artifact.js);
    }

    #[test]
    fn test_sentinel_markers() {
        let missing = StageArtifact::missing_credentials("space adventure", "Core Concept");
        assert!(missing.is_sentinel());
        assert!(missing.title.contains("API Key"));
        assert!(missing.html.contains("stage-error"));

        let failed = StageArtifact::generation_failure("space adventure", "Core Concept", "502");
        assert!(failed.is_sentinel());
        assert!(failed.description.contains("502"));

        assert!(!sample(0).is_sentinel());
    }
}
