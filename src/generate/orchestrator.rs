//! Two-pass stage generation against a chat collaborator
//!
//! Each stage is produced by two sequential calls: a specification pass that
//! designs the stage, and an implementation pass that turns the specification
//! into runnable code. Generation never fails outright; when the collaborator
//! is unavailable or misbehaves, a sentinel artifact takes the stage's place
//! so the pipeline can keep moving.

use crate::core::artifact::StageArtifact;
use crate::core::pipeline::PipelineConfig;
use crate::core::template::StageTemplate;
use crate::generate::prompts;
use crate::generate::spec::{GeneratedCode, StageSpec};
use crate::llm::{ChatClient, ChatError, ChatMessage, ChatRequest, ResponseFormat};
use thiserror::Error;
use tracing::{info, warn};

/// Temperature for the specification pass
const SPEC_TEMPERATURE: f32 = 0.8;

/// Temperature for the implementation and fix passes
const CODE_TEMPERATURE: f32 = 0.4;

const SYSTEM_PROMPT: &str =
    "You are an expert HTML5 game developer collaborating on an incrementally \
     built game. Always answer with a single JSON object and nothing else.";

/// Errors from operations that are allowed to fail (fixing an artifact)
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("No API credential configured")]
    MissingCredentials,

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error("Collaborator returned malformed JSON: {0}")]
    Parse(String),
}

/// Drives stage generation through a chat collaborator
pub struct StageOrchestrator<C: ChatClient> {
    client: Option<C>,
    model: String,
}

impl<C: ChatClient> StageOrchestrator<C> {
    pub fn new(client: Option<C>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    /// Generate one stage artifact.
    ///
    /// Never returns an error: missing credentials and collaborator failures
    /// degrade to sentinel artifacts that carry the failure message in their
    /// renderable fields.
    pub async fn generate_stage(
        &self,
        template: &StageTemplate,
        stage_index: usize,
        config: &PipelineConfig,
        prior: Option<&StageArtifact>,
        feedback: Option<&str>,
    ) -> StageArtifact {
        let theme = config.theme.as_str();

        let client = match &self.client {
            Some(client) => client,
            None => {
                warn!("No collaborator client, emitting missing-credential stage");
                return StageArtifact::missing_credentials(theme, &template.name);
            }
        };

        match self
            .run_generation(client, template, stage_index, config, prior, feedback)
            .await
        {
            Ok(artifact) => artifact,
            Err(e) => {
                warn!("Stage '{}' generation failed: {}", template.id, e);
                StageArtifact::generation_failure(theme, &template.name, &e.to_string())
            }
        }
    }

    async fn run_generation(
        &self,
        client: &C,
        template: &StageTemplate,
        stage_index: usize,
        config: &PipelineConfig,
        prior: Option<&StageArtifact>,
        feedback: Option<&str>,
    ) -> Result<StageArtifact, OrchestratorError> {
        // Pass 1: design the stage
        let spec_prompt = prompts::build_specification_prompt(
            template,
            stage_index,
            &config.theme,
            config,
            prior,
            feedback,
        );
        let spec_json = self
            .request(client, &spec_prompt, SPEC_TEMPERATURE)
            .await?;
        let spec: StageSpec = parse_payload(&spec_json)?;
        info!("Stage '{}' specification: {}", template.id, spec.title);

        // Pass 2: implement it
        let impl_prompt = prompts::build_implementation_prompt(&spec_json, prior);
        let code_json = self
            .request(client, &impl_prompt, CODE_TEMPERATURE)
            .await?;
        let code: GeneratedCode = parse_payload(&code_json)?;

        Ok(StageArtifact {
            id: format!("{}-{}", template.id, chrono::Utc::now().timestamp_millis()),
            title: code.title,
            description: code.description,
            html: code.html,
            css: code.css,
            js: code.js,
            md: Some(spec.render_markdown()),
        })
    }

    /// Repair a broken artifact in place.
    ///
    /// Unlike generation this is an explicit user action, so a missing
    /// credential is a hard error rather than a sentinel. The artifact keeps
    /// its identifier; the documentation gains a record of the applied fix.
    pub async fn fix_artifact(
        &self,
        artifact: &StageArtifact,
        error_description: &str,
    ) -> Result<StageArtifact, OrchestratorError> {
        let client = self
            .client
            .as_ref()
            .ok_or(OrchestratorError::MissingCredentials)?;

        let prompt = prompts::build_fix_prompt(artifact, error_description);
        let code_json = self.request(client, &prompt, CODE_TEMPERATURE).await?;
        let code: GeneratedCode = parse_payload(&code_json)?;

        let md = match &artifact.md {
            Some(md) if md.contains("## Fixes Applied") => {
                format!("{}\n- {}\n", md.trim_end(), error_description)
            }
            Some(md) => format!(
                "{}\n\n## Fixes Applied\n\n- {}\n",
                md.trim_end(),
                error_description
            ),
            None => format!("## Fixes Applied\n\n- {}\n", error_description),
        };

        Ok(StageArtifact {
            id: artifact.id.clone(),
            title: code.title,
            description: code.description,
            html: code.html,
            css: code.css,
            js: code.js,
            md: Some(md),
        })
    }

    async fn request(
        &self,
        client: &C,
        prompt: &str,
        temperature: f32,
    ) -> Result<String, OrchestratorError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(prompt),
            ],
            response_format: ResponseFormat::json_object(),
            temperature,
        };
        Ok(client.complete(request).await?)
    }
}

fn parse_payload<T: serde::de::DeserializeOwned>(content: &str) -> Result<T, OrchestratorError> {
    serde_json::from_str(strip_code_fences(content))
        .map_err(|e| OrchestratorError::Parse(e.to_string()))
}

/// Tolerate collaborators that wrap JSON in a markdown code fence despite the
/// json_object response format.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::artifact::{GENERATION_ERROR_MARKER, MISSING_KEY_MARKER};
    use crate::core::template::default_template_set;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct QueuedClient {
        responses: Mutex<VecDeque<Result<String, ChatError>>>,
    }

    impl QueuedClient {
        fn new(responses: Vec<Result<String, ChatError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
            }
        }
    }

    #[async_trait]
    impl ChatClient for QueuedClient {
        async fn complete(&self, _request: ChatRequest) -> Result<String, ChatError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ChatError::MissingContent))
        }
    }

    fn config() -> PipelineConfig {
        PipelineConfig::from_template("Run", "", "space adventure", &default_template_set())
    }

    fn spec_json() -> String {
        r#"{"title": "Core Concept", "description": "Minimal loop",
            "objectives": ["Render the play area"]}"#
            .to_string()
    }

    fn code_json() -> String {
        r#"{"title": "Core Concept", "description": "Minimal loop",
            "html": "<canvas></canvas>", "css": "canvas { display: block; }",
            "js": "console.log('go');"}"#
            .to_string()
    }

    #[tokio::test]
    async fn test_generate_without_client_yields_sentinel() {
        let orchestrator: StageOrchestrator<QueuedClient> = StageOrchestrator::new(None, "m");
        let config = config();
        let template = config.stage("core-concept").unwrap();

        let artifact = orchestrator
            .generate_stage(template, 0, &config, None, None)
            .await;

        assert!(artifact.is_sentinel());
        assert!(artifact.title.contains(MISSING_KEY_MARKER));
    }

    #[tokio::test]
    async fn test_generate_runs_both_passes() {
        let client = QueuedClient::new(vec![Ok(spec_json()), Ok(code_json())]);
        let orchestrator = StageOrchestrator::new(Some(client), "m");
        let config = config();
        let template = config.stage("core-concept").unwrap();

        let artifact = orchestrator
            .generate_stage(template, 0, &config, None, None)
            .await;

        assert!(!artifact.is_sentinel());
        assert!(artifact.id.starts_with("core-concept-"));
        assert_eq!(artifact.html, "<canvas></canvas>");
        let md = artifact.md.unwrap();
        assert!(md.contains("# Core Concept"));
        assert!(md.contains("## Objectives"));
    }

    #[tokio::test]
    async fn test_generate_degrades_on_malformed_json() {
        let client = QueuedClient::new(vec![Ok("not json".to_string())]);
        let orchestrator = StageOrchestrator::new(Some(client), "m");
        let config = config();
        let template = config.stage("core-concept").unwrap();

        let artifact = orchestrator
            .generate_stage(template, 0, &config, None, None)
            .await;

        assert!(artifact.is_sentinel());
        assert!(artifact.title.contains(GENERATION_ERROR_MARKER));
    }

    #[tokio::test]
    async fn test_generate_degrades_on_transport_error() {
        let client = QueuedClient::new(vec![Err(ChatError::Transport(
            "connection refused".to_string(),
        ))]);
        let orchestrator = StageOrchestrator::new(Some(client), "m");
        let config = config();
        let template = config.stage("core-concept").unwrap();

        let artifact = orchestrator
            .generate_stage(template, 0, &config, None, None)
            .await;

        assert!(artifact.is_sentinel());
        assert!(artifact.description.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_fix_without_client_is_hard_error() {
        let orchestrator: StageOrchestrator<QueuedClient> = StageOrchestrator::new(None, "m");
        let artifact = StageArtifact::generation_failure("t", "Core Concept", "boom");

        let result = orchestrator.fix_artifact(&artifact, "boom").await;
        assert!(matches!(result, Err(OrchestratorError::MissingCredentials)));
    }

    #[tokio::test]
    async fn test_fix_preserves_id_and_records_fix() {
        let client = QueuedClient::new(vec![Ok(code_json())]);
        let orchestrator = StageOrchestrator::new(Some(client), "m");
        let artifact = StageArtifact {
            id: "core-concept-42".to_string(),
            title: "Core Concept".to_string(),
            description: String::new(),
            html: String::new(),
            css: String::new(),
            js: "boom(".to_string(),
            md: Some("# Core Concept\n".to_string()),
        };

        let fixed = orchestrator
            .fix_artifact(&artifact, "SyntaxError: unexpected end of input")
            .await
            .unwrap();

        assert_eq!(fixed.id, "core-concept-42");
        assert_eq!(fixed.js, "console.log('go');");
        let md = fixed.md.unwrap();
        assert!(md.contains("## Fixes Applied"));
        assert!(md.contains("SyntaxError"));
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("{\"a\": 1}"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
    }
}
