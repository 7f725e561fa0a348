//! Mock chat collaborator for deterministic, fast tests

use async_trait::async_trait;
use stageforge::llm::ChatRequest;
use stageforge::{ChatClient, ChatError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Chat client that replays predefined responses in order
///
/// Useful for:
/// - Testing the two-pass generation flow (specification, then code)
/// - Testing sentinel degradation on malformed responses
/// - Testing multi-stage runs without network access
pub struct MockChatClient {
    responses: Arc<Vec<String>>,
    index: Arc<AtomicUsize>,
}

impl MockChatClient {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(responses),
            index: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// How many queued responses have not been consumed yet
    pub fn remaining(&self) -> usize {
        self.responses
            .len()
            .saturating_sub(self.index.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn complete(&self, _request: ChatRequest) -> Result<String, ChatError> {
        let i = self.index.fetch_add(1, Ordering::SeqCst);
        self.responses
            .get(i)
            .cloned()
            .ok_or(ChatError::MissingContent)
    }
}

/// A plausible specification-pass response for a stage
pub fn spec_response(title: &str) -> String {
    serde_json::json!({
        "title": title,
        "description": format!("{} for the themed game", title),
        "objectives": ["Render the play area", "Wire up input"],
        "features": ["Player movement"],
        "technical_requirements": ["requestAnimationFrame loop"],
        "validation_criteria": ["Game renders without errors"],
    })
    .to_string()
}

/// A plausible implementation-pass response for a stage
pub fn code_response(title: &str) -> String {
    serde_json::json!({
        "title": title,
        "description": format!("{} implementation", title),
        "html": "<canvas id=\"play\"></canvas>",
        "css": "#play { background: #000; width: 100%; height: 100%; }",
        "js": "let score = 0; function tick() { requestAnimationFrame(tick); } tick();",
    })
    .to_string()
}

#[tokio::test]
async fn test_mock_replays_in_order() {
    let client = MockChatClient::new(vec!["one".to_string(), "two".to_string()]);
    let request = ChatRequest {
        model: "m".to_string(),
        messages: vec![],
        response_format: stageforge::llm::ResponseFormat::json_object(),
        temperature: 0.0,
    };

    assert_eq!(client.complete(request.clone()).await.unwrap(), "one");
    assert_eq!(client.complete(request.clone()).await.unwrap(), "two");
    assert_eq!(client.remaining(), 0);
    assert!(matches!(
        client.complete(request).await,
        Err(ChatError::MissingContent)
    ));
}
