//! HTTP chat-completion client for OpenAI-compatible endpoints

use crate::llm::types::{ChatRequest, ChatResponse, Credentials};
use crate::llm::{ChatClient, ChatError};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Chat client talking to an OpenAI-compatible chat-completion endpoint
#[derive(Debug, Clone)]
pub struct HttpChatClient {
    client: Client,
    credentials: Credentials,
}

impl HttpChatClient {
    pub fn new(credentials: Credentials) -> Result<Self, ChatError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ChatError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            credentials,
        })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Lightweight credential check against the models-listing endpoint.
    ///
    /// A 2xx means the credential is valid; anything else is reported with
    /// the server-provided message.
    pub async fn validate_credentials(&self) -> Result<(), ChatError> {
        let url = format!("{}/models", self.credentials.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.credentials.api_key)
            .send()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!("Credential validated against {}", url);
            Ok(())
        } else {
            let message = response.text().await.unwrap_or_default();
            warn!("Credential validation failed: {} {}", status, message);
            Err(ChatError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl ChatClient for HttpChatClient {
    async fn complete(&self, request: ChatRequest) -> Result<String, ChatError> {
        let url = format!("{}/chat/completions", self.credentials.base_url);
        debug!("Chat request to {} with model {}", url, request.model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.credentials.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ChatError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Parse(e.to_string()))?;

        body.choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or(ChatError::MissingContent)
    }
}
