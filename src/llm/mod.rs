//! LLM collaborator boundary
//!
//! The collaborator is an opaque chat-completion service: prompt in,
//! JSON-encoded content out. Everything past this trait is someone else's
//! problem.

pub mod client;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use client::HttpChatClient;
pub use types::{ChatMessage, ChatRequest, Credentials, ResponseFormat};

/// Errors from the chat collaborator
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Response content missing")]
    MissingContent,

    #[error("Failed to parse response: {0}")]
    Parse(String),
}

/// Trait for chat-completion execution - allows for different implementations
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send one chat-completion request and return the message content
    async fn complete(&self, request: ChatRequest) -> Result<String, ChatError>;
}
