//! stageforge - staged HTML5 game generation driven by an LLM collaborator

pub mod cli;
pub mod core;
pub mod diagnostics;
pub mod generate;
pub mod harness;
pub mod llm;
pub mod persistence;
pub mod session;

// Re-export commonly used types
pub use core::{
    default_template_set, Complexity, PipelineConfig, PipelineError, PipelineManager,
    PipelineProgress, StageArtifact, StageTemplate, TemplateSet,
};
pub use generate::{OrchestratorError, StageOrchestrator};
pub use harness::{MountPhase, MountPolicy, MountSession};
pub use llm::{ChatClient, ChatError, Credentials, HttpChatClient};
pub use persistence::{FileStore, KeyValueStore, MemoryStore, StorageAdapter};
pub use session::Session;
