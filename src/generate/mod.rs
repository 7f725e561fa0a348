//! Stage generation: prompt construction, collaborator orchestration and the
//! structured specification the first pass produces

pub mod orchestrator;
pub mod prompts;
pub mod spec;

pub use orchestrator::{OrchestratorError, StageOrchestrator};
pub use spec::{GeneratedCode, StageSpec};
