//! Core domain models: templates, configurations, progress, artifacts

pub mod artifact;
pub mod manager;
pub mod pipeline;
pub mod progress;
pub mod template;

pub use artifact::StageArtifact;
pub use manager::{PipelineError, PipelineManager};
pub use pipeline::PipelineConfig;
pub use progress::PipelineProgress;
pub use template::{default_template_set, Complexity, StageTemplate, TemplateSet};
