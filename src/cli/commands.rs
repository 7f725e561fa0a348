//! CLI command definitions

use clap::Args;

/// Generate the next stage of the game
#[derive(Debug, Args, Clone)]
pub struct GenerateCommand {
    /// Game theme, required when starting a fresh pipeline
    #[arg(short, long)]
    pub theme: Option<String>,

    /// Pipeline template YAML to start from (defaults to the built-in set)
    #[arg(short = 'f', long)]
    pub template: Option<String>,

    /// Stage to generate; defaults to the next available stage
    #[arg(short, long)]
    pub stage: Option<String>,

    /// Regenerate the stage, discarding it and everything after it
    #[arg(long)]
    pub regenerate: bool,

    /// Feedback to fold into the stage specification
    #[arg(long)]
    pub feedback: Option<String>,

    /// Generate every remaining stage in order
    #[arg(long)]
    pub all: bool,
}

/// Fix a broken stage
#[derive(Debug, Args, Clone)]
pub struct FixCommand {
    /// Stage whose artifact should be fixed; defaults to the latest
    #[arg(short, long)]
    pub stage: Option<String>,

    /// Description of the observed error
    #[arg(short, long)]
    pub error: String,
}

/// Validate a pipeline template file
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to template YAML file
    #[arg(short, long)]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Show the execution plan
#[derive(Debug, Args, Clone)]
pub struct PlanCommand {
    /// Plan with dependency-batched parallel stages
    #[arg(long)]
    pub parallel: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Show pipeline progress
#[derive(Debug, Args, Clone)]
pub struct StatusCommand {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Write a stage's preview document to disk
#[derive(Debug, Args, Clone)]
pub struct PreviewCommand {
    /// Stage to preview; defaults to the latest artifact
    #[arg(short, long)]
    pub stage: Option<String>,

    /// Output file path
    #[arg(short, long, default_value = "preview.html")]
    pub out: String,

    /// Emit an in-page fragment bundle instead of a full iframe document
    #[arg(long)]
    pub fragment: bool,

    /// Assume the real 3D library is available (skip the stand-in)
    #[arg(long)]
    pub with_renderer: bool,
}

/// Inspect an environment snapshot
#[derive(Debug, Args, Clone)]
pub struct DiagnoseCommand {
    /// Path to an environment snapshot JSON file
    #[arg(short, long)]
    pub snapshot: String,

    /// Only run the stricter pre-flight readiness subset
    #[arg(long)]
    pub preflight: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Export the active configuration
#[derive(Debug, Args, Clone)]
pub struct ExportCommand {
    /// Output file path; stdout when omitted
    #[arg(short, long)]
    pub out: Option<String>,
}

/// Import a configuration export
#[derive(Debug, Args, Clone)]
pub struct ImportCommand {
    /// Path to the export file
    #[arg(short, long)]
    pub file: String,

    /// Make the imported configuration the active one
    #[arg(long)]
    pub activate: bool,
}

/// Store the API credential
#[derive(Debug, Args, Clone)]
pub struct CredentialsCommand {
    /// API key for the chat-completion endpoint
    #[arg(long)]
    pub api_key: String,

    /// Base URL of an OpenAI-compatible endpoint
    #[arg(long)]
    pub base_url: Option<String>,

    /// Model identifier
    #[arg(long)]
    pub model: Option<String>,

    /// Validate the credential against the endpoint before storing
    #[arg(long)]
    pub validate: bool,
}
