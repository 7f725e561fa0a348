//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{
    CredentialsCommand, DiagnoseCommand, ExportCommand, FixCommand, GenerateCommand,
    ImportCommand, PlanCommand, PreviewCommand, StatusCommand, ValidateCommand,
};

/// Staged HTML5 game generation driven by an LLM collaborator
#[derive(Debug, Parser, Clone)]
#[command(name = "stageforge")]
#[command(version = "0.1.0")]
#[command(about = "Incrementally generate a playable HTML5 game, one stage at a time", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Override the storage file location
    #[arg(long, global = true)]
    pub store: Option<String>,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Generate the next stage (or a named stage) of the game
    Generate(GenerateCommand),

    /// Re-submit a stage's code with an error description to get it fixed
    Fix(FixCommand),

    /// Validate a pipeline template file
    Validate(ValidateCommand),

    /// Show the execution plan for the active pipeline
    Plan(PlanCommand),

    /// Show pipeline progress and stored artifacts
    Status(StatusCommand),

    /// Write a stage's preview document to disk
    Preview(PreviewCommand),

    /// Inspect an environment snapshot for mount readiness
    Diagnose(DiagnoseCommand),

    /// Export the active configuration and its progress
    Export(ExportCommand),

    /// Import a previously exported configuration
    Import(ImportCommand),

    /// Store the API credential used for generation
    Credentials(CredentialsCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }
}
