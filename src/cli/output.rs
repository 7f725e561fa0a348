//! CLI output formatting

use crate::core::manager::format_duration_secs;
use crate::core::{PipelineConfig, PipelineProgress, StageArtifact, StageTemplate};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");
pub static GAME: Emoji<'_, '_> = Emoji("🎮 ", "# ");

/// Spinner shown while a collaborator call is in flight
pub fn create_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap(),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Progress bar for multi-stage generation runs
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// One line per stage for the status listing
pub fn format_stage_row(
    stage: &StageTemplate,
    progress: Option<&PipelineProgress>,
) -> String {
    let (icon, state) = match progress {
        Some(p) if p.is_completed(&stage.id) => (CHECK, style("completed").green()),
        Some(p) if p.current_stage.as_deref() == Some(&stage.id) => {
            (SPINNER, style("current").yellow())
        }
        _ => (INFO, style("pending").dim()),
    };

    let optional = if stage.is_optional { " (optional)" } else { "" };
    format!(
        "  {} {} - {}{} [{}]",
        icon,
        style(&stage.name).bold(),
        state,
        optional,
        style(format!("{:?}", stage.estimated_complexity).to_lowercase()).cyan(),
    )
}

/// Summarize an artifact for listings
pub fn format_artifact_summary(artifact: &StageArtifact) -> String {
    let marker = if artifact.is_sentinel() {
        format!("{} ", CROSS)
    } else {
        format!("{} ", GAME)
    };
    format!(
        "{}{} - {} ({} bytes of script)",
        marker,
        style(&artifact.id).dim(),
        style(&artifact.title).bold(),
        style(artifact.js.len()).cyan(),
    )
}

/// Overall progress line for a configuration
pub fn format_progress_summary(config: &PipelineConfig, progress: &PipelineProgress) -> String {
    format!(
        "{} {} - {}/{} stages, {} remaining",
        ROCKET,
        style(&config.name).bold(),
        style(progress.completed_stages.len()).green(),
        config.selected().len(),
        style(format_duration_secs(progress.estimated_time_remaining_secs)).cyan(),
    )
}
