mod cli;
mod core;
mod diagnostics;
mod generate;
mod harness;
mod llm;
mod persistence;
mod session;

use anyhow::{bail, Context, Result};
use cli::commands::{
    CredentialsCommand, DiagnoseCommand, ExportCommand, FixCommand, GenerateCommand,
    ImportCommand, PlanCommand, PreviewCommand, StatusCommand, ValidateCommand,
};
use cli::output::*;
use cli::{Cli, Command};
use crate::core::{default_template_set, PipelineConfig, StageArtifact, StageTemplate, TemplateSet};
use diagnostics::{is_environment_ready, run_diagnostics, EnvironmentSnapshot};
use generate::StageOrchestrator;
use harness::{MountPolicy, MountSession, RendererBinding, GAME_CONTAINER_ID};
use llm::{Credentials, HttpChatClient};
use persistence::FileStore;
use session::Session;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    let store = match &cli.store {
        Some(path) => FileStore::open(path)?,
        None => FileStore::open_default("stageforge")?,
    };
    let mut session = Session::load(store);

    // Execute command
    match &cli.command {
        Command::Generate(cmd) => generate_stages(cmd, &mut session).await?,
        Command::Fix(cmd) => fix_stage(cmd, &mut session).await?,
        Command::Validate(cmd) => validate_template(cmd)?,
        Command::Plan(cmd) => show_plan(cmd, &mut session)?,
        Command::Status(cmd) => show_status(cmd, &session)?,
        Command::Preview(cmd) => write_preview(cmd, &session)?,
        Command::Diagnose(cmd) => diagnose(cmd)?,
        Command::Export(cmd) => export_configuration(cmd, &session)?,
        Command::Import(cmd) => import_configuration(cmd, &mut session)?,
        Command::Credentials(cmd) => store_credentials(cmd, &mut session).await?,
    }

    Ok(())
}

/// Ensure there is an active configuration, creating one from the requested
/// template when the command starts a fresh pipeline.
fn ensure_configuration(
    cmd: &GenerateCommand,
    session: &mut Session<FileStore>,
) -> Result<Uuid> {
    if cmd.template.is_none() {
        if let Some(id) = session.active_configuration() {
            return Ok(id);
        }
    }

    let theme = cmd
        .theme
        .clone()
        .context("--theme is required when starting a new pipeline")?;
    let set = match &cmd.template {
        Some(path) => TemplateSet::from_file(path)
            .with_context(|| format!("Failed to load template set from {}", path))?,
        None => default_template_set(),
    };

    let name = set.name.clone();
    let description = set.description.clone();
    let id = session
        .manager_mut()
        .create_configuration(&name, &description, &theme, &set);
    session.manager_mut().initialize_progress(id)?;
    session.set_active_configuration(id);
    session.save();

    println!(
        "{} Started pipeline {} for theme {}",
        ROCKET,
        style(&name).bold(),
        style(&theme).cyan()
    );
    Ok(id)
}

fn build_orchestrator(
    session: &Session<FileStore>,
) -> Result<StageOrchestrator<HttpChatClient>> {
    match session.credentials().filter(|c| c.is_usable()) {
        Some(credentials) => {
            let model = credentials.model.clone();
            let client = HttpChatClient::new(credentials.clone())
                .map_err(|e| anyhow::anyhow!("Failed to build chat client: {}", e))?;
            Ok(StageOrchestrator::new(Some(client), model))
        }
        None => Ok(StageOrchestrator::new(None, llm::types::DEFAULT_MODEL)),
    }
}

async fn generate_stages(cmd: &GenerateCommand, session: &mut Session<FileStore>) -> Result<()> {
    let config_id = ensure_configuration(cmd, session)?;

    if cmd.regenerate {
        let stage = cmd
            .stage
            .as_deref()
            .context("--regenerate requires --stage")?;
        session.truncate_for_regeneration(config_id, stage);
        println!(
            "{} Discarded results for {} and everything after it",
            WARN,
            style(stage).bold()
        );
    }

    let orchestrator = build_orchestrator(session)?;
    let mut first_pass = true;

    let bar = if cmd.all {
        let total = session
            .manager()
            .stages_for_configuration(config_id)
            .len();
        let done = session
            .manager()
            .progress(config_id)
            .map(|p| p.completed_stages.len())
            .unwrap_or(0);
        let bar = create_progress_bar(total);
        bar.set_position(done as u64);
        Some(bar)
    } else {
        None
    };

    loop {
        let available = session.manager().next_available_stages(config_id);
        let target: StageTemplate = match (&cmd.stage, first_pass) {
            (Some(stage_id), true) => available
                .iter()
                .find(|s| s.id == *stage_id)
                .cloned()
                .with_context(|| {
                    format!(
                        "Stage '{}' is not available; its dependencies may be incomplete",
                        stage_id
                    )
                })?,
            _ => match available.into_iter().next() {
                Some(stage) => stage,
                None => {
                    if first_pass {
                        println!("{} All stages are completed", CHECK);
                    }
                    break;
                }
            },
        };
        first_pass = false;

        let config: PipelineConfig = session
            .manager()
            .configuration(config_id)
            .context("Active configuration disappeared")?
            .clone();
        let stage_index = config
            .selected()
            .iter()
            .position(|s| s.id == target.id)
            .unwrap_or(0);
        let prior: Option<StageArtifact> = session
            .manager()
            .progress(config_id)
            .and_then(|p| p.latest_result())
            .cloned();

        let spinner = match &bar {
            Some(bar) => {
                bar.set_message(format!("Generating '{}'", target.name));
                None
            }
            None => Some(create_spinner(&format!("Generating stage '{}'", target.name))),
        };
        let artifact = orchestrator
            .generate_stage(
                &target,
                stage_index,
                &config,
                prior.as_ref(),
                cmd.feedback.as_deref(),
            )
            .await;
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }

        let is_sentinel = artifact.is_sentinel();
        let title = artifact.title.clone();
        session.record_stage_result(config_id, &target.id, artifact)?;

        if is_sentinel {
            if let Some(bar) = &bar {
                bar.abandon();
            }
            println!("{} {}", CROSS, style(&title).red());
            std::process::exit(1);
        }

        if let Some(bar) = &bar {
            bar.inc(1);
        }
        println!(
            "{} Generated {} ({})",
            CHECK,
            style(&title).bold(),
            style(&target.id).dim()
        );
        if let Some(progress) = session.manager().progress(config_id) {
            println!("{}", format_progress_summary(&config, progress));
        }

        if !cmd.all {
            break;
        }
    }

    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    Ok(())
}

async fn fix_stage(cmd: &FixCommand, session: &mut Session<FileStore>) -> Result<()> {
    let config_id = session
        .active_configuration()
        .context("No active pipeline; generate a stage first")?;

    let stage_id = match &cmd.stage {
        Some(stage) => stage.clone(),
        None => session
            .manager()
            .progress(config_id)
            .and_then(|p| p.completed_stages.last().cloned())
            .context("No completed stage to fix")?,
    };
    let artifact = session
        .manager()
        .progress(config_id)
        .and_then(|p| p.stage_results.get(&stage_id))
        .cloned()
        .with_context(|| format!("No stored artifact for stage '{}'", stage_id))?;

    let orchestrator = build_orchestrator(session)?;
    let spinner = create_spinner(&format!("Fixing stage '{}'", stage_id));
    let fixed = orchestrator.fix_artifact(&artifact, &cmd.error).await;
    spinner.finish_and_clear();

    match fixed {
        Ok(fixed) => {
            session.record_stage_result(config_id, &stage_id, fixed)?;
            println!("{} Applied fix to {}", CHECK, style(&stage_id).bold());
            Ok(())
        }
        Err(e) => {
            println!("{} Fix failed: {}", CROSS, style(&e).red());
            std::process::exit(1);
        }
    }
}

fn validate_template(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating template set...", INFO);

    match TemplateSet::from_file(&cmd.file) {
        Ok(set) => {
            println!("{} Template set is valid!", CHECK);
            println!("  Name: {}", style(&set.name).bold());
            println!("  Stages: {}", style(set.stages.len()).cyan());
            println!(
                "  Bounds: {}..={}",
                style(set.min_stages).cyan(),
                style(set.max_stages).cyan()
            );

            if cmd.json {
                println!("\n{}", serde_json::to_string_pretty(&set)?);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(e).red());
            std::process::exit(1);
        }
    }
}

fn show_plan(cmd: &PlanCommand, session: &mut Session<FileStore>) -> Result<()> {
    let config_id = session
        .active_configuration()
        .context("No active pipeline; generate a stage first")?;

    session
        .manager_mut()
        .set_parallel_execution(config_id, cmd.parallel);

    let plan = session.manager().execution_plan(config_id)?;

    if cmd.json {
        let batches: Vec<Vec<&str>> = plan
            .iter()
            .map(|b| b.iter().map(|s| s.id.as_str()).collect())
            .collect();
        println!("{}", serde_json::to_string_pretty(&batches)?);
        return Ok(());
    }

    println!("{} Execution plan ({} batches):", INFO, plan.len());
    for (i, batch) in plan.iter().enumerate() {
        let names: Vec<&str> = batch.iter().map(|s| s.name.as_str()).collect();
        println!("  {}: {}", style(i + 1).cyan(), names.join(", "));
    }
    Ok(())
}

fn show_status(cmd: &StatusCommand, session: &Session<FileStore>) -> Result<()> {
    let config_id = session
        .active_configuration()
        .context("No active pipeline; generate a stage first")?;
    let config = session
        .manager()
        .configuration(config_id)
        .context("Active configuration disappeared")?;
    let progress = session.manager().progress(config_id);

    if cmd.json {
        let data = serde_json::json!({
            "configuration": config,
            "progress": progress,
            "artifacts": session.artifacts().iter().map(|a| &a.id).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    match progress {
        Some(progress) => println!("{}", format_progress_summary(config, progress)),
        None => println!("{} {} - not started", ROCKET, style(&config.name).bold()),
    }
    for stage in config.selected() {
        println!("{}", format_stage_row(stage, progress));
    }

    if !session.artifacts().is_empty() {
        println!("\n{} Stored artifacts:", INFO);
        for artifact in session.artifacts() {
            println!("  {}", format_artifact_summary(artifact));
        }
    }
    Ok(())
}

fn write_preview(cmd: &PreviewCommand, session: &Session<FileStore>) -> Result<()> {
    let artifact = match &cmd.stage {
        Some(stage) => session
            .artifacts()
            .iter()
            .rev()
            .find(|a| a.id.starts_with(stage.as_str()))
            .with_context(|| format!("No artifact for stage '{}'", stage))?,
        None => session
            .latest_artifact()
            .context("No artifact to preview; generate a stage first")?,
    };

    let binding = RendererBinding::for_availability(cmd.with_renderer);
    let mut mount = MountSession::new(MountPolicy::Lenient);

    let content = if cmd.fragment {
        let (doc, _signals) = mount.mount(artifact, binding);
        format!(
            "<div id=\"{}\">\n{}\n</div>\n<style>\n{}\n</style>\n<script>\n{}\n</script>\n",
            GAME_CONTAINER_ID, doc.html, doc.css, doc.script
        )
    } else {
        let (srcdoc, _signals) = mount.mount_iframe(artifact, binding);
        srcdoc
    };

    std::fs::write(&cmd.out, content)
        .with_context(|| format!("Failed to write {}", cmd.out))?;
    println!(
        "{} Wrote preview of {} to {}",
        GAME,
        style(&artifact.title).bold(),
        style(&cmd.out).cyan()
    );
    Ok(())
}

fn diagnose(cmd: &DiagnoseCommand) -> Result<()> {
    let raw = std::fs::read_to_string(&cmd.snapshot)
        .with_context(|| format!("Failed to read {}", cmd.snapshot))?;
    let snapshot: EnvironmentSnapshot =
        serde_json::from_str(&raw).context("Malformed environment snapshot")?;

    if cmd.preflight {
        let check = is_environment_ready(&snapshot);
        if cmd.json {
            println!("{}", serde_json::to_string_pretty(&check)?);
        } else if check.ready {
            println!("{} Environment is ready for a mount", CHECK);
        } else {
            println!("{} Environment is not ready:", CROSS);
            for issue in &check.issues {
                println!("  {}", style(issue).red());
            }
        }
        if !check.ready {
            std::process::exit(1);
        }
        return Ok(());
    }

    let report = run_diagnostics(&snapshot);
    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{} Diagnostics report:", INFO);
    println!(
        "  WebGL: {}  WebGL2: {}  Storage: {}",
        style(report.webgl).cyan(),
        style(report.webgl2).cyan(),
        style(report.storage_available).cyan()
    );
    println!(
        "  Viewport: {}x{}  Platform: {}",
        report.viewport.0, report.viewport.1, report.platform
    );
    for warning in &report.warnings {
        println!("  {} {}", WARN, style(warning).yellow());
    }
    for error in &report.errors {
        println!("  {} {}", CROSS, style(error).red());
    }
    Ok(())
}

fn export_configuration(cmd: &ExportCommand, session: &Session<FileStore>) -> Result<()> {
    let config_id = session
        .active_configuration()
        .context("No active pipeline to export")?;
    let data = session.manager().export_configuration(config_id)?;

    match &cmd.out {
        Some(path) => {
            std::fs::write(path, &data).with_context(|| format!("Failed to write {}", path))?;
            println!("{} Exported configuration to {}", CHECK, style(path).cyan());
        }
        None => println!("{}", data),
    }
    Ok(())
}

fn import_configuration(cmd: &ImportCommand, session: &mut Session<FileStore>) -> Result<()> {
    let data = std::fs::read_to_string(&cmd.file)
        .with_context(|| format!("Failed to read {}", cmd.file))?;
    let id = session.manager_mut().import_configuration(&data)?;

    if cmd.activate {
        session.set_active_configuration(id);
    }
    session.save();

    println!(
        "{} Imported configuration as {}",
        CHECK,
        style(id).cyan()
    );
    Ok(())
}

async fn store_credentials(
    cmd: &CredentialsCommand,
    session: &mut Session<FileStore>,
) -> Result<()> {
    let mut credentials = Credentials::new(cmd.api_key.clone());
    if let Some(base_url) = &cmd.base_url {
        credentials.base_url = base_url.clone();
    }
    if let Some(model) = &cmd.model {
        credentials.model = model.clone();
    }
    if !credentials.is_usable() {
        bail!("API key must not be empty");
    }

    if cmd.validate {
        let client = HttpChatClient::new(credentials.clone())
            .map_err(|e| anyhow::anyhow!("Failed to build chat client: {}", e))?;
        match client.validate_credentials().await {
            Ok(()) => println!("{} Credential accepted by the endpoint", CHECK),
            Err(e) => {
                println!("{} Credential rejected: {}", CROSS, style(&e).red());
                std::process::exit(1);
            }
        }
    }

    session.set_credentials(credentials);
    println!("{} Credential stored", CHECK);
    Ok(())
}
