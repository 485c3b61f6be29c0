//! `continuum run` -- drive one continuation session end-to-end with the
//! deterministic demo generator.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;

use crate::cli::output;
use crate::domain::models::{TaskResult, TaskType};
use crate::domain::ports::{InMemoryPatternMemory, NullContextStore};
use crate::infrastructure::{ConfigLoader, DemoGenerator, Logging};
use crate::services::SessionManager;

/// Arguments for `continuum run`.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Path to a JSON-serialized initial TaskResult.
    #[arg(long, conflicts_with = "text")]
    pub input: Option<PathBuf>,

    /// Inline initial output text (alternative to --input).
    #[arg(long)]
    pub text: Option<String>,

    /// Task type for --text input.
    #[arg(long, default_value = "code")]
    pub task_type: TaskType,

    /// Configuration file (defaults to the .continuum/ hierarchy).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Suppress live progress output.
    #[arg(long)]
    pub quiet: bool,
}

/// Execute `continuum run`.
pub async fn execute(args: RunArgs, json: bool) -> Result<()> {
    let config = match &args.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };
    let _logging = Logging::init(&config.logging)?;

    let initial = load_initial(&args).await?;

    let manager = SessionManager::new(
        config,
        Arc::new(DemoGenerator::new()),
        None,
        Arc::new(NullContextStore::new()),
        Arc::new(InMemoryPatternMemory::new()),
    );

    let mut events = manager.subscribe();
    let session_id = manager.start(initial).await;

    let progress = (!json && !args.quiet).then(output::session_spinner);
    let progress_task = progress.map(|spinner| {
        tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                let quality = event
                    .current_quality
                    .map_or_else(|| "--".to_string(), |q| format!("{q:.2}"));
                spinner.set_message(format!(
                    "{} · iteration {} · quality {quality}",
                    event.state, event.iteration
                ));
                spinner.tick();
                if event.state.is_terminal() {
                    spinner.finish_with_message(format!("{}", event.state));
                    break;
                }
            }
        })
    });

    let consolidated = manager
        .wait(session_id)
        .await
        .context("continuation session failed")?;

    if let Some(mut task) = progress_task {
        // The terminal event normally arrives before the session result;
        // if it was lost to channel lag, do not wait on it forever.
        let drain = tokio::time::timeout(std::time::Duration::from_millis(500), &mut task).await;
        if drain.is_err() {
            task.abort();
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&consolidated)?);
    } else {
        println!("{}", output::summary_table(&consolidated));
        if !consolidated.history.is_empty() {
            println!("{}", output::history_table(&consolidated.history));
        }
        println!("\n{}\n{}", output::payload_heading(), consolidated.result.output);
    }
    Ok(())
}

async fn load_initial(args: &RunArgs) -> Result<TaskResult> {
    if let Some(path) = &args.input {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let result: TaskResult = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {} as a TaskResult", path.display()))?;
        Ok(result)
    } else if let Some(text) = &args.text {
        Ok(TaskResult::new(text.clone(), args.task_type))
    } else {
        bail!("provide an initial result via --input <file> or --text <string>");
    }
}
