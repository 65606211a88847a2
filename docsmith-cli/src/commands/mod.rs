pub mod daemon;
pub mod diff;
pub mod export;
pub mod history;
pub mod init;
pub mod revise;
pub mod scaffold;
pub mod show;
pub mod status;

use std::future::Future;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use colored::Colorize;

use docsmith_core::{Config, FsProjectStore, Project, ProjectName, ProjectStore};
use docsmith_daemon::build_orchestrator;
use docsmith_sync::{OrchestratorError, RevisionOrchestrator};

pub(crate) fn home() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}

pub(crate) fn load_config(home: &Path) -> Result<Config> {
    docsmith_core::config::load_at(home).context("failed to load ~/.docsmith/config.yaml")
}

/// A project name as typed on the command line; must already be a slug.
pub(crate) fn project_name(name: &str) -> Result<ProjectName> {
    Ok(ProjectName::parse(name)?)
}

pub(crate) fn load_project(home: &Path, name: &str) -> Result<Project> {
    FsProjectStore::at(home)
        .load(&project_name(name)?)
        .with_context(|| format!("failed to load project '{name}'"))?
        .ok_or_else(|| anyhow!("project '{name}' not found; run `docsmith scaffold` first"))
}

/// Orchestrator for an in-process scaffold or revise.
pub(crate) fn orchestrator(home: &Path, config: &Config) -> Result<RevisionOrchestrator> {
    build_orchestrator(home, config).with_context(|| {
        format!(
            "failed to set up generation (is ${} set?)",
            config.generation.api_key_env
        )
    })
}

/// Drive one async orchestrator call to completion on a fresh runtime.
pub(crate) fn block_on<F: Future>(future: F) -> Result<F::Output> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;
    Ok(runtime.block_on(future))
}

/// Turn an orchestrator failure into a CLI error, printing the conflict diff
/// when the README was rejected.
pub(crate) fn explain_failure(err: OrchestratorError) -> anyhow::Error {
    if let Some(report) = err.conflict() {
        eprintln!("{}", format!("✗ {}", report.message).red().bold());
        print_diff(&report.diff);
    }
    if matches!(err, OrchestratorError::GenerationUnavailable { .. }) {
        eprintln!("The project is unchanged; try again later.");
    }
    anyhow::Error::new(err)
}

pub(crate) fn print_diff(diff: &str) {
    for line in diff.lines() {
        if line.starts_with("+++") || line.starts_with("---") {
            println!("{}", line.bold());
        } else if line.starts_with('+') {
            println!("{}", line.green());
        } else if line.starts_with('-') {
            println!("{}", line.red());
        } else if line.starts_with("@@") {
            println!("{}", line.cyan());
        } else {
            println!("{line}");
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
