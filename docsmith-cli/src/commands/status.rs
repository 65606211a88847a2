//! `docsmith status`: projects and where each one is in its lifecycle.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use docsmith_core::{FsProjectStore, Project, ProjectState, ProjectStore};

/// Arguments for `docsmith status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct ProjectStatusJson {
    name: String,
    task: String,
    state: String,
    revision: u32,
    updated_at: String,
    last_brief: String,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "project")]
    project: String,
    #[tabled(rename = "state")]
    state: String,
    #[tabled(rename = "revision")]
    revision: u32,
    #[tabled(rename = "updated")]
    updated: String,
    #[tabled(rename = "last brief")]
    last_brief: String,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let projects = FsProjectStore::at(&home)
            .list()
            .context("failed to list projects")?;

        if self.json {
            let payload: Vec<ProjectStatusJson> = projects
                .iter()
                .map(|p| ProjectStatusJson {
                    name: p.name.0.clone(),
                    task: p.task.clone(),
                    state: p.state().to_string(),
                    revision: p.revision,
                    updated_at: p.updated_at.to_rfc3339(),
                    last_brief: last_brief(p).to_string(),
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
            );
            return Ok(());
        }

        println!(
            "Docsmith v{} | {} projects",
            env!("CARGO_PKG_VERSION"),
            projects.len()
        );
        if projects.is_empty() {
            println!("No projects yet. Run `docsmith scaffold` first.");
            return Ok(());
        }

        let rows: Vec<StatusTableRow> = projects
            .iter()
            .map(|p| StatusTableRow {
                project: p.name.0.clone(),
                state: state_label(p.state()),
                revision: p.revision,
                updated: p.updated_at.format("%Y-%m-%d %H:%M").to_string(),
                last_brief: truncate(last_brief(p), 48),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}

fn last_brief(project: &Project) -> &str {
    project
        .revisions
        .last()
        .map(|r| r.text.as_str())
        .unwrap_or(project.brief.as_str())
}

fn state_label(state: ProjectState) -> String {
    match state {
        ProjectState::Empty => "EMPTY".bright_black().to_string(),
        ProjectState::Scaffolded => "SCAFFOLDED".green().to_string(),
        ProjectState::Revised(n) => format!("REVISED ×{n}").cyan().to_string(),
    }
}

fn truncate(text: &str, max: usize) -> String {
    let first_line = text.lines().next().unwrap_or_default();
    if first_line.chars().count() <= max {
        return first_line.to_string();
    }
    let cut: String = first_line.chars().take(max.saturating_sub(1)).collect();
    format!("{cut}…")
}
