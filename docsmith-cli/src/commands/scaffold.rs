//! `docsmith scaffold <task> --brief <text> --check <criterion>...`

use anyhow::{Context, Result};
use clap::Args;

use docsmith_core::{Project, ScaffoldRequest};
use docsmith_daemon::request_scaffold;

/// Generate the first README for a task.
#[derive(Args, Debug)]
pub struct ScaffoldArgs {
    /// Task name; the project id is derived from it.
    pub task: String,

    /// What the application should do.
    #[arg(long, short = 'b')]
    pub brief: String,

    /// Evaluation criterion. Repeat for each one.
    #[arg(long = "check", short = 'c', value_name = "CRITERION", required = true)]
    pub checklist: Vec<String>,

    /// Send the request to the running daemon instead of generating in-process.
    #[arg(long)]
    pub daemon: bool,
}

impl ScaffoldArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let config = super::load_config(&home)?;
        let request = ScaffoldRequest {
            task: self.task,
            brief: self.brief,
            checklist: self.checklist,
        };

        if self.daemon {
            let data = request_scaffold(&home, &request, config.daemon.shared_secret())
                .context("daemon scaffold failed")?;
            println!(
                "✓ Scaffolded '{}' via daemon (revision {})",
                data["name"].as_str().unwrap_or("?"),
                data["revision"]
            );
            return Ok(());
        }

        let orchestrator = super::orchestrator(&home, &config)?;
        let project = super::block_on(orchestrator.scaffold(request))?
            .map_err(super::explain_failure)?;
        print_scaffolded(&project);
        Ok(())
    }
}

fn print_scaffolded(project: &Project) {
    println!("✓ Scaffolded '{}' (revision 0)", project.name);
    println!("  Task: {}", project.task);
    println!("  Checklist: {} criteria", project.checklist.len());
    println!("  Run `docsmith show {}` to read it.", project.name);
}
