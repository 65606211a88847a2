//! `docsmith revise <project> --brief <text> [--check <criterion>...]`

use anyhow::{Context, Result};
use clap::Args;

use docsmith_core::RevisionRequest;
use docsmith_daemon::request_revise;

/// Update a project's README for a revision brief.
#[derive(Args, Debug)]
pub struct ReviseArgs {
    /// Project id (see `docsmith status`).
    pub project: String,

    /// What changed in this round.
    #[arg(long, short = 'b')]
    pub brief: String,

    /// Replacement checklist for this round. Repeat for each criterion.
    #[arg(long = "check", short = 'c', value_name = "CRITERION")]
    pub checklist: Vec<String>,

    /// Send the request to the running daemon instead of generating in-process.
    #[arg(long)]
    pub daemon: bool,
}

impl ReviseArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let config = super::load_config(&home)?;
        let request = RevisionRequest {
            project: super::project_name(&self.project)?,
            brief: self.brief,
            checklist: (!self.checklist.is_empty()).then_some(self.checklist),
        };

        if self.daemon {
            let data = request_revise(&home, &request, config.daemon.shared_secret())
                .with_context(|| format!("daemon revise failed for '{}'", request.project))?;
            println!(
                "✓ Revised '{}' via daemon (revision {})",
                request.project, data["revision"]
            );
            return Ok(());
        }

        let orchestrator = super::orchestrator(&home, &config)?;
        let name = request.project.clone();
        let project = super::block_on(orchestrator.revise(request))?
            .map_err(super::explain_failure)?;
        println!("✓ Revised '{}' (revision {})", name, project.revision);
        println!(
            "  Run `docsmith diff {name} --from {} --to {}` to review.",
            project.revision - 1,
            project.revision
        );
        Ok(())
    }
}
