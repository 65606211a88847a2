//! `docsmith diff <project>`: unified diff between two README revisions.

use anyhow::{Context, Result};
use clap::Args;

use docsmith_core::FsProjectStore;
use docsmith_sync::diff_revisions;

/// Arguments for `docsmith diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    pub project: String,

    /// Older revision. Defaults to the one before `--to`.
    #[arg(long)]
    pub from: Option<u32>,

    /// Newer revision. Defaults to the latest.
    #[arg(long)]
    pub to: Option<u32>,
}

impl DiffArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let project = super::load_project(&home, &self.project)?;

        let to = self.to.unwrap_or(project.revision);
        let from = self.from.unwrap_or(to.saturating_sub(1));
        let result = diff_revisions(
            &FsProjectStore::at(&home),
            &super::project_name(&self.project)?,
            from,
            to,
        )
        .with_context(|| format!("diff failed for '{}'", self.project))?;

        if result.is_empty() {
            println!("No differences for '{}' between r{from} and r{to}.", result.project);
            return Ok(());
        }
        super::print_diff(&result.unified_diff);
        Ok(())
    }
}
