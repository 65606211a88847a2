//! `docsmith show <project> [--revision <n>]`

use anyhow::{anyhow, Context, Result};
use clap::Args;

use docsmith_core::{FsProjectStore, ProjectStore};

/// Print a project's README.
#[derive(Args, Debug)]
pub struct ShowArgs {
    pub project: String,

    /// Print the README accepted at this revision instead of the latest.
    #[arg(long, short = 'r')]
    pub revision: Option<u32>,
}

impl ShowArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let project = super::load_project(&home, &self.project)?;

        let readme = match self.revision {
            None => project.readme,
            Some(revision) => FsProjectStore::at(&home)
                .load_revision(&super::project_name(&self.project)?, revision)
                .with_context(|| format!("failed to read revision {revision}"))?
                .ok_or_else(|| {
                    anyhow!(
                        "project '{}' has no revision {revision} (latest is {})",
                        self.project,
                        project.revision
                    )
                })?,
        };

        print!("{readme}");
        if !readme.ends_with('\n') {
            println!();
        }
        Ok(())
    }
}
