//! `docsmith export <project> <dir>`: hand the committed README to a
//! deployment checkout.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use docsmith_core::FsProjectStore;
use docsmith_renderer::{user_template_dir_at, TemplateEngine};
use docsmith_sync::{export_project, WriteResult};

#[derive(Args, Debug)]
pub struct ExportArgs {
    pub project: String,

    /// Directory to write README.md and LICENSE into.
    pub dir: PathBuf,

    /// Show what would be written without writing anything.
    #[arg(long)]
    pub dry_run: bool,
}

impl ExportArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let config = super::load_config(&home)?;
        let engine = TemplateEngine::new(Some(&user_template_dir_at(&home)))
            .context("failed to load templates")?;

        let result = export_project(
            &FsProjectStore::at(&home),
            &engine,
            &super::project_name(&self.project)?,
            &self.dir,
            &config.author.name,
            self.dry_run,
        )
        .with_context(|| format!("export failed for '{}'", self.project))?;

        let prefix = if self.dry_run { "[dry-run] " } else { "" };
        println!(
            "{prefix}✓ '{}' exported at revision {}",
            result.project, result.revision
        );
        for write in &result.writes {
            match write {
                WriteResult::Written { path } => println!("  ✎  {}", path.display()),
                WriteResult::WouldWrite { path } => println!("  ~  {}", path.display()),
                WriteResult::Unchanged { path } => println!("  ·  {}", path.display()),
            }
        }
        println!("  Commit message: {}", result.commit_message);
        Ok(())
    }
}
