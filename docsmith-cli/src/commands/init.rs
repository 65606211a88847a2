//! `docsmith init [--force]`

use anyhow::{bail, Context, Result};
use clap::Args;

use docsmith_core::config::{config_path_at, save_at};
use docsmith_core::Config;

/// Write a default config file.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing config with defaults.
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let path = config_path_at(&home);
        if path.exists() && !self.force {
            bail!(
                "config already exists at {} (use --force to overwrite)",
                path.display()
            );
        }

        let config = Config::default();
        let path = save_at(&home, &config).context("failed to write config")?;
        println!("✓ Wrote default config to {}", path.display());
        println!(
            "  Set ${} before running `docsmith scaffold`.",
            config.generation.api_key_env
        );
        Ok(())
    }
}
