//! Docsmith: keep generated-application READMEs in sync with their briefs.
//!
//! # Usage
//!
//! ```text
//! docsmith init [--force]
//! docsmith scaffold <task> --brief <text> --check <criterion>... [--daemon]
//! docsmith revise <project> --brief <text> [--check <criterion>...] [--daemon]
//! docsmith status [--json]
//! docsmith show <project> [--revision <n>]
//! docsmith history <project>
//! docsmith diff <project> [--from <n>] [--to <n>]
//! docsmith export <project> <dir> [--dry-run]
//! docsmith daemon start|stop|status
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    daemon::DaemonCommand, diff::DiffArgs, export::ExportArgs, history::HistoryArgs,
    init::InitArgs, revise::ReviseArgs, scaffold::ScaffoldArgs, show::ShowArgs,
    status::StatusArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "docsmith",
    version,
    about = "Generate and revise project READMEs without losing what was already agreed",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default config to ~/.docsmith/config.yaml.
    Init(InitArgs),

    /// Generate the first README for a new task.
    Scaffold(ScaffoldArgs),

    /// Update a project's README for a revision brief.
    Revise(ReviseArgs),

    /// List projects with their lifecycle state.
    Status(StatusArgs),

    /// Print a project's README.
    Show(ShowArgs),

    /// List the briefs a project's README was built from.
    History(HistoryArgs),

    /// Show a unified diff between two README revisions.
    Diff(DiffArgs),

    /// Write README.md and LICENSE for a project into a directory.
    Export(ExportArgs),

    /// Run or control the background daemon.
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Scaffold(args) => args.run(),
        Commands::Revise(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Show(args) => args.run(),
        Commands::History(args) => args.run(),
        Commands::Diff(args) => args.run(),
        Commands::Export(args) => args.run(),
        Commands::Daemon { command } => commands::daemon::run(command),
    }
}
