//! `docsmith history <project>`

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use docsmith_sync::commit_message;

#[derive(Args, Debug)]
pub struct HistoryArgs {
    pub project: String,
}

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "rev")]
    revision: u32,
    #[tabled(rename = "submitted")]
    submitted: String,
    #[tabled(rename = "brief")]
    brief: String,
}

impl HistoryArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let project = super::load_project(&home, &self.project)?;

        let mut rows = vec![HistoryRow {
            revision: 0,
            submitted: project.created_at.format("%Y-%m-%d %H:%M").to_string(),
            brief: project.brief.clone(),
        }];
        rows.extend(project.revisions.iter().map(|r| HistoryRow {
            revision: r.revision,
            submitted: r.submitted_at.format("%Y-%m-%d %H:%M").to_string(),
            brief: r.text.clone(),
        }));

        println!("{} ({})", project.task.bold(), project.name);
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        println!("Next deployment: {}", commit_message(&project));
        Ok(())
    }
}
