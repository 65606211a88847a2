//! `docsmith daemon`: foreground service lifecycle.

use anyhow::{Context, Result};
use clap::Subcommand;

use docsmith_daemon::paths::socket_path;
use docsmith_daemon::{request_status, request_stop, start_blocking, DaemonError};

#[derive(Subcommand, Debug)]
pub enum DaemonCommand {
    /// Run the daemon in the foreground.
    Start,
    /// Request graceful daemon shutdown over the Unix socket.
    Stop,
    /// Query daemon runtime status over the Unix socket.
    Status,
}

pub fn run(command: DaemonCommand) -> Result<()> {
    let home = super::home()?;

    match command {
        DaemonCommand::Start => {
            start_blocking(&home).context("daemon exited with error")?;
        }
        DaemonCommand::Stop => {
            let secret = super::load_config(&home)?.daemon.shared_secret();
            match request_stop(&home, secret) {
                Ok(()) => println!("daemon stop requested"),
                Err(DaemonError::DaemonNotRunning { .. }) => {
                    println!("daemon is not running");
                }
                Err(err) => return Err(err).context("failed to stop daemon"),
            }
        }
        DaemonCommand::Status => match request_status(&home) {
            Ok(status) => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&status)
                        .context("failed to render daemon status JSON")?
                );
            }
            Err(DaemonError::DaemonNotRunning { .. }) => {
                let payload = serde_json::json!({
                    "running": false,
                    "socket": socket_path(&home).display().to_string(),
                });
                println!(
                    "{}",
                    serde_json::to_string_pretty(&payload)
                        .context("failed to render daemon status JSON")?
                );
            }
            Err(err) => return Err(err).context("failed to query daemon status"),
        },
    }

    Ok(())
}
