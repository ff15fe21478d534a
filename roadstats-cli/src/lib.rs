//! Command-line interface for publishing merged road statistics.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use log::{info, warn};

mod error;
mod publish;

pub use error::CliError;

use publish::{PublishArgs, run_publish};

pub(crate) const ARG_SNAPSHOTS: &str = "snapshot";
pub(crate) const ARG_STATISTICS: &str = "statistics";
pub(crate) const ARG_TASKS: &str = "tasks";
pub(crate) const ARG_SPATIAL_EXTENSION: &str = "spatial-extension";
pub(crate) const ENV_SNAPSHOTS: &str = "ROADSTATS_CMDS_PUBLISH_SNAPSHOTS";

/// Run the roadstats CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    run_command(cli.command)
}

fn run_command(command: Command) -> Result<(), CliError> {
    match command {
        Command::Publish(args) => {
            let outcome = run_publish(args)?;
            if outcome.is_complete() {
                info!("Publishing finished");
            } else {
                warn!(
                    "Publishing finished with {} failed output(s); see the errors above",
                    outcome.failures
                );
            }
        }
    }
    Ok(())
}

#[derive(Debug, Parser)]
#[command(
    name = "roadstats",
    about = "Merge road network statistics and publish them",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Merge worker snapshots and write the statistics database and task file.
    Publish(PublishArgs),
}

#[cfg(test)]
mod tests;
