//! Command-line configuration.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use corelib::RelayConfig;

use crate::commands::{Command, CommandResult};

#[derive(Parser, Debug, Clone)]
#[command(name = "relay")]
#[command(about = "Transport-agnostic signaling relay")]
pub struct CliConfig {
    /// Relay configuration file (JSON).
    #[arg(long, short)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

impl CliConfig {
    /// Load the relay configuration and run the selected command.
    pub fn run(&self) -> anyhow::Result<CommandResult> {
        let relay = RelayConfig::from_file(&self.config)
            .with_context(|| format!("loading {}", self.config.display()))?;
        self.command.execute(&relay)
    }
}
