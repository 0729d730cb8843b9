//! CLI driver for the signaling relay.
//!
//! Provides commands for:
//! - Checking a relay configuration
//! - Replaying recorded inbound messages through a configured relay

pub mod commands;
pub mod config;

pub use commands::{Command, CommandResult};
pub use config::CliConfig;
