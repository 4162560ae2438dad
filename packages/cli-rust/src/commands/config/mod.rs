//! Config subcommand implementations
//!
//! Provides `nodewright config` for viewing the settings file.

mod show;

use std::path::Path;

use anyhow::Result;
use clap::{Args, Subcommand};
use nodewright_core::Settings;

pub use show::cmd_config_show;

/// Configuration command arguments
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Output as JSON instead of table format
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Option<ConfigSubcommands>,
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigSubcommands {
    /// Show current settings
    Show {
        /// Output as JSON instead of table format
        #[arg(long)]
        json: bool,
    },
}

/// Handle config command
///
/// Defaults to Show when no subcommand is given.
pub fn cmd_config(args: &ConfigArgs, settings: &Settings, machine_dir: &Path) -> Result<()> {
    match args.command {
        Some(ConfigSubcommands::Show { json }) => cmd_config_show(settings, machine_dir, json),
        None => cmd_config_show(settings, machine_dir, args.json),
    }
}
