//! Config show subcommand
//!
//! Displays current settings in table or JSON format.

use std::path::Path;

use anyhow::Result;
use comfy_table::{Cell, Color, Table};
use nodewright_core::config::{self, PollSettings, STORAGE_PATH_ENV};
use nodewright_core::Settings;

/// Show current settings
pub fn cmd_config_show(settings: &Settings, machine_dir: &Path, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(settings)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Key", "Value"]);

    table.add_row(vec![
        Cell::new("version"),
        Cell::new(settings.version.to_string()),
    ]);
    table.add_row(vec![
        Cell::new("storage_path"),
        format_storage_path(settings.storage_path.as_deref(), machine_dir),
    ]);
    table.add_row(vec![
        Cell::new("default_driver"),
        Cell::new(&settings.default_driver),
    ]);
    table.add_row(vec![
        Cell::new("state_poll"),
        Cell::new(format_poll(&settings.state_poll)),
    ]);
    table.add_row(vec![
        Cell::new("ssh_poll"),
        Cell::new(format_poll(&settings.ssh_poll)),
    ]);
    table.add_row(vec![
        Cell::new("ssh.connect_timeout_secs"),
        Cell::new(settings.ssh.connect_timeout_secs.to_string()),
    ]);
    table.add_row(vec![
        Cell::new("ssh.strict_host_key_checking"),
        Cell::new(settings.ssh.strict_host_key_checking.to_string()),
    ]);

    println!("{table}");

    if let Some(path) = config::get_settings_path() {
        println!();
        println!("Settings file: {}", path.display());
    }

    Ok(())
}

/// Effective machine store, flagged when it differs from the settings value
fn format_storage_path(configured: Option<&Path>, effective: &Path) -> Cell {
    if configured == Some(effective) {
        return Cell::new(effective.display());
    }
    if std::env::var_os(STORAGE_PATH_ENV).is_some() {
        Cell::new(format!("{} (from {STORAGE_PATH_ENV})", effective.display())).fg(Color::Yellow)
    } else {
        Cell::new(format!("{} (default)", effective.display()))
    }
}

fn format_poll(poll: &PollSettings) -> String {
    format!("every {}ms, {} attempts", poll.interval_ms, poll.max_attempts)
}
