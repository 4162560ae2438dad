//! SSH command implementation
//!
//! Runs the system `ssh` client against the host with the terminal attached.

use anyhow::{Context as _, Result};
use clap::Args;

use super::Context;

/// Arguments for the ssh command
#[derive(Args, Debug)]
pub struct SshArgs {
    /// Host name
    pub name: String,

    /// Command to run instead of an interactive shell
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

/// Open a shell (or run a command) on a host
pub async fn cmd_ssh(args: &SshArgs, ctx: &Context) -> Result<()> {
    let host = ctx.store.load(&args.name)?;

    let command: Vec<&str> = args.command.iter().map(String::as_str).collect();
    let mut ssh = host.ssh_command(&command).await?;

    tracing::debug!("Running {:?}", ssh);
    let status = ssh.status().context("Failed to run ssh")?;

    if !status.success() {
        std::process::exit(status.code().unwrap_or(1));
    }
    Ok(())
}
