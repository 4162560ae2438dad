//! Remove command implementation

use anyhow::{Result, bail};
use clap::Args;
use console::style;
use dialoguer::Confirm;
use nodewright_core::HostError;

use super::{Context, interruptible};
use crate::output::CommandSpinner;

/// Arguments for the rm command
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Hosts to remove
    #[arg(required = true)]
    pub names: Vec<String>,

    /// Delete the local record even if the driver fails to remove the node
    #[arg(short, long)]
    pub force: bool,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

/// Remove hosts and their store directories
pub async fn cmd_rm(args: &RmArgs, ctx: &Context, quiet: bool) -> Result<()> {
    if !args.yes {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Remove {}? This cannot be undone",
                args.names.join(", ")
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            if !quiet {
                println!("{}", style("Aborted").dim());
            }
            return Ok(());
        }
    }

    let mut failed = Vec::new();
    for name in &args.names {
        let spinner = CommandSpinner::new_maybe(&format!("Removing {name}..."), quiet);

        let result = match ctx.lock(name) {
            Ok(_lock) => match ctx.store.load(name) {
                Ok(mut host) => interruptible(host.remove(args.force)).await,
                // A directory left without a record can only be purged
                Err(HostError::LoadFailed(reason)) if args.force => {
                    tracing::warn!("Cannot load {}: {}", name, reason);
                    ctx.store.purge(name).map_err(Into::into)
                }
                Err(e) => Err(e.into()),
            },
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => spinner.success(&format!("{name} removed")),
            Err(e) => {
                spinner.fail(&format!("Failed to remove {name}: {e}"));
                failed.push(name.as_str());
            }
        }
    }

    if !failed.is_empty() {
        if !args.force && !quiet {
            eprintln!();
            eprintln!(
                "  {} Use {} to delete the local record anyway.",
                style("Tip:").cyan(),
                style("--force").green()
            );
        }
        bail!("Could not remove: {}", failed.join(", "));
    }

    Ok(())
}
