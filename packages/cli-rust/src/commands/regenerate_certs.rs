//! regenerate-certs command implementation
//!
//! Re-installs a host's certificate material on the node.

use anyhow::Result;
use clap::Args;
use console::style;
use dialoguer::Confirm;

use super::{Context, interruptible};
use crate::output::CommandSpinner;

/// Arguments for the regenerate-certs command
#[derive(Args, Debug)]
pub struct RegenerateCertsArgs {
    /// Host names
    #[arg(required = true)]
    pub names: Vec<String>,

    /// Skip the confirmation prompt
    #[arg(long, short)]
    pub yes: bool,
}

pub async fn cmd_regenerate_certs(
    args: &RegenerateCertsArgs,
    ctx: &Context,
    quiet: bool,
) -> Result<()> {
    if !args.yes {
        let confirmed = Confirm::new()
            .with_prompt("Re-install TLS certificates on the selected hosts?")
            .default(false)
            .interact()?;
        if !confirmed {
            if !quiet {
                println!("Aborted.");
            }
            return Ok(());
        }
    }

    for name in &args.names {
        let _lock = ctx.lock(name)?;
        let host = ctx.store.load(name)?;

        let spinner =
            CommandSpinner::new_maybe(&format!("Regenerating certificates for {name}..."), quiet);
        match interruptible(host.configure_auth()).await {
            Ok(()) => spinner.success(&format!("Certificates installed on {name}")),
            Err(e) => {
                spinner.fail(&format!("Certificate setup failed on {}", style(name).bold()));
                return Err(e);
            }
        }
    }

    Ok(())
}
