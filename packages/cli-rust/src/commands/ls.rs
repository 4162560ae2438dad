//! ls command implementation
//!
//! Lists stored hosts with their live state.

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Table};
use console::style;
use nodewright_core::{Host, RunState};

use super::Context;
use crate::output::state_style;

/// How long a single host may take to report its state
const STATE_TIMEOUT: Duration = Duration::from_secs(10);

/// Arguments for the ls command
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Show only host names (for scripting)
    #[arg(long)]
    pub names_only: bool,
}

/// One row of the listing
struct Row {
    name: String,
    driver: String,
    state: Result<RunState, String>,
    url: String,
}

async fn describe(host: &Host) -> (Result<RunState, String>, String) {
    let state = match tokio::time::timeout(STATE_TIMEOUT, host.state()).await {
        Ok(Ok(state)) => Ok(state),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("no answer within {}s", STATE_TIMEOUT.as_secs())),
    };

    // The endpoint is only meaningful while the node runs
    let url = match state {
        Ok(RunState::Running) => host.url().await.unwrap_or_default(),
        _ => String::new(),
    };

    (state, url)
}

pub async fn cmd_ls(args: &LsArgs, ctx: &Context, quiet: bool) -> Result<()> {
    let names = ctx.store.list()?;

    if names.is_empty() {
        if !quiet && !args.names_only {
            println!("No hosts found.");
            println!();
            println!(
                "  {} {}",
                style("Create one with:").dim(),
                style("nodewright create <name> --driver generic -o ip=<address>").yellow()
            );
        }
        return Ok(());
    }

    if args.names_only || quiet {
        for name in &names {
            println!("{name}");
        }
        return Ok(());
    }

    let mut rows = Vec::with_capacity(names.len());
    for name in names {
        let row = match ctx.store.load(&name) {
            Ok(host) => {
                let (state, url) = describe(&host).await;
                Row {
                    driver: host.driver_name().to_string(),
                    name,
                    state,
                    url,
                }
            }
            Err(e) => Row {
                name,
                driver: "-".to_string(),
                state: Err(e.to_string()),
                url: String::new(),
            },
        };
        rows.push(row);
    }

    let mut table = Table::new();
    table.set_header(vec!["Name", "Driver", "State", "URL", "Errors"]);

    for row in rows {
        let (state, error) = match &row.state {
            Ok(state) => (state_style(*state).to_string(), String::new()),
            Err(e) => (style("Error").red().to_string(), e.clone()),
        };
        table.add_row(vec![
            Cell::new(&row.name),
            Cell::new(&row.driver),
            Cell::new(state),
            Cell::new(&row.url),
            Cell::new(error),
        ]);
    }

    println!("{table}");

    println!();
    println!(
        "  {} {}",
        style("Store:").dim(),
        style(ctx.store.base_dir().display()).dim()
    );

    Ok(())
}
