//! Start, stop, kill, restart and upgrade

use anyhow::Result;
use console::style;

use super::{Context, HostArgs, interruptible};
use crate::output::CommandSpinner;

/// Power operation applied to a host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerOp {
    Start,
    Stop,
    Kill,
    Restart,
    Upgrade,
}

impl PowerOp {
    fn progressive(self) -> &'static str {
        match self {
            PowerOp::Start => "Starting",
            PowerOp::Stop => "Stopping",
            PowerOp::Kill => "Killing",
            PowerOp::Restart => "Restarting",
            PowerOp::Upgrade => "Upgrading",
        }
    }

    fn past(self) -> &'static str {
        match self {
            PowerOp::Start => "started",
            PowerOp::Stop => "stopped",
            PowerOp::Kill => "killed",
            PowerOp::Restart => "restarted",
            PowerOp::Upgrade => "upgraded",
        }
    }
}

/// Apply a power operation and wait for the host to settle
pub async fn cmd_power(op: PowerOp, args: &HostArgs, ctx: &Context, quiet: bool) -> Result<()> {
    let _lock = ctx.lock(&args.name)?;
    let mut host = ctx.store.load(&args.name)?;

    let spinner =
        CommandSpinner::new_maybe(&format!("{} {}...", op.progressive(), args.name), quiet);

    let result = interruptible(async {
        match op {
            PowerOp::Start => host.start().await,
            PowerOp::Stop => host.stop().await,
            PowerOp::Kill => host.kill().await,
            PowerOp::Restart => host.restart().await,
            PowerOp::Upgrade => host.upgrade().await,
        }
    })
    .await;

    match result {
        Ok(()) => {
            spinner.success(&format!("{} {}", args.name, op.past()));
            Ok(())
        }
        Err(e) => {
            spinner.fail(&format!(
                "{} {} failed",
                op.progressive(),
                style(&args.name).bold()
            ));
            Err(e)
        }
    }
}
