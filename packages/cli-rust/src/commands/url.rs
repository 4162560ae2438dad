//! URL command implementation

use anyhow::Result;

use super::{Context, HostArgs};

/// Print the service endpoint of a host
pub async fn cmd_url(args: &HostArgs, ctx: &Context) -> Result<()> {
    let host = ctx.store.load(&args.name)?;
    println!("{}", host.url().await?);
    Ok(())
}
