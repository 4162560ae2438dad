//! Inspect command implementation

use anyhow::Result;

use super::{Context, HostArgs};

/// Print a host's stored record as JSON
pub async fn cmd_inspect(args: &HostArgs, ctx: &Context) -> Result<()> {
    let host = ctx.store.load(&args.name)?;

    let record = serde_json::json!({
        "Name": host.name(),
        "DriverName": host.driver_name(),
        "StorePath": host.store_path(),
        "Driver": host.driver().save_fields()?,
        "HostConfig": host.options(),
    });

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
