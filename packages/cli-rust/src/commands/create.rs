//! Create command implementation
//!
//! Claims a store directory, creates the node through its driver, waits for
//! SSH and provisions it.

use std::path::Path;

use anyhow::Result;
use clap::Args;
use console::style;
use nodewright_core::config::get_certs_dir;
use nodewright_core::{AuthOptions, DriverOptions, EngineOptions, HostOptions, SwarmOptions};

use super::{Context, interruptible};
use crate::output::CommandSpinner;

/// Arguments for the create command
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Name of the new host
    pub name: String,

    /// Driver to create the host with (default from settings)
    #[arg(short, long)]
    pub driver: Option<String>,

    /// Memory hint in MB (0 lets the driver decide)
    #[arg(long, default_value_t = 0)]
    pub memory: u64,

    /// Disk hint in MB (0 lets the driver decide)
    #[arg(long, default_value_t = 0)]
    pub disk: u64,

    /// Driver option, repeatable (e.g. -o ip=10.0.0.5)
    #[arg(short = 'o', long = "opt", value_name = "KEY=VALUE", value_parser = parse_driver_opt)]
    pub opts: Vec<(String, String)>,

    /// Engine label, repeatable
    #[arg(long = "engine-label", value_name = "LABEL")]
    pub engine_labels: Vec<String>,

    /// Insecure registry the engine may pull from, repeatable
    #[arg(long = "engine-insecure-registry", value_name = "REGISTRY")]
    pub engine_insecure_registries: Vec<String>,

    /// Engine storage driver
    #[arg(long)]
    pub engine_storage_driver: Option<String>,

    /// Script URL used to install the engine instead of distribution packages
    #[arg(long)]
    pub engine_install_url: Option<String>,

    /// Join a swarm
    #[arg(long)]
    pub swarm: bool,

    /// Run the swarm manager on this host
    #[arg(long, requires = "swarm")]
    pub swarm_master: bool,

    /// Swarm discovery URL
    #[arg(long, requires = "swarm")]
    pub swarm_discovery: Option<String>,
}

fn parse_driver_opt(raw: &str) -> Result<(String, String), String> {
    DriverOptions::parse_flag(raw).map_err(|e| e.to_string())
}

impl CreateArgs {
    /// Options bundle for the new host
    ///
    /// TLS material is used only when `certs_dir` already holds a CA.
    pub fn host_options(&self, driver: &str, certs_dir: Option<&Path>) -> HostOptions {
        let engine = EngineOptions {
            labels: self.engine_labels.clone(),
            insecure_registry: self.engine_insecure_registries.clone(),
            storage_driver: self.engine_storage_driver.clone().unwrap_or_default(),
            install_url: self.engine_install_url.clone().unwrap_or_default(),
            tls_verify: true,
            ..Default::default()
        };

        let swarm = SwarmOptions {
            is_swarm: self.swarm,
            master: self.swarm_master,
            discovery: self.swarm_discovery.clone().unwrap_or_default(),
            ..Default::default()
        };

        let auth = certs_dir
            .filter(|dir| dir.join("ca.pem").exists())
            .map(AuthOptions::for_store)
            .unwrap_or_default();

        HostOptions::new(driver)
            .with_memory(self.memory)
            .with_disk(self.disk)
            .with_engine(engine)
            .with_swarm(swarm)
            .with_auth(auth)
    }

    pub fn driver_options(&self) -> DriverOptions {
        self.opts.iter().cloned().collect()
    }
}

/// Create and provision a new host
pub async fn cmd_create(args: &CreateArgs, ctx: &Context, quiet: bool) -> Result<()> {
    let driver = args
        .driver
        .clone()
        .unwrap_or_else(|| ctx.settings.default_driver.clone());

    let _lock = ctx.lock(&args.name)?;

    let certs_dir = get_certs_dir();
    let options = args.host_options(&driver, certs_dir.as_deref());
    if !options.auth_config.is_configured() {
        tracing::info!(
            "No CA found in the certs directory, creating {} without TLS",
            args.name
        );
    }

    let mut host = ctx
        .store
        .create(&args.name, &driver, options, &args.driver_options())?;

    let spinner = CommandSpinner::new_maybe(
        &format!("Creating {} with the {} driver...", args.name, driver),
        quiet,
    );

    match interruptible(host.create()).await {
        Ok(()) => spinner.success(&format!("{} created", args.name)),
        Err(e) => {
            spinner.fail(&format!("Failed to create {}", args.name));
            if !quiet {
                eprintln!();
                eprintln!(
                    "  {} The host record was kept for inspection. Remove it with:",
                    style("Tip:").cyan()
                );
                eprintln!("       {}", style(format!("nodewright rm {}", args.name)).green());
            }
            return Err(e);
        }
    }

    if !quiet {
        if let Ok(url) = host.url().await {
            println!();
            println!("  {} {}", style("URL:").dim(), style(url).cyan());
        }
    }

    Ok(())
}
