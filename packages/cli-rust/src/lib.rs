//! nodewright CLI - Create and drive container hosts
//!
//! This module contains the CLI implementation used by the binary.

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use nodewright_core::config::{self, get_lock_dir};
use nodewright_core::{LockError, get_version};
use tracing_subscriber::EnvFilter;

use commands::{Context, HostArgs, PowerOp};

/// Create and drive container hosts
#[derive(Parser)]
#[command(name = "nodewright")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Create and drive container hosts", long_about = None)]
#[command(after_help = get_examples())]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Option<Commands>,

    /// Increase verbosity level
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Create a host and provision it
    Create(commands::CreateArgs),
    /// Start a host
    Start(HostArgs),
    /// Stop a host
    Stop(HostArgs),
    /// Kill a host
    Kill(HostArgs),
    /// Restart a host
    Restart(HostArgs),
    /// Upgrade the engine on a host
    Upgrade(HostArgs),
    /// Remove hosts
    Rm(commands::RmArgs),
    /// List hosts
    Ls(commands::LsArgs),
    /// Print the engine URL of a host
    Url(HostArgs),
    /// Log into or run a command on a host over SSH
    Ssh(commands::SshArgs),
    /// Print the stored record of a host
    Inspect(HostArgs),
    /// Re-install TLS certificates on hosts
    RegenerateCerts(commands::RegenerateCertsArgs),
    /// Show settings
    Config(commands::ConfigArgs),
}

fn get_examples() -> &'static str {
    r#"Examples:
  nodewright create web1 --driver generic -o ip=10.0.0.5 -o ssh-user=ops
  nodewright ls
  nodewright ssh web1 -- uptime
  nodewright rm web1
"#
}

/// Build the log filter: RUST_LOG wins, otherwise the -v/-q flags decide
fn log_filter(verbose: u8, quiet: bool) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    EnvFilter::new(level)
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose, cli.quiet))
        .with_writer(std::io::stderr)
        .with_target(cli.verbose > 1)
        .init();

    // Configure color output
    if cli.no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    let settings_path = config::get_settings_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine settings path"))?;

    let settings = match config::load_settings() {
        Ok(settings) => settings,
        Err(e) => {
            // Display rich error for invalid settings
            eprintln!("{} Settings error", style("Error:").red().bold());
            eprintln!();
            eprintln!("  {:#}", e);
            eprintln!();
            eprintln!("  Settings file: {}", style(settings_path.display()).yellow());
            eprintln!();
            eprintln!(
                "  {} Check the settings file for syntax errors or unknown fields.",
                style("Tip:").cyan()
            );
            std::process::exit(1);
        }
    };

    let ctx = Context::new(settings)?;

    if cli.verbose > 0 {
        eprintln!(
            "{} Settings: {}",
            style("[info]").cyan(),
            settings_path.display()
        );
        eprintln!(
            "{} Machines: {}",
            style("[info]").cyan(),
            ctx.store.base_dir().display()
        );
    }

    let quiet = cli.quiet;
    let result = match cli.command {
        Some(Commands::Create(args)) => block_on(commands::cmd_create(&args, &ctx, quiet)),
        Some(Commands::Start(args)) => {
            block_on(commands::cmd_power(PowerOp::Start, &args, &ctx, quiet))
        }
        Some(Commands::Stop(args)) => {
            block_on(commands::cmd_power(PowerOp::Stop, &args, &ctx, quiet))
        }
        Some(Commands::Kill(args)) => {
            block_on(commands::cmd_power(PowerOp::Kill, &args, &ctx, quiet))
        }
        Some(Commands::Restart(args)) => {
            block_on(commands::cmd_power(PowerOp::Restart, &args, &ctx, quiet))
        }
        Some(Commands::Upgrade(args)) => {
            block_on(commands::cmd_power(PowerOp::Upgrade, &args, &ctx, quiet))
        }
        Some(Commands::Rm(args)) => block_on(commands::cmd_rm(&args, &ctx, quiet)),
        Some(Commands::Ls(args)) => block_on(commands::cmd_ls(&args, &ctx, quiet)),
        Some(Commands::Url(args)) => block_on(commands::cmd_url(&args, &ctx)),
        Some(Commands::Ssh(args)) => block_on(commands::cmd_ssh(&args, &ctx)),
        Some(Commands::Inspect(args)) => block_on(commands::cmd_inspect(&args, &ctx)),
        Some(Commands::RegenerateCerts(args)) => {
            block_on(commands::cmd_regenerate_certs(&args, &ctx, quiet))
        }
        Some(Commands::Config(args)) => {
            commands::cmd_config(&args, &ctx.settings, ctx.store.base_dir())
        }
        None => {
            // No command - show a welcome message and hint to use --help
            if !quiet {
                println!(
                    "{} {}",
                    style("nodewright").cyan().bold(),
                    style(get_version()).dim()
                );
                println!();
                println!("Run {} for available commands.", style("--help").green());
            }
            Ok(())
        }
    };

    if let Err(e) = &result {
        if let Some(lock_err) = e.downcast_ref::<LockError>() {
            display_lock_error(lock_err);
            std::process::exit(1);
        }
    }

    result
}

fn block_on<F: std::future::Future<Output = Result<()>>>(future: F) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(future)
}

/// Display a rich error message when a host lock can't be taken
fn display_lock_error(err: &LockError) {
    match err {
        LockError::Busy { name, pid } => {
            eprintln!(
                "{} Host {} is busy",
                style("Error:").red().bold(),
                style(name).bold()
            );
            eprintln!();
            eprintln!("  Held by process: {}", style(pid).yellow());
            eprintln!();
            eprintln!(
                "  {} Wait for the other nodewright command to finish.",
                style("Tip:").cyan()
            );
            eprintln!(
                "  {} If the process is stuck, kill it manually:",
                style("Tip:").cyan()
            );
            eprintln!("       {} {}", style("kill").green(), pid);
        }
        LockError::CreateDirFailed(msg) => {
            eprintln!(
                "{} Failed to create lock directory",
                style("Error:").red().bold()
            );
            eprintln!();
            eprintln!("  {}", msg);
            eprintln!();
            if let Some(lock_dir) = get_lock_dir() {
                eprintln!("  {} Check permissions for:", style("Tip:").cyan());
                eprintln!("       {}", style(lock_dir.display()).yellow());
            }
        }
        LockError::LockFailed(msg) => {
            eprintln!("{} Failed to acquire lock", style("Error:").red().bold());
            eprintln!();
            eprintln!("  {}", msg);
        }
    }
}
