//! CLI command implementations
//!
//! Each mutating command takes the host's lock before loading it, so two
//! nodewright processes never drive the same host at once.

mod config;
mod create;
mod inspect;
mod ls;
mod power;
mod regenerate_certs;
mod rm;
mod ssh;
mod url;

use std::future::Future;

use anyhow::{Result, anyhow, bail};
use clap::Args;
use nodewright_core::config::{get_lock_path, resolve_machine_dir};
use nodewright_core::{HostError, HostLock, HostStore, Settings, validate_host_name};

pub use config::{ConfigArgs, cmd_config};
pub use create::{CreateArgs, cmd_create};
pub use inspect::cmd_inspect;
pub use ls::{LsArgs, cmd_ls};
pub use power::{PowerOp, cmd_power};
pub use regenerate_certs::{RegenerateCertsArgs, cmd_regenerate_certs};
pub use rm::{RmArgs, cmd_rm};
pub use ssh::{SshArgs, cmd_ssh};
pub use url::cmd_url;

/// Arguments for commands that act on one host
#[derive(Args, Debug)]
pub struct HostArgs {
    /// Host name
    pub name: String,
}

/// Settings and host store shared by all commands
pub struct Context {
    pub settings: Settings,
    pub store: HostStore,
}

impl Context {
    pub fn new(settings: Settings) -> Result<Self> {
        let machine_dir = resolve_machine_dir(&settings)?;
        tracing::debug!("Using machine store {}", machine_dir.display());
        let store = HostStore::new(machine_dir, settings.host_env());
        Ok(Self { settings, store })
    }

    /// Take the per-host lock for a mutating command
    pub fn lock(&self, name: &str) -> Result<HostLock> {
        validate_host_name(name)?;
        let pid_path =
            get_lock_path(name).ok_or_else(|| anyhow!("Could not determine lock file path"))?;
        Ok(HostLock::acquire(name, pid_path)?)
    }
}

/// Run a host operation, abandoning it on Ctrl-C
///
/// Dropping the operation's future cancels any readiness wait in progress.
pub async fn interruptible<T, F>(operation: F) -> Result<T>
where
    F: Future<Output = Result<T, HostError>>,
{
    tokio::select! {
        result = operation => Ok(result?),
        _ = tokio::signal::ctrl_c() => bail!("Interrupted"),
    }
}
