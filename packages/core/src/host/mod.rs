//! Host management module
//!
//! Provides the per-host control plane:
//! - The [`Host`] entity binding a name, a store directory and a driver
//! - config.json persistence with legacy-field migration
//! - Lifecycle operations that sequence driver calls, persistence and
//!   bounded readiness waits

mod env;
mod error;
mod lifecycle;
mod options;
mod persist;
mod probe;

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::driver::{Driver, DriverContext};
use crate::ssh::{SshTarget, build_ssh_command};

// Public exports
pub use env::HostEnv;
pub use error::HostError;
pub use options::{
    AuthOptions, DEFAULT_SWARM_HOST, DEFAULT_SWARM_IMAGE, DEFAULT_SWARM_STRATEGY, EngineOptions,
    HostOptions, SwarmOptions,
};
pub use persist::CONFIG_FILE;
pub use probe::{MachineInState, SshAvailable};

/// Check a host name against `[A-Za-z0-9-.]+`
///
/// Returns the name unchanged when it is valid.
pub fn validate_host_name(name: &str) -> Result<&str, HostError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');

    if valid {
        Ok(name)
    } else {
        Err(HostError::InvalidHostname(name.to_string()))
    }
}

/// A managed node and the driver that controls it
///
/// The name is never persisted: it is the name of the store directory.
#[derive(Debug)]
pub struct Host {
    name: String,
    driver_name: String,
    driver: Box<dyn Driver>,
    store_path: PathBuf,
    options: HostOptions,
    env: HostEnv,
}

impl Host {
    /// Build a new host whose driver comes fresh from the registry
    ///
    /// Nothing is written to disk until the host is saved or created.
    pub fn new(
        name: &str,
        driver_name: &str,
        mut options: HostOptions,
        store_path: impl Into<PathBuf>,
        env: HostEnv,
    ) -> Result<Self, HostError> {
        let name = validate_host_name(name)?.to_string();
        let store_path = store_path.into();

        let ctx = driver_context(&name, &store_path, &options.auth_config, &env);
        let driver = env.drivers.new_driver(driver_name, ctx)?;

        if options.driver.is_empty() {
            options.driver = driver_name.to_string();
        }

        Ok(Self {
            name,
            driver_name: driver_name.to_string(),
            driver,
            store_path,
            options,
            env,
        })
    }

    /// Load an existing host from its store directory
    pub fn load(
        name: &str,
        store_path: impl Into<PathBuf>,
        env: HostEnv,
    ) -> Result<Self, HostError> {
        let store_path = store_path.into();
        if !store_path.exists() {
            return Err(HostError::NotFound(name.to_string()));
        }

        let (driver_name, driver, options) = persist::read_config(name, &store_path, &env)?;

        Ok(Self {
            name: name.to_string(),
            driver_name,
            driver,
            store_path,
            options,
            env,
        })
    }

    /// Re-read config.json, replacing the driver and options in memory
    pub fn load_config(&mut self) -> Result<(), HostError> {
        let (driver_name, driver, options) =
            persist::read_config(&self.name, &self.store_path, &self.env)?;
        self.driver_name = driver_name;
        self.driver = driver;
        self.options = options;
        Ok(())
    }

    /// Write config.json for the current in-memory state
    pub fn save_config(&self) -> Result<(), HostError> {
        persist::write_config(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn driver_name(&self) -> &str {
        &self.driver_name
    }

    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    pub fn driver_mut(&mut self) -> &mut dyn Driver {
        self.driver.as_mut()
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    /// Path of this host's config.json
    pub fn config_path(&self) -> PathBuf {
        self.store_path.join(CONFIG_FILE)
    }

    pub fn options(&self) -> &HostOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut HostOptions {
        &mut self.options
    }

    pub fn env(&self) -> &HostEnv {
        &self.env
    }

    /// Service endpoint reported by the driver
    pub async fn url(&self) -> Result<String, HostError> {
        Ok(self.driver.url().await?)
    }

    /// Remote-shell target resolved from the driver
    pub async fn ssh_target(&self) -> Result<SshTarget, HostError> {
        Ok(SshTarget::from_driver(self.driver.as_ref()).await?)
    }

    /// `ssh` invocation that runs `args` on the node (interactive when empty)
    pub async fn ssh_command(&self, args: &[&str]) -> Result<Command, HostError> {
        let target = self.ssh_target().await?;
        Ok(build_ssh_command(&target, &self.env.ssh, args))
    }
}

fn driver_context(
    name: &str,
    store_path: &Path,
    auth: &AuthOptions,
    env: &HostEnv,
) -> DriverContext {
    DriverContext::new(name, store_path)
        .with_auth(auth.ca_cert(), auth.private_key())
        .with_ssh(env.ssh)
}
