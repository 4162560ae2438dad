//! Node provisioning
//!
//! A provisioner bootstraps an already-running node: hostname, container
//! engine, TLS material and swarm membership. The lifecycle controller finds
//! one through a [`ProvisionerDetector`] and only ever talks to the traits
//! defined here.

mod distro;
mod error;
mod shell;

use std::sync::Arc;

use async_trait::async_trait;

use crate::driver::Driver;
use crate::host::{AuthOptions, EngineOptions, SwarmOptions};
use crate::ssh::{RemoteShell, SshTarget};

pub use distro::{
    DistroFamily, DistroInfo, engine_install_commands, engine_restart_command, parse_os_release,
};
pub use error::ProvisionError;
pub use shell::{ShellProvisioner, swarm_commands};

/// OS-level bootstrap handler for one node
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Human-readable name (usually the detected distribution)
    fn name(&self) -> String;

    /// Apply engine, auth and swarm configuration
    async fn provision(
        &self,
        swarm: &SwarmOptions,
        auth: &AuthOptions,
        engine: &EngineOptions,
    ) -> Result<(), ProvisionError>;

    /// Install certificate material on the node
    async fn configure_auth(&self, auth: &AuthOptions) -> Result<(), ProvisionError>;
}

/// Finds the provisioner that handles a node
#[async_trait]
pub trait ProvisionerDetector: Send + Sync {
    /// Inspect the node behind `driver` and return a matching provisioner
    async fn detect(
        &self,
        machine_name: &str,
        driver: &dyn Driver,
    ) -> Result<Box<dyn Provisioner>, ProvisionError>;
}

/// Configure auth material on a node through its provisioner
pub async fn configure_auth(
    provisioner: &dyn Provisioner,
    auth: &AuthOptions,
) -> Result<(), ProvisionError> {
    tracing::debug!("Configuring auth through the {} provisioner", provisioner.name());
    provisioner.configure_auth(auth).await
}

/// Detects the distribution by reading `/etc/os-release` over the remote shell
#[derive(Clone)]
pub struct OsReleaseDetector {
    shell: Arc<dyn RemoteShell>,
}

impl OsReleaseDetector {
    /// Create a detector that runs its probes through `shell`
    pub fn new(shell: Arc<dyn RemoteShell>) -> Self {
        Self { shell }
    }
}

#[async_trait]
impl ProvisionerDetector for OsReleaseDetector {
    async fn detect(
        &self,
        machine_name: &str,
        driver: &dyn Driver,
    ) -> Result<Box<dyn Provisioner>, ProvisionError> {
        let target = SshTarget::from_driver(driver).await?;
        let output = self.shell.run(&target, "cat /etc/os-release").await?;
        let distro = parse_os_release(&output)?;

        if let DistroFamily::Unknown(id) = &distro.family {
            return Err(ProvisionError::Unsupported(id.clone()));
        }

        tracing::info!(
            "Detected {} ({}) on {}",
            distro.pretty_name,
            distro.family,
            machine_name
        );

        Ok(Box::new(ShellProvisioner::new(
            machine_name,
            distro,
            target,
            self.shell.clone(),
        )))
    }
}
