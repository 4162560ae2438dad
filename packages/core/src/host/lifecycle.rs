//! Lifecycle operations
//!
//! Every operation is a strict sequence: the first failing step aborts it and
//! its error is returned as is. Nothing is rolled back; a host whose create
//! fails keeps its store directory and record so it can be inspected and
//! removed.

use std::fs;

use super::error::HostError;
use super::probe::{MachineInState, SshAvailable};
use super::Host;
use crate::driver::RunState;
use crate::poll::wait_for;
use crate::provision;

impl Host {
    /// Create the node, persist it, wait for SSH and provision it
    pub async fn create(&mut self) -> Result<(), HostError> {
        tracing::info!("Creating {} with the {} driver", self.name, self.driver_name);

        fs::create_dir_all(&self.store_path).map_err(|e| {
            HostError::SaveFailed(format!(
                "Failed to create {}: {}",
                self.store_path.display(),
                e
            ))
        })?;
        self.driver.create().await?;
        self.save_config()?;

        if !self.driver.supports_provisioning() {
            tracing::info!(
                "The {} driver does not support provisioning, skipping",
                self.driver_name
            );
            return Ok(());
        }

        tracing::info!("Waiting for SSH on {}", self.name);
        self.wait_for_ssh().await?;

        let provisioner = self
            .env
            .provisioners
            .detect(&self.name, self.driver.as_ref())
            .await?;

        tracing::info!("Provisioning {} with {}", self.name, provisioner.name());
        let options = &self.options;
        provisioner
            .provision(
                &options.swarm_config,
                &options.auth_config,
                &options.engine_config,
            )
            .await?;

        tracing::info!("{} created", self.name);
        Ok(())
    }

    /// Start the node and wait until it is running
    pub async fn start(&mut self) -> Result<(), HostError> {
        self.driver.start().await?;
        self.save_config()?;
        self.wait_for_state(RunState::Running).await?;
        tracing::info!("{} started", self.name);
        Ok(())
    }

    /// Stop the node gracefully and wait until it is stopped
    pub async fn stop(&mut self) -> Result<(), HostError> {
        self.driver.stop().await?;
        self.save_config()?;
        self.wait_for_state(RunState::Stopped).await?;
        tracing::info!("{} stopped", self.name);
        Ok(())
    }

    /// Stop the node forcefully and wait until it is stopped
    pub async fn kill(&mut self) -> Result<(), HostError> {
        self.driver.kill().await?;
        self.save_config()?;
        self.wait_for_state(RunState::Stopped).await?;
        tracing::info!("{} killed", self.name);
        Ok(())
    }

    /// Stop the node if it is running, then start it
    pub async fn restart(&mut self) -> Result<(), HostError> {
        if self.driver.state().await? == RunState::Running {
            self.stop().await?;
            self.wait_for_state(RunState::Stopped).await?;
        }

        self.start().await?;
        self.wait_for_state(RunState::Running).await?;

        self.save_config()
    }

    /// Upgrade the node's software
    pub async fn upgrade(&mut self) -> Result<(), HostError> {
        Err(HostError::NotImplemented("Upgrade".to_string()))
    }

    /// Remove the node and delete its store directory
    ///
    /// With `force`, a failing driver removal is logged and the local record
    /// is deleted anyway.
    pub async fn remove(&mut self, force: bool) -> Result<(), HostError> {
        if let Err(e) = self.driver.remove().await {
            if !force {
                return Err(e.into());
            }
            tracing::warn!(
                "Error removing {} with the {} driver, removing local record anyway: {}",
                self.name,
                self.driver_name,
                e
            );
        }

        self.check_store_path()?;
        self.save_config()?;
        self.remove_store_path()?;

        tracing::info!("{} removed", self.name);
        Ok(())
    }

    /// Install the configured TLS material on the node
    pub async fn configure_auth(&self) -> Result<(), HostError> {
        let provisioner = self
            .env
            .provisioners
            .detect(&self.name, self.driver.as_ref())
            .await?;
        provision::configure_auth(provisioner.as_ref(), &self.options.auth_config).await?;
        Ok(())
    }

    /// Live run state from the driver
    pub async fn state(&self) -> Result<RunState, HostError> {
        Ok(self.driver.state().await?)
    }

    /// Wait until the node answers over SSH
    pub async fn wait_for_ssh(&self) -> Result<(), HostError> {
        let probe = SshAvailable::new(&self.name, self.driver.as_ref(), self.env.shell.as_ref());
        wait_for(&probe, self.env.ssh_poll).await?;
        Ok(())
    }

    async fn wait_for_state(&self, desired: RunState) -> Result<(), HostError> {
        let probe = MachineInState::new(&self.name, self.driver.as_ref(), desired);
        wait_for(&probe, self.env.state_poll).await?;
        Ok(())
    }

    fn check_store_path(&self) -> Result<(), HostError> {
        let path = &self.store_path;
        let metadata = fs::metadata(path)
            .map_err(|e| HostError::RemoveFailed(format!("{}: {}", path.display(), e)))?;
        if !metadata.is_dir() {
            return Err(HostError::RemoveFailed(format!(
                "{} is not a directory",
                path.display()
            )));
        }
        Ok(())
    }

    fn remove_store_path(&self) -> Result<(), HostError> {
        let path = &self.store_path;
        fs::remove_dir_all(path)
            .map_err(|e| HostError::RemoveFailed(format!("{}: {}", path.display(), e)))?;
        tracing::debug!("Deleted store {}", path.display());
        Ok(())
    }
}
