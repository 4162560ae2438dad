//! Host-specific error types
//!
//! Errors that can occur while managing a host and its stored config.

use thiserror::Error;

use crate::driver::DriverError;
use crate::poll::WaitError;
use crate::provision::ProvisionError;

/// Errors that can occur during host operations
#[derive(Error, Debug)]
pub enum HostError {
    /// Name contains characters outside `[A-Za-z0-9-.]`
    #[error("Invalid host name \"{0}\": only letters, digits, '-' and '.' are allowed")]
    InvalidHostname(String),

    /// No store directory for the host
    #[error("Host \"{0}\" does not exist")]
    NotFound(String),

    /// A store directory for the host already exists
    #[error("Host \"{0}\" already exists")]
    AlreadyExists(String),

    /// Failed to read or decode config.json
    #[error("Failed to load host config: {0}")]
    LoadFailed(String),

    /// Failed to write config.json
    #[error("Failed to save host config: {0}")]
    SaveFailed(String),

    /// Failed to delete the store directory
    #[error("Failed to remove host store: {0}")]
    RemoveFailed(String),

    /// Operation exists in the command surface but has no implementation
    #[error("{0} is not implemented yet")]
    NotImplemented(String),

    /// A driver call failed
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// A readiness wait ran out of attempts
    #[error(transparent)]
    Wait(#[from] WaitError),

    /// Provisioner detection or provisioning failed
    #[error(transparent)]
    Provision(#[from] ProvisionError),
}
