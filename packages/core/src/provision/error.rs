//! Provisioning error types

use std::path::PathBuf;

use thiserror::Error;

use crate::driver::DriverError;
use crate::ssh::ShellError;

/// Errors that can occur while bootstrapping a node
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// The node's operating system could not be identified
    #[error("Failed to detect operating system: {0}")]
    Detection(String),

    /// No provisioner handles the node's operating system
    #[error("Unsupported Linux distribution: {0}. Please install the engine manually.")]
    Unsupported(String),

    /// A configured certificate or key file is missing locally
    #[error("Missing {what}: {}", .path.display())]
    MissingCertificate { what: &'static str, path: PathBuf },

    /// Reading local provisioning material failed
    #[error("Failed to read {}: {reason}", .path.display())]
    Io { path: PathBuf, reason: String },

    /// A remote command failed
    #[error(transparent)]
    Shell(#[from] ShellError),

    /// The driver could not provide addressing info
    #[error(transparent)]
    Driver(#[from] DriverError),
}
