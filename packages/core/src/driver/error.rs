//! Driver error types

use thiserror::Error;

/// Errors reported by drivers and the driver registry
#[derive(Error, Debug)]
pub enum DriverError {
    /// No factory registered for the driver tag
    #[error("Driver not found: {0}")]
    UnknownDriver(String),

    /// The driver has no implementation for this operation
    #[error("The {driver} driver does not support {operation}")]
    NotSupported {
        driver: &'static str,
        operation: &'static str,
    },

    /// A required creation flag is missing
    #[error("Missing required driver option: {0}")]
    MissingOption(String),

    /// A creation flag could not be interpreted
    #[error("Invalid driver option {key}: {reason}")]
    InvalidOption { key: String, reason: String },

    /// The backend rejected or failed an operation
    #[error("Driver operation failed: {0}")]
    Operation(String),

    /// Persisted driver fields could not be encoded or decoded
    #[error("Invalid driver fields: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for DriverError {
    fn from(err: serde_json::Error) -> Self {
        DriverError::Decode(err.to_string())
    }
}
