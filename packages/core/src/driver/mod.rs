//! Driver capability interface
//!
//! A driver is the pluggable backend that actually creates, starts, stops
//! and removes a node on one kind of infrastructure, and reports how to reach
//! it. The lifecycle controller only talks to drivers through [`Driver`].
//!
//! Drivers are instantiated by name through a [`DriverRegistry`], which is
//! also what makes the two-phase config load possible: the `DriverName` tag
//! picks the factory, then the factory's driver decodes its own fields.

mod error;
pub mod generic;
pub mod none;

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ssh::SshOptions;

pub use error::DriverError;
pub use generic::GenericDriver;
pub use none::NoneDriver;

/// Runtime state of a node as reported by its driver
///
/// Never cached locally: the lifecycle controller always queries it live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RunState {
    #[default]
    None,
    Running,
    Paused,
    Saved,
    Stopped,
    Stopping,
    Starting,
    Error,
    Timeout,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::None => "None",
            RunState::Running => "Running",
            RunState::Paused => "Paused",
            RunState::Saved => "Saved",
            RunState::Stopped => "Stopped",
            RunState::Stopping => "Stopping",
            RunState::Starting => "Starting",
            RunState::Error => "Error",
            RunState::Timeout => "Timeout",
        };
        f.write_str(name)
    }
}

/// Everything a driver factory needs to know about the host it serves
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverContext {
    /// Host name (also the store directory name)
    pub machine_name: String,
    /// Directory holding the host's config and any driver artifacts
    pub store_path: PathBuf,
    /// CA certificate used to sign the node's server certificate
    pub ca_cert_path: Option<PathBuf>,
    /// Private key used for driver-side authentication
    pub private_key_path: Option<PathBuf>,
    /// Client options for drivers that reach the node over SSH
    pub ssh: SshOptions,
}

impl DriverContext {
    /// Create a context for a host stored at `store_path`
    pub fn new(machine_name: impl Into<String>, store_path: impl Into<PathBuf>) -> Self {
        Self {
            machine_name: machine_name.into(),
            store_path: store_path.into(),
            ca_cert_path: None,
            private_key_path: None,
            ssh: SshOptions::default(),
        }
    }

    /// Builder pattern: set the SSH client options
    pub fn with_ssh(mut self, ssh: SshOptions) -> Self {
        self.ssh = ssh;
        self
    }

    /// Builder pattern: set the CA certificate and private key paths
    pub fn with_auth(
        mut self,
        ca_cert_path: Option<PathBuf>,
        private_key_path: Option<PathBuf>,
    ) -> Self {
        self.ca_cert_path = ca_cert_path;
        self.private_key_path = private_key_path;
        self
    }
}

/// Driver-specific creation flags (`--opt key=value`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverOptions {
    values: BTreeMap<String, String>,
}

impl DriverOptions {
    /// Create an empty set of options
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pattern: set one option
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set one option, replacing any previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Parse a `key=value` flag
    pub fn parse_flag(flag: &str) -> Result<(String, String), DriverError> {
        match flag.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.to_string()))
            }
            _ => Err(DriverError::InvalidOption {
                key: flag.to_string(),
                reason: "expected KEY=VALUE".to_string(),
            }),
        }
    }

    /// Get a raw option value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Get a required option value
    pub fn require(&self, key: &str) -> Result<&str, DriverError> {
        self.get(key)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| DriverError::MissingOption(key.to_string()))
    }

    /// Get an option parsed into `T`
    pub fn get_parsed<T>(&self, key: &str) -> Result<Option<T>, DriverError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.get(key)
            .map(|raw| {
                raw.parse::<T>().map_err(|e| DriverError::InvalidOption {
                    key: key.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    /// Check if no options were given
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, String)> for DriverOptions {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Contract every infrastructure backend must satisfy
///
/// All methods may fail; callers propagate driver errors unchanged.
#[async_trait]
pub trait Driver: Send + Sync + fmt::Debug {
    /// Registry tag of this driver
    fn driver_name(&self) -> &'static str;

    /// Apply creation flags before `create`
    fn set_config_from_flags(&mut self, flags: &DriverOptions) -> Result<(), DriverError>;

    /// Whether the node can be reached over a remote shell and bootstrapped
    ///
    /// Drivers that only record an endpoint return false so `create` skips
    /// the remote-shell wait and provisioning.
    fn supports_provisioning(&self) -> bool {
        true
    }

    /// Create the node
    async fn create(&mut self) -> Result<(), DriverError>;

    /// Start the node
    async fn start(&mut self) -> Result<(), DriverError>;

    /// Stop the node gracefully
    async fn stop(&mut self) -> Result<(), DriverError>;

    /// Stop the node forcefully
    ///
    /// Drivers without a forced path fall back to a graceful stop.
    async fn kill(&mut self) -> Result<(), DriverError> {
        self.stop().await
    }

    /// Remove the node and any infrastructure it owns
    async fn remove(&mut self) -> Result<(), DriverError>;

    /// Current run state
    async fn state(&self) -> Result<RunState, DriverError>;

    /// Service endpoint of the node
    async fn url(&self) -> Result<String, DriverError>;

    /// Hostname or IP for remote-shell access
    async fn ssh_hostname(&self) -> Result<String, DriverError>;

    /// Port for remote-shell access
    fn ssh_port(&self) -> Result<u16, DriverError>;

    /// Username for remote-shell access
    fn ssh_username(&self) -> String;

    /// Private key for remote-shell access, if any
    fn ssh_key_path(&self) -> Option<PathBuf>;

    /// Driver-specific fields to persist under `Driver` in config.json
    fn save_fields(&self) -> Result<serde_json::Value, DriverError>;

    /// Restore driver-specific fields decoded from config.json
    fn load_fields(&mut self, raw: serde_json::Value) -> Result<(), DriverError>;
}

/// Constructor registered for a driver tag
pub type DriverFactory = Arc<dyn Fn(DriverContext) -> Box<dyn Driver> + Send + Sync>;

/// Maps driver-name tags to driver factories
#[derive(Clone, Default)]
pub struct DriverRegistry {
    factories: BTreeMap<String, DriverFactory>,
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("drivers", &self.names())
            .finish()
    }
}

impl DriverRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the drivers shipped in this crate
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(none::DRIVER_NAME, |ctx| Box::new(NoneDriver::new(ctx)));
        registry.register(generic::DRIVER_NAME, |ctx| Box::new(GenericDriver::new(ctx)));
        registry
    }

    /// Register (or replace) the factory for a driver tag
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(DriverContext) -> Box<dyn Driver> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    /// Check if a driver tag is known
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Known driver tags, sorted
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Instantiate a fresh driver
    pub fn new_driver(
        &self,
        name: &str,
        ctx: DriverContext,
    ) -> Result<Box<dyn Driver>, DriverError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| DriverError::UnknownDriver(name.to_string()))?;
        Ok(factory(ctx))
    }

    /// Instantiate a driver and restore its persisted fields
    ///
    /// `raw` is the `Driver` object of a stored host; when absent the driver
    /// keeps the defaults its factory gave it.
    pub fn load_driver(
        &self,
        name: &str,
        ctx: DriverContext,
        raw: Option<serde_json::Value>,
    ) -> Result<Box<dyn Driver>, DriverError> {
        let mut driver = self.new_driver(name, ctx)?;
        if let Some(raw) = raw.filter(|v| !v.is_null()) {
            driver.load_fields(raw)?;
        }
        Ok(driver)
    }
}
