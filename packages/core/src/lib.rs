//! nodewright-core - Per-host control plane for nodewright
//!
//! A [`Host`] binds a name and a store directory to a pluggable [`Driver`].
//! Lifecycle operations on it sequence driver calls, durable config writes
//! and bounded readiness waits; provisioning of new nodes goes through the
//! [`provision`] interfaces.

pub mod config;
pub mod driver;
pub mod host;
pub mod lock;
pub mod poll;
pub mod provision;
pub mod ssh;
pub mod store;
pub mod version;

#[cfg(test)]
mod testing;

pub use config::Settings;
pub use driver::{Driver, DriverContext, DriverError, DriverOptions, DriverRegistry, RunState};
pub use host::{
    AuthOptions, EngineOptions, Host, HostEnv, HostError, HostOptions, SwarmOptions,
    validate_host_name,
};
pub use lock::{HostLock, LockError};
pub use poll::{PollPolicy, Probe, WaitError, wait_for};
pub use store::HostStore;
pub use version::{get_version, get_version_long};
