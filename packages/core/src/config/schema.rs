//! Settings schema for nodewright
//!
//! Defines the structure and defaults for the settings file.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::host::HostEnv;
use crate::poll::{DEFAULT_INTERVAL, DEFAULT_MAX_ATTEMPTS, PollPolicy};
use crate::ssh::SshOptions;

/// Main settings structure for nodewright
///
/// Serialized to/from `~/.config/nodewright/config.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Settings file version for migrations
    pub version: u32,

    /// Directory holding host stores (default: `{data_dir}/machines`)
    #[serde(default)]
    pub storage_path: Option<PathBuf>,

    /// Driver used by `create` when none is given (default: "generic")
    #[serde(default = "default_driver")]
    pub default_driver: String,

    /// Wait budget for run-state transitions
    #[serde(default)]
    pub state_poll: PollSettings,

    /// Wait budget for SSH to come up after create
    #[serde(default)]
    pub ssh_poll: PollSettings,

    /// SSH client behaviour
    #[serde(default)]
    pub ssh: SshSettings,
}

fn default_driver() -> String {
    crate::driver::generic::DRIVER_NAME.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: 1,
            storage_path: None,
            default_driver: default_driver(),
            state_poll: PollSettings::default(),
            ssh_poll: PollSettings::default(),
            ssh: SshSettings::default(),
        }
    }
}

impl Settings {
    /// Create a new settings value with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Host environment with the built-in collaborators and these settings
    pub fn host_env(&self) -> HostEnv {
        HostEnv::new(self.ssh.options())
            .with_polls(self.state_poll.policy(), self.ssh_poll.policy())
    }
}

/// Interval and attempt budget of a readiness wait
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct PollSettings {
    /// Milliseconds between two checks (default: 3000)
    pub interval_ms: u64,

    /// Checks before giving up (default: 60)
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL.as_millis() as u64,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl PollSettings {
    pub fn policy(&self) -> PollPolicy {
        PollPolicy::new(Duration::from_millis(self.interval_ms), self.max_attempts)
    }
}

/// SSH client settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct SshSettings {
    /// Connect timeout in seconds (default: 10)
    pub connect_timeout_secs: u64,

    /// Verify host keys, accepting unknown ones on first use (default: false)
    pub strict_host_key_checking: bool,
}

impl Default for SshSettings {
    fn default() -> Self {
        let options = SshOptions::default();
        Self {
            connect_timeout_secs: options.connect_timeout.as_secs(),
            strict_host_key_checking: options.strict_host_key_checking,
        }
    }
}

impl SshSettings {
    pub fn options(&self) -> SshOptions {
        SshOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            strict_host_key_checking: self.strict_host_key_checking,
        }
    }
}
