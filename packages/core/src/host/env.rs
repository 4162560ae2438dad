//! Collaborators injected into every host

use std::fmt;
use std::sync::Arc;

use crate::driver::DriverRegistry;
use crate::poll::PollPolicy;
use crate::provision::{OsReleaseDetector, ProvisionerDetector};
use crate::ssh::{OpenSsh, RemoteShell, SshOptions};

/// Driver registry, remote shell, provisioner detector and wait policies
/// used by a [`Host`](super::Host)
#[derive(Clone)]
pub struct HostEnv {
    /// Factories for the driver tags this process knows
    pub drivers: Arc<DriverRegistry>,
    /// Transport for readiness probes
    pub shell: Arc<dyn RemoteShell>,
    /// Finds the provisioner for a freshly created node
    pub provisioners: Arc<dyn ProvisionerDetector>,
    /// Budget for run-state waits
    pub state_poll: PollPolicy,
    /// Budget for remote-shell waits
    pub ssh_poll: PollPolicy,
    /// Options for `ssh` commands built for the user
    pub ssh: SshOptions,
}

impl HostEnv {
    /// Built-in drivers, OpenSSH transport and os-release detection
    pub fn new(ssh: SshOptions) -> Self {
        let shell: Arc<dyn RemoteShell> = Arc::new(OpenSsh::new(ssh));
        Self {
            drivers: Arc::new(DriverRegistry::builtin()),
            provisioners: Arc::new(OsReleaseDetector::new(shell.clone())),
            shell,
            state_poll: PollPolicy::default(),
            ssh_poll: PollPolicy::default(),
            ssh,
        }
    }

    /// Builder pattern: set the driver registry
    pub fn with_drivers(mut self, drivers: DriverRegistry) -> Self {
        self.drivers = Arc::new(drivers);
        self
    }

    /// Builder pattern: set the remote shell used by readiness probes
    pub fn with_shell(mut self, shell: Arc<dyn RemoteShell>) -> Self {
        self.shell = shell;
        self
    }

    /// Builder pattern: set the provisioner detector
    pub fn with_provisioners(mut self, provisioners: Arc<dyn ProvisionerDetector>) -> Self {
        self.provisioners = provisioners;
        self
    }

    /// Builder pattern: set both wait policies
    pub fn with_polls(mut self, state_poll: PollPolicy, ssh_poll: PollPolicy) -> Self {
        self.state_poll = state_poll;
        self.ssh_poll = ssh_poll;
        self
    }
}

impl Default for HostEnv {
    fn default() -> Self {
        Self::new(SshOptions::default())
    }
}

impl fmt::Debug for HostEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostEnv")
            .field("drivers", &self.drivers)
            .field("state_poll", &self.state_poll)
            .field("ssh_poll", &self.ssh_poll)
            .field("ssh", &self.ssh)
            .finish_non_exhaustive()
    }
}
