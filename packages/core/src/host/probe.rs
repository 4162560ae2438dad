//! Readiness probes used by the lifecycle operations

use async_trait::async_trait;

use crate::driver::{Driver, RunState};
use crate::poll::Probe;
use crate::ssh::{RemoteShell, SshTarget};

/// Ready when the driver reports `desired`
pub struct MachineInState<'a> {
    name: &'a str,
    driver: &'a dyn Driver,
    desired: RunState,
}

impl<'a> MachineInState<'a> {
    pub fn new(name: &'a str, driver: &'a dyn Driver, desired: RunState) -> Self {
        Self {
            name,
            driver,
            desired,
        }
    }
}

#[async_trait]
impl<'a> Probe for MachineInState<'a> {
    fn describe(&self) -> String {
        format!("{} to be {}", self.name, self.desired)
    }

    async fn probe(&self) -> Result<(), String> {
        match self.driver.state().await {
            Ok(state) if state == self.desired => Ok(()),
            Ok(state) => Err(format!("state is {state}")),
            Err(e) => {
                tracing::debug!("Error getting state for {}: {}", self.name, e);
                Err(e.to_string())
            }
        }
    }
}

/// Ready when the node accepts TCP on its SSH port and runs `exit 0`
pub struct SshAvailable<'a> {
    name: &'a str,
    driver: &'a dyn Driver,
    shell: &'a dyn RemoteShell,
}

impl<'a> SshAvailable<'a> {
    pub fn new(name: &'a str, driver: &'a dyn Driver, shell: &'a dyn RemoteShell) -> Self {
        Self {
            name,
            driver,
            shell,
        }
    }

    async fn check(&self) -> Result<(), String> {
        let hostname = self
            .driver
            .ssh_hostname()
            .await
            .map_err(|e| format!("Error getting IP address: {e}"))?;
        let port = self
            .driver
            .ssh_port()
            .map_err(|e| format!("Error getting SSH port: {e}"))?;

        let mut target = SshTarget::new(hostname, self.driver.ssh_username()).with_port(port);
        target.key_path = self.driver.ssh_key_path();

        self.shell
            .reachable(&target.address())
            .await
            .map_err(|e| format!("Error waiting for TCP: {e}"))?;

        self.shell
            .run(&target, "exit 0")
            .await
            .map_err(|e| format!("Error running 'exit 0' over SSH: {e}"))?;

        Ok(())
    }
}

#[async_trait]
impl<'a> Probe for SshAvailable<'a> {
    fn describe(&self) -> String {
        format!("SSH on {}", self.name)
    }

    async fn probe(&self) -> Result<(), String> {
        tracing::debug!("Checking SSH availability for {}", self.name);
        self.check().await.inspect_err(|cause| {
            tracing::debug!("{}: {}", self.name, cause);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::DriverContext;
    use crate::testing::{MockDriver, MockShell, Recorder};

    #[tokio::test]
    async fn test_machine_in_state() {
        let recorder = Recorder::default();
        recorder.set_state(RunState::Stopped);
        let driver = MockDriver::new(DriverContext::new("dev", "/tmp/dev"), recorder.clone());

        let probe = MachineInState::new("dev", &driver, RunState::Running);
        assert_eq!(probe.probe().await.unwrap_err(), "state is Stopped");

        recorder.set_state(RunState::Running);
        assert!(probe.probe().await.is_ok());
    }

    #[tokio::test]
    async fn test_machine_in_state_swallows_driver_errors() {
        let recorder = Recorder::default();
        recorder.fail_state(true);
        let driver = MockDriver::new(DriverContext::new("dev", "/tmp/dev"), recorder);

        let probe = MachineInState::new("dev", &driver, RunState::Running);
        assert!(probe.probe().await.unwrap_err().contains("state unavailable"));
    }

    #[tokio::test]
    async fn test_ssh_available_steps() {
        let recorder = Recorder::default();
        let driver = MockDriver::new(DriverContext::new("dev", "/tmp/dev"), recorder);

        let shell = MockShell::new().unreachable_for(1);
        let probe = SshAvailable::new("dev", &driver, &shell);

        let cause = probe.probe().await.unwrap_err();
        assert!(cause.starts_with("Error waiting for TCP"));
        assert!(shell.commands().is_empty());

        probe.probe().await.unwrap();
        assert_eq!(shell.commands(), vec!["exit 0".to_string()]);
        assert_eq!(shell.reachable_calls(), vec!["127.0.0.1:22".to_string(); 2]);
    }

    #[tokio::test]
    async fn test_ssh_available_failing_command() {
        let recorder = Recorder::default();
        let driver = MockDriver::new(DriverContext::new("dev", "/tmp/dev"), recorder);
        let shell = MockShell::new().failing_on("exit 0");

        let cause = SshAvailable::new("dev", &driver, &shell)
            .probe()
            .await
            .unwrap_err();
        assert!(cause.starts_with("Error running 'exit 0'"));
    }
}
