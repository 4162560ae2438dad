//! The `generic` driver
//!
//! Adopts an existing machine that is already reachable over SSH. Nothing is
//! created or destroyed; power operations are issued as `shutdown` commands.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Driver, DriverContext, DriverError, DriverOptions, RunState};
use crate::ssh::{self, OpenSsh, RemoteShell, SshTarget};

/// Registry tag
pub const DRIVER_NAME: &str = "generic";

/// Default port of the container engine API
pub const DEFAULT_ENGINE_PORT: u16 = 2376;

/// How long a state query waits for the SSH port to answer
const STATE_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
struct GenericFields {
    #[serde(rename = "IPAddress", default)]
    ip_address: String,

    #[serde(rename = "SSHUser", default = "default_user")]
    ssh_user: String,

    #[serde(rename = "SSHPort", default = "default_ssh_port")]
    ssh_port: u16,

    #[serde(rename = "SSHKeyPath", default)]
    ssh_key_path: Option<PathBuf>,

    #[serde(default = "default_engine_port")]
    engine_port: u16,
}

fn default_user() -> String {
    whoami::username()
}

fn default_ssh_port() -> u16 {
    ssh::DEFAULT_SSH_PORT
}

fn default_engine_port() -> u16 {
    DEFAULT_ENGINE_PORT
}

impl Default for GenericFields {
    fn default() -> Self {
        Self {
            ip_address: String::new(),
            ssh_user: default_user(),
            ssh_port: default_ssh_port(),
            ssh_key_path: None,
            engine_port: default_engine_port(),
        }
    }
}

/// Driver for machines provisioned outside of nodewright
#[derive(Debug)]
pub struct GenericDriver {
    ctx: DriverContext,
    fields: GenericFields,
}

impl GenericDriver {
    /// Create an unconfigured driver
    pub fn new(ctx: DriverContext) -> Self {
        Self {
            ctx,
            fields: GenericFields::default(),
        }
    }

    fn target(&self) -> Result<SshTarget, DriverError> {
        if self.fields.ip_address.is_empty() {
            return Err(DriverError::MissingOption("ip".to_string()));
        }
        let mut target = SshTarget::new(&self.fields.ip_address, &self.fields.ssh_user)
            .with_port(self.fields.ssh_port);
        target.key_path = self.fields.ssh_key_path.clone();
        Ok(target)
    }

    fn shell(&self) -> OpenSsh {
        OpenSsh::new(self.ctx.ssh)
    }

    async fn run_power_command(&self, command: &str) -> Result<(), DriverError> {
        let target = self.target()?;
        tracing::info!("Running '{}' on {}", command, self.ctx.machine_name);
        self.shell()
            .run(&target, command)
            .await
            .map(|_| ())
            .map_err(|e| DriverError::Operation(e.to_string()))
    }
}

#[async_trait]
impl Driver for GenericDriver {
    fn driver_name(&self) -> &'static str {
        DRIVER_NAME
    }

    /// Explicit flags win over ~/.ssh/config, which wins over defaults
    fn set_config_from_flags(&mut self, flags: &DriverOptions) -> Result<(), DriverError> {
        let ip = flags.require("ip")?;

        let from_ssh_config = ssh::query_ssh_config(ip).unwrap_or_else(|e| {
            tracing::debug!("Ignoring unreadable SSH config: {}", e);
            Default::default()
        });

        self.fields.ip_address = from_ssh_config
            .hostname
            .clone()
            .unwrap_or_else(|| ip.to_string());

        if let Some(user) = flags.get("ssh-user").or(from_ssh_config.user.as_deref()) {
            self.fields.ssh_user = user.to_string();
        }
        if let Some(port) = flags.get_parsed::<u16>("ssh-port")?.or(from_ssh_config.port) {
            self.fields.ssh_port = port;
        }
        if let Some(key) = flags
            .get("ssh-key")
            .map(PathBuf::from)
            .or(from_ssh_config.identity_file)
        {
            self.fields.ssh_key_path = Some(key);
        }
        if let Some(port) = flags.get_parsed::<u16>("engine-port")? {
            self.fields.engine_port = port;
        }

        Ok(())
    }

    async fn create(&mut self) -> Result<(), DriverError> {
        self.target()?;
        if let Some(key) = &self.fields.ssh_key_path {
            if !key.exists() {
                return Err(DriverError::Operation(format!(
                    "SSH key {} does not exist",
                    key.display()
                )));
            }
        }
        tracing::info!(
            "Adopting existing machine {} at {}",
            self.ctx.machine_name,
            self.fields.ip_address
        );
        Ok(())
    }

    async fn start(&mut self) -> Result<(), DriverError> {
        Err(DriverError::NotSupported {
            driver: DRIVER_NAME,
            operation: "start",
        })
    }

    async fn stop(&mut self) -> Result<(), DriverError> {
        self.run_power_command("sudo shutdown -h now").await
    }

    async fn kill(&mut self) -> Result<(), DriverError> {
        self.run_power_command("sudo shutdown -P now").await
    }

    async fn remove(&mut self) -> Result<(), DriverError> {
        // The machine outlives its registration
        Ok(())
    }

    async fn state(&self) -> Result<RunState, DriverError> {
        let target = self.target()?;
        match ssh::check_tcp(&target.address(), STATE_CHECK_TIMEOUT).await {
            Ok(()) => Ok(RunState::Running),
            Err(e) => {
                tracing::debug!("{} looks stopped: {}", self.ctx.machine_name, e);
                Ok(RunState::Stopped)
            }
        }
    }

    async fn url(&self) -> Result<String, DriverError> {
        let target = self.target()?;
        Ok(format!(
            "tcp://{}:{}",
            target.hostname, self.fields.engine_port
        ))
    }

    async fn ssh_hostname(&self) -> Result<String, DriverError> {
        Ok(self.target()?.hostname)
    }

    fn ssh_port(&self) -> Result<u16, DriverError> {
        Ok(self.fields.ssh_port)
    }

    fn ssh_username(&self) -> String {
        self.fields.ssh_user.clone()
    }

    fn ssh_key_path(&self) -> Option<PathBuf> {
        self.fields.ssh_key_path.clone()
    }

    fn save_fields(&self) -> Result<serde_json::Value, DriverError> {
        Ok(serde_json::to_value(&self.fields)?)
    }

    fn load_fields(&mut self, raw: serde_json::Value) -> Result<(), DriverError> {
        self.fields = serde_json::from_value(raw)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssh::SshOptions;

    fn configured(flags: DriverOptions) -> GenericDriver {
        let mut d = GenericDriver::new(DriverContext::new("box", "/tmp/box"));
        d.set_config_from_flags(&flags).unwrap();
        d
    }

    #[tokio::test]
    async fn test_flags_and_addressing() {
        let d = configured(
            DriverOptions::new()
                .with("ip", "192.0.2.10")
                .with("ssh-user", "admin")
                .with("ssh-port", "2222")
                .with("ssh-key", "/keys/admin"),
        );

        assert_eq!(d.ssh_hostname().await.unwrap(), "192.0.2.10");
        assert_eq!(d.ssh_port().unwrap(), 2222);
        assert_eq!(d.ssh_username(), "admin");
        assert_eq!(d.ssh_key_path(), Some(PathBuf::from("/keys/admin")));
        assert_eq!(d.url().await.unwrap(), "tcp://192.0.2.10:2376");
    }

    #[test]
    fn test_ip_is_required() {
        let mut d = GenericDriver::new(DriverContext::new("box", "/tmp/box"));
        let err = d.set_config_from_flags(&DriverOptions::new()).unwrap_err();
        assert!(matches!(err, DriverError::MissingOption(ref k) if k == "ip"));
    }

    #[tokio::test]
    async fn test_create_rejects_missing_key() {
        let mut d = configured(
            DriverOptions::new()
                .with("ip", "192.0.2.10")
                .with("ssh-key", "/definitely/not/here"),
        );
        let err = d.create().await.unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here"));
    }

    #[tokio::test]
    async fn test_state_follows_ssh_port() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let d = configured(
            DriverOptions::new()
                .with("ip", "127.0.0.1")
                .with("ssh-port", port.to_string()),
        );
        assert_eq!(d.state().await.unwrap(), RunState::Running);

        drop(listener);
        assert_eq!(d.state().await.unwrap(), RunState::Stopped);
    }

    #[test]
    fn test_fields_round_trip() {
        let d = configured(
            DriverOptions::new()
                .with("ip", "192.0.2.10")
                .with("ssh-user", "admin")
                .with("engine-port", "2377"),
        );
        let raw = d.save_fields().unwrap();
        assert_eq!(raw["IPAddress"], "192.0.2.10");
        assert_eq!(raw["SSHUser"], "admin");
        assert_eq!(raw["EnginePort"], 2377);

        let mut restored = GenericDriver::new(DriverContext::new("box", "/tmp/box"));
        restored.load_fields(raw).unwrap();
        assert_eq!(restored.fields, d.fields);
    }

    #[test]
    fn test_power_commands_use_context_ssh_options() {
        let ssh = SshOptions {
            connect_timeout: Duration::from_secs(3),
            strict_host_key_checking: true,
        };
        let d = GenericDriver::new(DriverContext::new("box", "/tmp/box").with_ssh(ssh));
        assert_eq!(d.shell().options(), &ssh);
    }

    #[tokio::test]
    async fn test_start_is_unsupported() {
        let mut d = configured(DriverOptions::new().with("ip", "192.0.2.10"));
        assert!(matches!(
            d.start().await,
            Err(DriverError::NotSupported { .. })
        ));
    }
}
