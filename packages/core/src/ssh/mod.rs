//! Remote shell access to nodes
//!
//! Provides:
//! - SSH command construction from a driver's addressing info
//! - The [`RemoteShell`] interface used by readiness probes and provisioners
//! - [`OpenSsh`], the default implementation backed by the `ssh` binary

pub mod config;
mod error;

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::driver::{Driver, DriverError};

pub use config::{SshConfigMatch, query_ssh_config};
pub use error::ShellError;

/// Default SSH port
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Where and as whom to open a remote shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    /// Hostname or IP address
    pub hostname: String,
    /// SSH port
    pub port: u16,
    /// Remote username
    pub user: String,
    /// Private key, if not using the agent
    pub key_path: Option<PathBuf>,
}

impl SshTarget {
    /// Create a target on the default port with no explicit key
    pub fn new(hostname: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            port: DEFAULT_SSH_PORT,
            user: user.into(),
            key_path: None,
        }
    }

    /// Builder pattern: set port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Builder pattern: set private key
    pub fn with_key_path(mut self, key_path: impl Into<PathBuf>) -> Self {
        self.key_path = Some(key_path.into());
        self
    }

    /// `host:port` for TCP reachability checks
    pub fn address(&self) -> String {
        if self.hostname.contains(':') {
            format!("[{}]:{}", self.hostname, self.port)
        } else {
            format!("{}:{}", self.hostname, self.port)
        }
    }

    /// Resolve the target from a driver's addressing methods
    pub async fn from_driver(driver: &dyn Driver) -> Result<Self, DriverError> {
        let hostname = driver.ssh_hostname().await?;
        let port = driver.ssh_port()?;
        Ok(Self {
            hostname,
            port,
            user: driver.ssh_username(),
            key_path: driver.ssh_key_path(),
        })
    }
}

/// Client-side SSH options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SshOptions {
    /// Timeout for the TCP connect and SSH handshake
    pub connect_timeout: Duration,
    /// Verify host keys against known_hosts (accepting new ones)
    pub strict_host_key_checking: bool,
}

impl Default for SshOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            strict_host_key_checking: false,
        }
    }
}

/// Build an `ssh` command running `args` on `target`
pub fn build_ssh_command(target: &SshTarget, options: &SshOptions, args: &[&str]) -> Command {
    let mut cmd = Command::new("ssh");

    // Never prompt; fail fast on auth problems
    cmd.arg("-o")
        .arg("BatchMode=yes")
        .arg("-o")
        .arg(format!(
            "ConnectTimeout={}",
            options.connect_timeout.as_secs().max(1)
        ))
        .arg("-o")
        .arg("LogLevel=quiet");

    if options.strict_host_key_checking {
        cmd.arg("-o").arg("StrictHostKeyChecking=accept-new");
    } else {
        // Machines are recreated with the same address all the time
        cmd.arg("-o")
            .arg("StrictHostKeyChecking=no")
            .arg("-o")
            .arg("UserKnownHostsFile=/dev/null");
    }

    cmd.arg("-p").arg(target.port.to_string());

    if let Some(key) = &target.key_path {
        cmd.arg("-o").arg("IdentitiesOnly=yes");
        cmd.arg("-i").arg(key);
    }

    cmd.arg(format!("{}@{}", target.user, target.hostname));
    cmd.args(args);

    cmd
}

/// Check that `addr` accepts TCP connections within `timeout`
pub async fn check_tcp(addr: &str, timeout: Duration) -> Result<(), ShellError> {
    match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(_stream)) => Ok(()),
        Ok(Err(e)) => Err(ShellError::Unreachable {
            addr: addr.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Err(ShellError::Unreachable {
            addr: addr.to_string(),
            reason: format!("no answer within {timeout:?}"),
        }),
    }
}

/// Remote-shell transport consumed by readiness probes and provisioners
#[async_trait]
pub trait RemoteShell: Send + Sync {
    /// Check that `addr` accepts TCP connections
    async fn reachable(&self, addr: &str) -> Result<(), ShellError>;

    /// Run `command` on `target` and return its stdout
    async fn run(&self, target: &SshTarget, command: &str) -> Result<String, ShellError>;

    /// Run `command` on `target` with `input` on stdin and return its stdout
    async fn run_with_input(
        &self,
        target: &SshTarget,
        command: &str,
        input: &[u8],
    ) -> Result<String, ShellError>;
}

/// [`RemoteShell`] backed by the system OpenSSH client
#[derive(Debug, Clone, Default)]
pub struct OpenSsh {
    options: SshOptions,
}

impl OpenSsh {
    /// Create a shell using the given client options
    pub fn new(options: SshOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SshOptions {
        &self.options
    }

    fn command(&self, target: &SshTarget, command: &str) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::from(build_ssh_command(
            target,
            &self.options,
            &[command],
        ));
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        cmd
    }

    fn finish(command: &str, output: std::process::Output) -> Result<String, ShellError> {
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            Err(ShellError::CommandFailed {
                command: command.to_string(),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

fn spawn_error(e: std::io::Error) -> ShellError {
    if e.kind() == std::io::ErrorKind::NotFound {
        ShellError::Spawn("SSH not found. Install OpenSSH client.".to_string())
    } else {
        ShellError::Spawn(e.to_string())
    }
}

#[async_trait]
impl RemoteShell for OpenSsh {
    async fn reachable(&self, addr: &str) -> Result<(), ShellError> {
        check_tcp(addr, self.options.connect_timeout).await
    }

    async fn run(&self, target: &SshTarget, command: &str) -> Result<String, ShellError> {
        tracing::debug!(
            "Running over SSH on {}@{}: {}",
            target.user,
            target.hostname,
            command
        );

        let mut cmd = self.command(target, command);
        cmd.stdin(Stdio::null());
        let output = cmd.output().await.map_err(spawn_error)?;

        Self::finish(command, output)
    }

    async fn run_with_input(
        &self,
        target: &SshTarget,
        command: &str,
        input: &[u8],
    ) -> Result<String, ShellError> {
        tracing::debug!(
            "Running over SSH on {}@{} with {} bytes of input: {}",
            target.user,
            target.hostname,
            input.len(),
            command
        );

        let mut cmd = self.command(target, command);
        cmd.stdin(Stdio::piped());
        let mut child = cmd.spawn().map_err(spawn_error)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input)
                .await
                .map_err(|e| ShellError::Spawn(format!("Failed to write to ssh stdin: {e}")))?;
            // Dropping stdin closes it so the remote command sees EOF
        }

        let output = child.wait_with_output().await.map_err(spawn_error)?;
        Self::finish(command, output)
    }
}
