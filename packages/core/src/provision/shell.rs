//! Provisioner that bootstraps a node with plain shell commands over SSH

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use super::distro::{DistroInfo, engine_install_commands, engine_restart_command};
use super::error::ProvisionError;
use super::Provisioner;
use crate::host::{AuthOptions, EngineOptions, SwarmOptions};
use crate::ssh::{RemoteShell, SshTarget};

/// Directory on the node holding engine configuration and certificates
pub const REMOTE_ENGINE_DIR: &str = "/etc/docker";

/// Engine TLS port advertised to swarm
const ENGINE_PORT: u16 = 2376;

/// Provisioner for a detected Linux distribution
pub struct ShellProvisioner {
    machine_name: String,
    distro: DistroInfo,
    target: SshTarget,
    shell: Arc<dyn RemoteShell>,
}

impl ShellProvisioner {
    /// Create a provisioner for the node at `target`
    pub fn new(
        machine_name: impl Into<String>,
        distro: DistroInfo,
        target: SshTarget,
        shell: Arc<dyn RemoteShell>,
    ) -> Self {
        Self {
            machine_name: machine_name.into(),
            distro,
            target,
            shell,
        }
    }

    /// Distribution this provisioner was detected for
    pub fn distro(&self) -> &DistroInfo {
        &self.distro
    }

    async fn run(&self, command: &str) -> Result<String, ProvisionError> {
        Ok(self.shell.run(&self.target, command).await?)
    }

    async fn upload(&self, contents: &[u8], remote_path: &str) -> Result<(), ProvisionError> {
        let command = format!("sudo tee {remote_path} > /dev/null");
        self.shell
            .run_with_input(&self.target, &command, contents)
            .await?;
        Ok(())
    }

    async fn set_hostname(&self) -> Result<(), ProvisionError> {
        let name = &self.machine_name;
        self.run(&format!(
            "sudo hostname {name} && echo {name} | sudo tee /etc/hostname > /dev/null"
        ))
        .await?;
        Ok(())
    }

    async fn install_engine(&self, engine: &EngineOptions) -> Result<(), ProvisionError> {
        if self.run("command -v docker").await.is_ok() {
            tracing::debug!("Engine already installed on {}", self.machine_name);
            return Ok(());
        }

        let combined = if engine.install_url.is_empty() {
            engine_install_commands(&self.distro.family)?.join(" && ")
        } else {
            format!("curl -fsSL {} | sh", engine.install_url)
        };

        tracing::info!(
            "Installing engine on {} ({})",
            self.machine_name,
            self.distro.family
        );
        self.run(&combined).await?;
        Ok(())
    }
}

/// Engine daemon.json derived from engine and auth options
pub(crate) fn daemon_config(engine: &EngineOptions, auth: &AuthOptions) -> serde_json::Value {
    let mut config = serde_json::Map::new();

    let mut put_list = |key: &str, values: &[String]| {
        if !values.is_empty() {
            config.insert(key.to_string(), serde_json::json!(values));
        }
    };
    put_list("labels", &engine.labels);
    put_list("dns", &engine.dns);
    put_list("insecure-registries", &engine.insecure_registry);
    put_list("registry-mirrors", &engine.registry_mirror);

    if !engine.storage_driver.is_empty() {
        config.insert("storage-driver".into(), engine.storage_driver.clone().into());
    }
    if !engine.log_level.is_empty() {
        config.insert("log-level".into(), engine.log_level.clone().into());
    }
    if !engine.graph_dir.is_empty() {
        config.insert("data-root".into(), engine.graph_dir.clone().into());
    }
    if engine.ipv6 {
        config.insert("ipv6".into(), true.into());
    }
    if engine.selinux_enabled {
        config.insert("selinux-enabled".into(), true.into());
    }

    if auth.is_configured() {
        config.insert("tls".into(), true.into());
        config.insert("tlsverify".into(), engine.tls_verify.into());
        config.insert("tlscacert".into(), format!("{REMOTE_ENGINE_DIR}/ca.pem").into());
        config.insert("tlscert".into(), format!("{REMOTE_ENGINE_DIR}/server.pem").into());
        config.insert("tlskey".into(), format!("{REMOTE_ENGINE_DIR}/server-key.pem").into());
    }

    serde_json::Value::Object(config)
}

/// Commands that start the swarm containers for a node
///
/// Empty when the node is not part of a swarm.
pub fn swarm_commands(swarm: &SwarmOptions, advertise: &str) -> Vec<String> {
    if !swarm.is_swarm {
        return Vec::new();
    }

    let mut commands = Vec::new();

    if swarm.master {
        let port = swarm
            .host
            .rsplit(':')
            .next()
            .filter(|p| p.parse::<u16>().is_ok())
            .unwrap_or("3376");
        let mut manage = format!(
            "sudo docker run -d --restart=always --name swarm-agent-master -p {port}:{port} \
             -v {REMOTE_ENGINE_DIR}:/certs:ro {} manage --tlsverify \
             --tlscacert=/certs/ca.pem --tlscert=/certs/server.pem --tlskey=/certs/server-key.pem \
             -H {} --strategy {}",
            swarm.image, swarm.host, swarm.strategy
        );
        for flag in &swarm.arbitrary_flags {
            manage.push_str(&format!(" --{flag}"));
        }
        manage.push(' ');
        manage.push_str(&swarm.discovery);
        commands.push(manage);
    }

    let mut join = format!(
        "sudo docker run -d --restart=always --name swarm-agent {} join --advertise {}",
        swarm.image, advertise
    );
    if swarm.heartbeat > 0 {
        join.push_str(&format!(" --heartbeat {}s", swarm.heartbeat));
    }
    join.push(' ');
    join.push_str(&swarm.discovery);
    commands.push(join);

    commands
}

async fn read_required(what: &'static str, path: &Path) -> Result<Vec<u8>, ProvisionError> {
    if path.as_os_str().is_empty() || !path.exists() {
        return Err(ProvisionError::MissingCertificate {
            what,
            path: path.to_path_buf(),
        });
    }
    tokio::fs::read(path).await.map_err(|e| ProvisionError::Io {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl Provisioner for ShellProvisioner {
    fn name(&self) -> String {
        self.distro.family.to_string()
    }

    async fn provision(
        &self,
        swarm: &SwarmOptions,
        auth: &AuthOptions,
        engine: &EngineOptions,
    ) -> Result<(), ProvisionError> {
        self.set_hostname().await?;
        self.install_engine(engine).await?;

        let daemon = daemon_config(engine, auth);
        let daemon = serde_json::to_vec_pretty(&daemon).map_err(|e| ProvisionError::Io {
            path: "daemon.json".into(),
            reason: e.to_string(),
        })?;
        self.run(&format!("sudo mkdir -p {REMOTE_ENGINE_DIR}")).await?;
        self.upload(&daemon, &format!("{REMOTE_ENGINE_DIR}/daemon.json"))
            .await?;

        self.configure_auth(auth).await?;

        self.run(engine_restart_command(&self.distro.family)).await?;

        let advertise = format!("{}:{}", self.target.hostname, ENGINE_PORT);
        for command in swarm_commands(swarm, &advertise) {
            self.run(&command).await?;
        }

        tracing::info!("Provisioned {}", self.machine_name);
        Ok(())
    }

    async fn configure_auth(&self, auth: &AuthOptions) -> Result<(), ProvisionError> {
        if !auth.is_configured() {
            tracing::info!(
                "No TLS material configured for {}, skipping auth setup",
                self.machine_name
            );
            return Ok(());
        }

        let files = [
            ("CA certificate", &auth.ca_cert_path, "ca.pem"),
            ("server certificate", &auth.server_cert_path, "server.pem"),
            ("server key", &auth.server_key_path, "server-key.pem"),
        ];

        // Check everything locally before touching the node
        let mut contents = Vec::with_capacity(files.len());
        for (what, path, remote_name) in files {
            contents.push((read_required(what, path).await?, remote_name));
        }

        self.run(&format!("sudo mkdir -p {REMOTE_ENGINE_DIR}")).await?;
        for (bytes, remote_name) in &contents {
            self.upload(bytes, &format!("{REMOTE_ENGINE_DIR}/{remote_name}"))
                .await?;
        }
        self.run(&format!("sudo chmod 0600 {REMOTE_ENGINE_DIR}/server-key.pem"))
            .await?;

        tracing::debug!("Installed TLS material on {}", self.machine_name);
        Ok(())
    }
}
