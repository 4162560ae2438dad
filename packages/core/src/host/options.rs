//! Host option blocks
//!
//! The authoritative options bundle of a host, persisted under `HostConfig`
//! in its config.json. Keys are PascalCase to stay readable by older stores.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Options for the host: driver tag, sizing hints, engine, swarm and auth
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct HostOptions {
    /// Driver tag the host was created with
    pub driver: String,

    /// Memory hint in MB (0 = driver default)
    pub memory: u64,

    /// Disk hint in MB (0 = driver default)
    pub disk: u64,

    /// Container engine settings applied during provisioning
    pub engine_config: EngineOptions,

    /// Swarm membership settings applied during provisioning
    pub swarm_config: SwarmOptions,

    /// Certificate locations used by the driver and the provisioner
    pub auth_config: AuthOptions,
}

impl HostOptions {
    /// Create options for a driver with default blocks
    pub fn new(driver: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            ..Default::default()
        }
    }

    /// Builder pattern: set memory hint
    pub fn with_memory(mut self, memory: u64) -> Self {
        self.memory = memory;
        self
    }

    /// Builder pattern: set disk hint
    pub fn with_disk(mut self, disk: u64) -> Self {
        self.disk = disk;
        self
    }

    /// Builder pattern: set auth options
    pub fn with_auth(mut self, auth: AuthOptions) -> Self {
        self.auth_config = auth;
        self
    }

    /// Builder pattern: set swarm options
    pub fn with_swarm(mut self, swarm: SwarmOptions) -> Self {
        self.swarm_config = swarm;
        self
    }

    /// Builder pattern: set engine options
    pub fn with_engine(mut self, engine: EngineOptions) -> Self {
        self.engine_config = engine;
        self
    }
}

/// Container engine settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct EngineOptions {
    pub arbitrary_flags: Vec<String>,
    pub dns: Vec<String>,
    pub graph_dir: String,
    pub env: Vec<String>,
    pub ipv6: bool,
    pub insecure_registry: Vec<String>,
    pub labels: Vec<String>,
    pub log_level: String,
    pub storage_driver: String,
    pub selinux_enabled: bool,
    pub tls_verify: bool,
    pub registry_mirror: Vec<String>,
    /// Script URL used instead of the distribution packages when set
    #[serde(rename = "InstallURL")]
    pub install_url: String,
}

/// Default swarm image
pub const DEFAULT_SWARM_IMAGE: &str = "swarm:latest";

/// Default swarm manager listen address
pub const DEFAULT_SWARM_HOST: &str = "tcp://0.0.0.0:3376";

/// Default swarm scheduling strategy
pub const DEFAULT_SWARM_STRATEGY: &str = "spread";

/// Swarm membership settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct SwarmOptions {
    pub is_swarm: bool,
    pub address: String,
    pub discovery: String,
    pub master: bool,
    pub host: String,
    pub image: String,
    pub strategy: String,
    pub heartbeat: u32,
    pub overcommit: f64,
    pub arbitrary_flags: Vec<String>,
}

impl Default for SwarmOptions {
    fn default() -> Self {
        Self {
            is_swarm: false,
            address: String::new(),
            discovery: String::new(),
            master: false,
            host: DEFAULT_SWARM_HOST.to_string(),
            image: DEFAULT_SWARM_IMAGE.to_string(),
            strategy: DEFAULT_SWARM_STRATEGY.to_string(),
            heartbeat: 0,
            overcommit: 0.0,
            arbitrary_flags: Vec::new(),
        }
    }
}

/// Certificate and key locations
///
/// Empty paths mean "not configured".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct AuthOptions {
    pub store_path: PathBuf,
    pub ca_cert_path: PathBuf,
    pub ca_private_key_path: PathBuf,
    pub server_cert_path: PathBuf,
    pub server_key_path: PathBuf,
    pub client_cert_path: PathBuf,
    pub client_key_path: PathBuf,
    pub private_key_path: PathBuf,
}

impl AuthOptions {
    /// Conventional file layout inside a certificate directory
    pub fn for_store(certs_dir: impl AsRef<Path>) -> Self {
        let dir = certs_dir.as_ref();
        Self {
            store_path: dir.to_path_buf(),
            ca_cert_path: dir.join("ca.pem"),
            ca_private_key_path: dir.join("ca-key.pem"),
            server_cert_path: dir.join("server.pem"),
            server_key_path: dir.join("server-key.pem"),
            client_cert_path: dir.join("cert.pem"),
            client_key_path: dir.join("key.pem"),
            private_key_path: dir.join("ca-key.pem"),
        }
    }

    /// Whether any TLS material is configured
    pub fn is_configured(&self) -> bool {
        !is_unset(&self.ca_cert_path)
    }

    /// CA certificate path, if configured
    pub fn ca_cert(&self) -> Option<PathBuf> {
        non_empty(&self.ca_cert_path)
    }

    /// Private key path, if configured
    pub fn private_key(&self) -> Option<PathBuf> {
        non_empty(&self.private_key_path)
    }
}

pub(crate) fn is_unset(path: &Path) -> bool {
    path.as_os_str().is_empty()
}

fn non_empty(path: &Path) -> Option<PathBuf> {
    (!is_unset(path)).then(|| path.to_path_buf())
}
