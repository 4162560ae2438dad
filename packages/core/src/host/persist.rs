//! Host config storage
//!
//! Load and save `<store>/config.json`. Loading is two-phase: the
//! `DriverName` tag picks the driver factory, then the concrete driver
//! decodes its own `Driver` object.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::HostError;
use super::options::{HostOptions, is_unset};
use super::{Host, HostEnv, driver_context};
use crate::driver::Driver;

/// Name of the per-host config file inside the store directory
pub const CONFIG_FILE: &str = "config.json";

/// Record written to config.json
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct HostRecord<'a> {
    driver_name: &'a str,
    driver: serde_json::Value,
    store_path: &'a Path,
    host_config: &'a HostOptions,
}

/// First-phase view of config.json
///
/// The legacy fields come from stores written before options were grouped
/// under `HostConfig`. They are read, migrated and never written back.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct HostMetadata {
    driver_name: String,
    driver: Option<serde_json::Value>,
    host_config: Option<HostOptions>,

    swarm_host: String,
    swarm_master: bool,
    swarm_discovery: String,
    ca_cert_path: PathBuf,
    private_key_path: PathBuf,
    server_cert_path: PathBuf,
    server_key_path: PathBuf,
    client_cert_path: PathBuf,
}

impl HostMetadata {
    /// Fold legacy top-level fields into the options they belong to
    ///
    /// A legacy value only fills a target that is empty. When the whole
    /// `HostConfig` block is missing, the swarm host default is not treated
    /// as a user choice and the legacy value replaces it.
    fn into_options(self) -> HostOptions {
        let block_missing = self.host_config.is_none();
        let mut options = self.host_config.unwrap_or_default();

        if options.driver.is_empty() {
            options.driver = self.driver_name.clone();
        }

        let swarm = &mut options.swarm_config;
        if !self.swarm_host.is_empty() && (block_missing || swarm.host.is_empty()) {
            swarm.host = self.swarm_host;
        }
        if self.swarm_master && !swarm.master {
            swarm.master = true;
        }
        if !self.swarm_discovery.is_empty() && swarm.discovery.is_empty() {
            swarm.discovery = self.swarm_discovery;
            swarm.is_swarm = true;
        }

        let auth = &mut options.auth_config;
        fill_path(&mut auth.ca_cert_path, self.ca_cert_path);
        fill_path(&mut auth.private_key_path, self.private_key_path);
        fill_path(&mut auth.server_cert_path, self.server_cert_path);
        fill_path(&mut auth.server_key_path, self.server_key_path);
        fill_path(&mut auth.client_cert_path, self.client_cert_path);

        options
    }
}

fn fill_path(target: &mut PathBuf, legacy: PathBuf) {
    if is_unset(target) && !is_unset(&legacy) {
        *target = legacy;
    }
}

/// Read config.json and rebuild the driver it describes
pub(super) fn read_config(
    name: &str,
    store_path: &Path,
    env: &HostEnv,
) -> Result<(String, Box<dyn Driver>, HostOptions), HostError> {
    let config_path = store_path.join(CONFIG_FILE);

    let contents = fs::read_to_string(&config_path).map_err(|e| {
        HostError::LoadFailed(format!("Failed to read {}: {}", config_path.display(), e))
    })?;

    let mut metadata: HostMetadata = serde_json::from_str(&contents).map_err(|e| {
        HostError::LoadFailed(format!("Invalid JSON in {}: {}", config_path.display(), e))
    })?;

    if metadata.driver_name.is_empty() {
        return Err(HostError::LoadFailed(format!(
            "{} has no DriverName",
            config_path.display()
        )));
    }

    let driver_name = metadata.driver_name.clone();
    let raw_driver = metadata.driver.take();
    let options = metadata.into_options();

    let ctx = driver_context(name, store_path, &options.auth_config, env);
    let driver = env
        .drivers
        .load_driver(&driver_name, ctx, raw_driver)
        .map_err(|e| HostError::LoadFailed(format!("{}: {}", config_path.display(), e)))?;

    tracing::debug!(
        "Loaded host {} ({} driver) from {}",
        name,
        driver_name,
        config_path.display()
    );
    Ok((driver_name, driver, options))
}

/// Serialize the host and atomically replace its config.json
///
/// The store directory must already exist.
pub(super) fn write_config(host: &Host) -> Result<(), HostError> {
    let driver = host
        .driver
        .save_fields()
        .map_err(|e| HostError::SaveFailed(format!("Failed to encode driver fields: {e}")))?;

    let record = HostRecord {
        driver_name: &host.driver_name,
        driver,
        store_path: &host.store_path,
        host_config: &host.options,
    };

    let json = serde_json::to_string_pretty(&record)
        .map_err(|e| HostError::SaveFailed(format!("Failed to serialize: {e}")))?;

    let config_path = host.config_path();
    replace_file(&config_path, json.as_bytes()).map_err(|e| {
        HostError::SaveFailed(format!("Failed to write {}: {}", config_path.display(), e))
    })?;

    tracing::debug!("Saved host {} to {}", host.name, config_path.display());
    Ok(())
}

/// Write `contents` next to `path`, fsync, then rename over `path`
///
/// Readers see either the old file or the new one, never a partial write.
fn replace_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let tmp_path = path.with_extension("json.tmp");

    let mut open = OpenOptions::new();
    open.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        open.mode(0o600);
    }

    let mut file = open.open(&tmp_path)?;
    file.write_all(contents)?;

    // mode() only applies when the file is created
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    file.sync_all()?;
    drop(file);

    fs::rename(&tmp_path, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{AuthOptions, EngineOptions, SwarmOptions};
    use crate::testing::{MockDriver, Recorder, test_env};
    use tempfile::TempDir;

    fn options() -> HostOptions {
        HostOptions::new(MockDriver::NAME)
            .with_memory(2048)
            .with_disk(40000)
            .with_engine(EngineOptions {
                labels: vec!["env=dev".to_string()],
                storage_driver: "overlay2".to_string(),
                ..Default::default()
            })
            .with_swarm(SwarmOptions {
                is_swarm: true,
                discovery: "token://abc".to_string(),
                heartbeat: 5,
                overcommit: 0.25,
                ..Default::default()
            })
            .with_auth(AuthOptions::for_store("/data/certs"))
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let store = temp_dir.path().join("dev");
        fs::create_dir_all(&store).unwrap();
        let recorder = Recorder::default();

        let mut host = Host::new("dev", MockDriver::NAME, options(), &store, test_env(&recorder))
            .unwrap();
        host.driver_mut()
            .set_config_from_flags(&crate::driver::DriverOptions::new().with("marker", "m-1"))
            .unwrap();
        host.save_config().unwrap();

        let loaded = Host::load("dev", &store, test_env(&recorder)).unwrap();
        assert_eq!(loaded.options(), host.options());
        assert_eq!(loaded.driver_name(), "mock");
        assert_eq!(loaded.driver().driver_name(), "mock");
        assert_eq!(loaded.driver().save_fields().unwrap()["Marker"], "m-1");
    }

    #[test]
    fn test_saved_layout() {
        let temp_dir = TempDir::new().unwrap();
        let store = temp_dir.path().join("dev");
        fs::create_dir_all(&store).unwrap();
        let recorder = Recorder::default();

        let host = Host::new("dev", MockDriver::NAME, options(), &store, test_env(&recorder))
            .unwrap();
        host.save_config().unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.join(CONFIG_FILE)).unwrap()).unwrap();
        assert_eq!(raw["DriverName"], "mock");
        assert!(raw["Driver"].is_object());
        assert_eq!(raw["StorePath"], store.to_str().unwrap());
        assert_eq!(raw["HostConfig"]["Memory"], 2048);
        assert!(raw.get("Name").is_none());
        assert!(!store.join("config.json.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_config_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let store = temp_dir.path().join("dev");
        fs::create_dir_all(&store).unwrap();
        let recorder = Recorder::default();

        let host = Host::new("dev", MockDriver::NAME, options(), &store, test_env(&recorder))
            .unwrap();
        host.save_config().unwrap();
        // Saving twice replaces the file in place
        host.save_config().unwrap();

        let mode = fs::metadata(store.join(CONFIG_FILE))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_save_does_not_recreate_missing_store() {
        let temp_dir = TempDir::new().unwrap();
        let store = temp_dir.path().join("gone");
        let recorder = Recorder::default();

        let host = Host::new("gone", MockDriver::NAME, options(), &store, test_env(&recorder))
            .unwrap();
        let err = host.save_config().unwrap_err();

        assert!(matches!(err, HostError::SaveFailed(_)));
        assert!(!store.exists());
    }

    #[test]
    fn test_legacy_fields_are_migrated() {
        let temp_dir = TempDir::new().unwrap();
        let store = temp_dir.path().join("old");
        fs::create_dir_all(&store).unwrap();
        fs::write(
            store.join(CONFIG_FILE),
            r#"{
                "DriverName": "mock",
                "Driver": {"Marker": "legacy"},
                "SwarmHost": "tcp://0.0.0.0:4000",
                "SwarmMaster": true,
                "SwarmDiscovery": "token://old",
                "CaCertPath": "/old/ca.pem",
                "PrivateKeyPath": "/old/ca-key.pem",
                "ServerCertPath": "/old/server.pem",
                "ServerKeyPath": "/old/server-key.pem",
                "ClientCertPath": "/old/cert.pem"
            }"#,
        )
        .unwrap();

        let recorder = Recorder::default();
        let host = Host::load("old", &store, test_env(&recorder)).unwrap();
        let options = host.options();

        assert_eq!(options.driver, "mock");
        assert_eq!(options.swarm_config.host, "tcp://0.0.0.0:4000");
        assert!(options.swarm_config.master);
        assert!(options.swarm_config.is_swarm);
        assert_eq!(options.swarm_config.discovery, "token://old");
        assert_eq!(options.auth_config.ca_cert_path, PathBuf::from("/old/ca.pem"));
        assert_eq!(
            options.auth_config.client_cert_path,
            PathBuf::from("/old/cert.pem")
        );

        // Legacy keys are not written back
        host.save_config().unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.join(CONFIG_FILE)).unwrap()).unwrap();
        assert!(raw.get("SwarmHost").is_none());
        assert!(raw.get("CaCertPath").is_none());
        assert_eq!(raw["HostConfig"]["AuthConfig"]["CaCertPath"], "/old/ca.pem");
    }

    #[test]
    fn test_legacy_fields_do_not_override_host_config() {
        let metadata: HostMetadata = serde_json::from_str(
            r#"{
                "DriverName": "mock",
                "HostConfig": {
                    "SwarmConfig": {"Host": "tcp://0.0.0.0:5000"},
                    "AuthConfig": {"CaCertPath": "/new/ca.pem"}
                },
                "SwarmHost": "tcp://0.0.0.0:4000",
                "CaCertPath": "/old/ca.pem",
                "ServerCertPath": "/old/server.pem"
            }"#,
        )
        .unwrap();

        let options = metadata.into_options();
        assert_eq!(options.swarm_config.host, "tcp://0.0.0.0:5000");
        assert_eq!(options.auth_config.ca_cert_path, PathBuf::from("/new/ca.pem"));
        assert_eq!(
            options.auth_config.server_cert_path,
            PathBuf::from("/old/server.pem")
        );
    }

    #[test]
    fn test_load_rejects_bad_records() {
        let temp_dir = TempDir::new().unwrap();
        let recorder = Recorder::default();

        let store = temp_dir.path().join("empty");
        fs::create_dir_all(&store).unwrap();
        assert!(matches!(
            Host::load("empty", &store, test_env(&recorder)),
            Err(HostError::LoadFailed(_))
        ));

        fs::write(store.join(CONFIG_FILE), "{not json").unwrap();
        assert!(matches!(
            Host::load("empty", &store, test_env(&recorder)),
            Err(HostError::LoadFailed(_))
        ));

        fs::write(store.join(CONFIG_FILE), r#"{"DriverName": "virtualbox"}"#).unwrap();
        let err = Host::load("empty", &store, test_env(&recorder)).unwrap_err();
        assert!(err.to_string().contains("virtualbox"));
    }
}
