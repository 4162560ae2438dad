//! Directory of host stores
//!
//! Each host lives in `<base_dir>/<name>/` with its config.json and any
//! driver artifacts.

use std::fs;
use std::path::{Path, PathBuf};

use crate::driver::DriverOptions;
use crate::host::{CONFIG_FILE, Host, HostEnv, HostError, HostOptions, validate_host_name};

/// All hosts under one base directory
#[derive(Debug, Clone)]
pub struct HostStore {
    base_dir: PathBuf,
    env: HostEnv,
}

impl HostStore {
    pub fn new(base_dir: impl Into<PathBuf>, env: HostEnv) -> Self {
        Self {
            base_dir: base_dir.into(),
            env,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn env(&self) -> &HostEnv {
        &self.env
    }

    /// Store directory of host `name`
    pub fn host_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.host_path(name).exists()
    }

    /// Names of all stored hosts, sorted
    ///
    /// A host is any subdirectory holding a config.json.
    pub fn list(&self) -> Result<Vec<String>, HostError> {
        if !self.base_dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.base_dir).map_err(|e| {
            HostError::LoadFailed(format!("Failed to read {}: {}", self.base_dir.display(), e))
        })?;

        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.path().join(CONFIG_FILE).is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        names.sort();

        Ok(names)
    }

    /// Prepare a new host: validate the name, claim its directory, apply
    /// the driver flags and write its first config.json
    ///
    /// The host is not created on its infrastructure; call
    /// [`Host::create`] for that. Because the record exists from here on, a
    /// host whose driver create fails can still be loaded and removed.
    pub fn create(
        &self,
        name: &str,
        driver_name: &str,
        options: HostOptions,
        flags: &DriverOptions,
    ) -> Result<Host, HostError> {
        validate_host_name(name)?;
        if self.exists(name) {
            return Err(HostError::AlreadyExists(name.to_string()));
        }

        let store_path = self.host_path(name);
        let mut host = Host::new(name, driver_name, options, &store_path, self.env.clone())?;

        fs::create_dir_all(&store_path).map_err(|e| {
            HostError::SaveFailed(format!("Failed to create {}: {}", store_path.display(), e))
        })?;

        let prepared = host
            .driver_mut()
            .set_config_from_flags(flags)
            .map_err(HostError::from)
            .and_then(|()| host.save_config());
        if let Err(e) = prepared {
            // The directory is ours and holds nothing worth keeping
            let _ = fs::remove_dir_all(&store_path);
            return Err(e);
        }

        tracing::debug!("Prepared host {} at {}", name, store_path.display());
        Ok(host)
    }

    /// Load a stored host
    pub fn load(&self, name: &str) -> Result<Host, HostError> {
        validate_host_name(name)?;
        Host::load(name, self.host_path(name), self.env.clone())
    }

    /// Delete the directory of a host that has no config.json
    ///
    /// Such a directory cannot be loaded, so [`Host::remove`] never sees it.
    /// Directories holding a record are refused.
    pub fn purge(&self, name: &str) -> Result<(), HostError> {
        validate_host_name(name)?;
        let store_path = self.host_path(name);
        if !store_path.is_dir() {
            return Err(HostError::NotFound(name.to_string()));
        }
        if store_path.join(CONFIG_FILE).exists() {
            return Err(HostError::RemoveFailed(format!(
                "{} holds a host record, remove it instead",
                store_path.display()
            )));
        }

        fs::remove_dir_all(&store_path).map_err(|e| {
            HostError::RemoveFailed(format!("{}: {}", store_path.display(), e))
        })?;
        tracing::warn!("Purged store directory {} without a record", store_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockDriver, Recorder, test_env};
    use tempfile::TempDir;

    fn store(temp_dir: &TempDir, recorder: &Recorder) -> HostStore {
        HostStore::new(temp_dir.path().join("machines"), test_env(recorder))
    }

    #[test]
    fn test_list_empty_when_base_missing() {
        let temp_dir = TempDir::new().unwrap();
        let recorder = Recorder::default();
        assert!(store(&temp_dir, &recorder).list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_load_list() {
        let temp_dir = TempDir::new().unwrap();
        let recorder = Recorder::default();
        let store = store(&temp_dir, &recorder);

        for name in ["web", "db"] {
            let mut host = store
                .create(
                    name,
                    MockDriver::NAME,
                    HostOptions::default(),
                    &DriverOptions::new().with("marker", name),
                )
                .unwrap();
            host.create().await.unwrap();
        }
        // A directory without config.json is not a host
        fs::create_dir_all(store.host_path("stray")).unwrap();

        assert_eq!(store.list().unwrap(), vec!["db", "web"]);

        let host = store.load("web").unwrap();
        assert_eq!(host.driver().save_fields().unwrap()["Marker"], "web");
    }

    #[test]
    fn test_create_rejects_existing_and_invalid_names() {
        let temp_dir = TempDir::new().unwrap();
        let recorder = Recorder::default();
        let store = store(&temp_dir, &recorder);
        fs::create_dir_all(store.host_path("dev")).unwrap();

        let err = store
            .create("dev", MockDriver::NAME, HostOptions::default(), &DriverOptions::new())
            .unwrap_err();
        assert!(matches!(err, HostError::AlreadyExists(_)));

        let err = store
            .create("dev/..", MockDriver::NAME, HostOptions::default(), &DriverOptions::new())
            .unwrap_err();
        assert!(matches!(err, HostError::InvalidHostname(_)));
    }

    #[test]
    fn test_create_cleans_up_on_bad_flags() {
        let temp_dir = TempDir::new().unwrap();
        let recorder = Recorder::default();
        let store = store(&temp_dir, &recorder);

        let err = store
            .create("edge", "none", HostOptions::default(), &DriverOptions::new())
            .unwrap_err();
        assert!(matches!(err, HostError::Driver(_)));
        assert!(!store.exists("edge"));
    }

    #[tokio::test]
    async fn test_failed_driver_create_leaves_a_removable_host() {
        let temp_dir = TempDir::new().unwrap();
        let recorder = Recorder::default();
        recorder.fail_create(true);
        let store = store(&temp_dir, &recorder);

        let mut host = store
            .create("box", MockDriver::NAME, HostOptions::default(), &DriverOptions::new())
            .unwrap();
        assert!(host.create().await.is_err());

        let mut host = store.load("box").unwrap();
        assert_eq!(store.list().unwrap(), vec!["box"]);
        host.remove(false).await.unwrap();

        assert!(!store.exists("box"));
        assert!(
            store
                .create("box", MockDriver::NAME, HostOptions::default(), &DriverOptions::new())
                .is_ok()
        );
    }

    #[test]
    fn test_purge_only_deletes_directories_without_a_record() {
        let temp_dir = TempDir::new().unwrap();
        let recorder = Recorder::default();
        let store = store(&temp_dir, &recorder);

        fs::create_dir_all(store.host_path("orphan")).unwrap();
        assert!(matches!(store.load("orphan"), Err(HostError::LoadFailed(_))));
        store.purge("orphan").unwrap();
        assert!(!store.exists("orphan"));

        store
            .create("kept", MockDriver::NAME, HostOptions::default(), &DriverOptions::new())
            .unwrap();
        let err = store.purge("kept").unwrap_err();
        assert!(matches!(err, HostError::RemoveFailed(_)));
        assert!(store.host_path("kept").join(CONFIG_FILE).exists());

        assert!(matches!(store.purge("ghost"), Err(HostError::NotFound(_))));
    }

    #[test]
    fn test_load_missing_host() {
        let temp_dir = TempDir::new().unwrap();
        let recorder = Recorder::default();
        let err = store(&temp_dir, &recorder).load("ghost").unwrap_err();
        assert!(matches!(err, HostError::NotFound(_)));
    }
}
