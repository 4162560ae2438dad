//! Settings management for nodewright
//!
//! Handles loading, saving, and validating the JSONC settings file.
//! Creates default settings if missing, rejects unknown fields.

pub mod paths;
pub mod schema;

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use jsonc_parser::parse_to_serde_value;

pub use paths::{
    STORAGE_PATH_ENV, get_certs_dir, get_config_dir, get_data_dir, get_lock_dir, get_lock_path,
    get_machine_dir, get_settings_path,
};
pub use schema::{PollSettings, Settings, SshSettings};

/// Ensure the config directory exists
///
/// Creates `~/.config/nodewright/` if it doesn't exist.
/// Returns the path to the config directory.
pub fn ensure_config_dir() -> Result<PathBuf> {
    let config_dir =
        get_config_dir().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;
        tracing::info!("Created config directory: {}", config_dir.display());
    }

    Ok(config_dir)
}

/// Load settings from the default settings file
///
/// If the file doesn't exist, creates a new one with default values.
pub fn load_settings() -> Result<Settings> {
    let settings_path = get_settings_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine settings file path"))?;
    load_settings_from(&settings_path)
}

/// Load settings from `settings_path`
///
/// Supports JSONC (JSON with comments) and rejects unknown fields.
pub fn load_settings_from(settings_path: &Path) -> Result<Settings> {
    if !settings_path.exists() {
        tracing::info!(
            "Settings file not found, creating default at: {}",
            settings_path.display()
        );
        let settings = Settings::default();
        save_settings_to(settings_path, &settings)?;
        return Ok(settings);
    }

    let mut file = File::open(settings_path)
        .with_context(|| format!("Failed to open settings file: {}", settings_path.display()))?;

    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .with_context(|| format!("Failed to read settings file: {}", settings_path.display()))?;

    let parsed_value = parse_to_serde_value(&contents, &Default::default())
        .map_err(|e| anyhow::anyhow!("Invalid JSONC in settings file: {}", e))?
        .ok_or_else(|| anyhow::anyhow!("Settings file is empty"))?;

    let settings: Settings = serde_json::from_value(parsed_value).with_context(|| {
        format!(
            "Invalid settings in {}. Check for unknown fields or invalid values.",
            settings_path.display()
        )
    })?;

    Ok(settings)
}

/// Save settings to the default settings file
pub fn save_settings(settings: &Settings) -> Result<()> {
    ensure_config_dir()?;
    let settings_path = get_settings_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine settings file path"))?;
    save_settings_to(&settings_path, settings)
}

/// Save settings to `settings_path`
///
/// Creates a backup of the existing file (config.json.bak) before overwriting.
pub fn save_settings_to(settings_path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = settings_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    if settings_path.exists() {
        let backup_path = settings_path.with_extension("json.bak");
        fs::copy(settings_path, &backup_path)
            .with_context(|| format!("Failed to create backup at: {}", backup_path.display()))?;
        tracing::debug!("Created settings backup: {}", backup_path.display());
    }

    let json = serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;

    let mut file = File::create(settings_path)
        .with_context(|| format!("Failed to create settings file: {}", settings_path.display()))?;

    file.write_all(json.as_bytes())
        .with_context(|| format!("Failed to write settings file: {}", settings_path.display()))?;

    tracing::debug!("Saved settings to: {}", settings_path.display());
    Ok(())
}

/// Directory holding host stores
///
/// `NODEWRIGHT_STORAGE_PATH` wins over `storage_path` in the settings,
/// which wins over the default under the data directory.
pub fn resolve_machine_dir(settings: &Settings) -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(STORAGE_PATH_ENV).filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    if let Some(dir) = &settings.storage_path {
        return Ok(dir.clone());
    }
    get_machine_dir().ok_or_else(|| anyhow::anyhow!("Could not determine machine directory"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_creates_default_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.json");

        let settings = load_settings_from(&path).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(path.exists());
    }

    #[test]
    fn test_load_accepts_comments() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
                // slower network
                "version": 1,
                "ssh_poll": { "interval_ms": 5000, "max_attempts": 120 }
            }"#,
        )
        .unwrap();

        let settings = load_settings_from(&path).unwrap();
        assert_eq!(settings.ssh_poll.max_attempts, 120);
    }

    #[test]
    fn test_load_rejects_unknown_fields() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, r#"{"version": 1, "colour": "blue"}"#).unwrap();

        let err = load_settings_from(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid settings"));
    }

    #[test]
    fn test_save_creates_backup() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");

        save_settings_to(&path, &Settings::default()).unwrap();
        let changed = Settings {
            default_driver: "none".to_string(),
            ..Default::default()
        };
        save_settings_to(&path, &changed).unwrap();

        let backup = load_settings_from(&path.with_extension("json.bak")).unwrap();
        assert_eq!(backup.default_driver, "generic");
        assert_eq!(load_settings_from(&path).unwrap(), changed);
    }

    #[test]
    fn test_settings_storage_path_is_used() {
        // Only meaningful when the override variable is not set
        if std::env::var_os(STORAGE_PATH_ENV).is_some() {
            return;
        }
        let settings = Settings {
            storage_path: Some(PathBuf::from("/srv/machines")),
            ..Default::default()
        };
        assert_eq!(
            resolve_machine_dir(&settings).unwrap(),
            PathBuf::from("/srv/machines")
        );
    }
}
