//! XDG-compliant path resolution for nodewright
//!
//! Provides consistent path resolution across platforms:
//! - Linux/macOS: ~/.config/nodewright/ and ~/.local/share/nodewright/
//! - Windows: %APPDATA%\nodewright\ and %LOCALAPPDATA%\nodewright\

use std::path::PathBuf;

/// Environment variable overriding the machine store directory
pub const STORAGE_PATH_ENV: &str = "NODEWRIGHT_STORAGE_PATH";

const APP_DIR: &str = "nodewright";

/// Get the configuration directory path
///
/// Returns the directory where the settings file is stored:
/// - Linux: `~/.config/nodewright/`
/// - macOS: `~/.config/nodewright/` (XDG-style, not ~/Library)
/// - Windows: `%APPDATA%\nodewright\`
pub fn get_config_dir() -> Option<PathBuf> {
    #[cfg(any(target_os = "linux", target_os = "macos"))]
    {
        directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(".config").join(APP_DIR))
    }
    #[cfg(target_os = "windows")]
    {
        directories::BaseDirs::new()
            .and_then(|dirs| dirs.config_dir().map(|d| d.to_path_buf()))
            .map(|d| d.join(APP_DIR))
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        None
    }
}

/// Get the data directory path
///
/// Returns the directory holding host stores, certificates and locks:
/// - Linux: `~/.local/share/nodewright/`
/// - macOS: `~/.local/share/nodewright/` (XDG-style, not ~/Library)
/// - Windows: `%LOCALAPPDATA%\nodewright\`
pub fn get_data_dir() -> Option<PathBuf> {
    #[cfg(any(target_os = "linux", target_os = "macos"))]
    {
        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".local").join("share").join(APP_DIR))
    }
    #[cfg(target_os = "windows")]
    {
        directories::BaseDirs::new()
            .and_then(|dirs| dirs.data_local_dir().map(|d| d.to_path_buf()))
            .map(|d| d.join(APP_DIR))
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        None
    }
}

/// Get the full path to the settings file
///
/// Returns: `{config_dir}/config.json`
pub fn get_settings_path() -> Option<PathBuf> {
    get_config_dir().map(|d| d.join("config.json"))
}

/// Get the default directory holding one store directory per host
///
/// Returns: `$NODEWRIGHT_STORAGE_PATH` if set, else `{data_dir}/machines`
pub fn get_machine_dir() -> Option<PathBuf> {
    match std::env::var_os(STORAGE_PATH_ENV) {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => get_data_dir().map(|d| d.join("machines")),
    }
}

/// Get the directory holding the shared TLS material
///
/// Returns: `{data_dir}/certs`
pub fn get_certs_dir() -> Option<PathBuf> {
    get_data_dir().map(|d| d.join("certs"))
}

/// Get the directory holding per-host PID locks
///
/// Returns: `{data_dir}/locks`
pub fn get_lock_dir() -> Option<PathBuf> {
    get_data_dir().map(|d| d.join("locks"))
}

/// Get the full path to a host's PID lock file
///
/// Returns: `{data_dir}/locks/{name}.pid`
pub fn get_lock_path(name: &str) -> Option<PathBuf> {
    get_lock_dir().map(|d| d.join(format!("{name}.pid")))
}
