//! SSH config lookup
//!
//! Reads ~/.ssh/config so drivers can default user, port and key for a
//! hostname the same way the `ssh` client would.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use ssh2_config::{ParseRule, SshConfig};

use super::error::ShellError;

/// Settings found in user's SSH config for a host
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SshConfigMatch {
    /// HostName the alias resolves to
    pub hostname: Option<String>,
    /// User from SSH config
    pub user: Option<String>,
    /// Port from SSH config
    pub port: Option<u16>,
    /// First identity file from SSH config
    pub identity_file: Option<PathBuf>,
}

impl SshConfigMatch {
    /// Check if any useful settings were found
    pub fn has_settings(&self) -> bool {
        self.hostname.is_some()
            || self.user.is_some()
            || self.port.is_some()
            || self.identity_file.is_some()
    }
}

/// Get the path to the user's SSH config file
pub fn get_ssh_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".ssh").join("config"))
}

/// Query the user's SSH config for a hostname
///
/// A missing config file is not an error; it simply matches nothing.
pub fn query_ssh_config(hostname: &str) -> Result<SshConfigMatch, ShellError> {
    let config_path = match get_ssh_config_path() {
        Some(path) if path.exists() => path,
        _ => {
            tracing::debug!("No SSH config file found");
            return Ok(SshConfigMatch::default());
        }
    };

    let file = File::open(&config_path).map_err(|e| {
        ShellError::Config(format!("cannot open {}: {}", config_path.display(), e))
    })?;

    parse_ssh_config(&mut BufReader::new(file), hostname)
}

/// Parse SSH config from a reader and query it for a hostname
pub fn parse_ssh_config(
    reader: &mut impl BufRead,
    hostname: &str,
) -> Result<SshConfigMatch, ShellError> {
    // Be lenient with SSH config options we don't support
    let config = SshConfig::default()
        .parse(reader, ParseRule::ALLOW_UNKNOWN_FIELDS)
        .map_err(|e| ShellError::Config(e.to_string()))?;

    let params = config.query(hostname);

    Ok(SshConfigMatch {
        hostname: params.host_name,
        user: params.user,
        port: params.port,
        identity_file: params
            .identity_file
            .and_then(|files| files.into_iter().next()),
    })
}
