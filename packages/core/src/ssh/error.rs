//! Remote shell error types

use thiserror::Error;

/// Errors that can occur while talking to a node over SSH
#[derive(Error, Debug)]
pub enum ShellError {
    /// Failed to spawn the SSH process
    #[error("Failed to spawn SSH: {0}")]
    Spawn(String),

    /// The user's SSH config could not be read or parsed
    #[error("Failed to read SSH config: {0}")]
    Config(String),

    /// The SSH port did not accept a TCP connection
    #[error("{addr} is not reachable: {reason}")]
    Unreachable { addr: String, reason: String },

    /// The remote command exited unsuccessfully
    #[error("Remote command '{command}' failed (exit {}): {stderr}", .status.map(|s| s.to_string()).unwrap_or_else(|| "signal".to_string()))]
    CommandFailed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_error_displays_correctly() {
        let err = ShellError::CommandFailed {
            command: "exit 0".to_string(),
            status: Some(255),
            stderr: "Connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Remote command 'exit 0' failed (exit 255): Connection refused"
        );

        let err = ShellError::CommandFailed {
            command: "true".to_string(),
            status: None,
            stderr: String::new(),
        };
        assert!(err.to_string().contains("exit signal"));

        let err = ShellError::Config("bad port".to_string());
        assert_eq!(err.to_string(), "Failed to read SSH config: bad port");
    }
}
