//! Per-host PID lock
//!
//! Lifecycle operations assume a single writer per host. Mutating commands
//! hold a PID file for the host while they run; a lock left behind by a
//! crashed process is detected and removed.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur while taking a host lock
#[derive(Error, Debug)]
pub enum LockError {
    /// Another process holds the lock
    #[error("Host \"{name}\" is busy: another nodewright process (PID {pid}) is operating on it")]
    Busy { name: String, pid: u32 },

    /// Failed to create the lock directory
    #[error("Failed to create lock directory: {0}")]
    CreateDirFailed(String),

    /// Failed to create, read or remove the lock file
    #[error("Failed to manage lock file: {0}")]
    LockFailed(String),
}

/// Guard holding a host's lock; the PID file is removed on drop
#[derive(Debug)]
pub struct HostLock {
    name: String,
    pid_path: PathBuf,
}

impl HostLock {
    /// Take the lock for host `name` at `pid_path`
    ///
    /// The PID file is created exclusively, so of two processes racing for
    /// the same host only one succeeds. Fails with [`LockError::Busy`] while
    /// a live process, this one included, holds it.
    pub fn acquire(name: &str, pid_path: PathBuf) -> Result<Self, LockError> {
        if let Some(parent) = pid_path.parent() {
            fs::create_dir_all(parent).map_err(|e| LockError::CreateDirFailed(e.to_string()))?;
        }

        match create_pid_file(&pid_path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                clear_stale(name, &pid_path)?;
                // A second loss means someone else took the lock in between
                create_pid_file(&pid_path).map_err(|e| {
                    if e.kind() == ErrorKind::AlreadyExists {
                        LockError::LockFailed(format!(
                            "lock for {name} was taken by another process"
                        ))
                    } else {
                        LockError::LockFailed(e.to_string())
                    }
                })?;
            }
            Err(e) => return Err(LockError::LockFailed(e.to_string())),
        }

        tracing::debug!("Locked {} at {}", name, pid_path.display());
        Ok(Self {
            name: name.to_string(),
            pid_path,
        })
    }

    pub fn pid_path(&self) -> &Path {
        &self.pid_path
    }
}

fn create_pid_file(pid_path: &Path) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(pid_path)?;
    let written = write!(file, "{}", std::process::id()).and_then(|()| file.sync_all());
    if written.is_err() {
        let _ = fs::remove_file(pid_path);
    }
    written
}

/// Remove an existing PID file unless its owner is still alive
fn clear_stale(name: &str, pid_path: &Path) -> Result<(), LockError> {
    match read_pid(pid_path)? {
        PidFile::Gone => return Ok(()),
        PidFile::Empty => {
            return Err(LockError::LockFailed(format!(
                "lock for {name} is being taken by another process"
            )));
        }
        PidFile::Pid(pid) if is_process_running(pid) => {
            return Err(LockError::Busy {
                name: name.to_string(),
                pid,
            });
        }
        PidFile::Pid(pid) => {
            tracing::info!("Removing stale lock for {} (PID {} not running)", name, pid);
        }
        PidFile::Garbage => {
            tracing::info!("Removing unreadable lock for {}", name);
        }
    }

    match fs::remove_file(pid_path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(LockError::LockFailed(e.to_string())),
    }
}

impl Drop for HostLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.pid_path) {
            tracing::warn!("Failed to remove lock for {}: {}", self.name, e);
        } else {
            tracing::debug!("Unlocked {}", self.name);
        }
    }
}

/// Contents of an existing PID file
enum PidFile {
    Gone,
    Empty,
    Garbage,
    Pid(u32),
}

fn read_pid(pid_path: &Path) -> Result<PidFile, LockError> {
    let mut file = match File::open(pid_path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(PidFile::Gone),
        Err(e) => return Err(LockError::LockFailed(e.to_string())),
    };
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| LockError::LockFailed(e.to_string()))?;

    let contents = contents.trim();
    if contents.is_empty() {
        return Ok(PidFile::Empty);
    }
    Ok(contents
        .parse::<u32>()
        .map(PidFile::Pid)
        .unwrap_or(PidFile::Garbage))
}

/// Check if a process with the given PID is currently running
///
/// Unix: `kill -0`, falling back to /proc on Linux.
fn is_process_running(pid: u32) -> bool {
    #[cfg(unix)]
    {
        match std::process::Command::new("kill")
            .args(["-0", &pid.to_string()])
            .output()
        {
            Ok(output) => output.status.success(),
            Err(_) => {
                #[cfg(target_os = "linux")]
                {
                    Path::new(&format!("/proc/{pid}")).exists()
                }
                #[cfg(not(target_os = "linux"))]
                {
                    false
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = pid;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_acquire_writes_and_drop_removes_pid_file() {
        let temp_dir = TempDir::new().unwrap();
        let pid_path = temp_dir.path().join("locks").join("dev.pid");

        let lock = HostLock::acquire("dev", pid_path.clone()).unwrap();
        let written: u32 = fs::read_to_string(&pid_path)
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        assert_eq!(written, std::process::id());
        assert_eq!(lock.pid_path(), pid_path.as_path());

        drop(lock);
        assert!(!pid_path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_live_holder_makes_host_busy() {
        let temp_dir = TempDir::new().unwrap();
        let pid_path = temp_dir.path().join("dev.pid");

        let mut holder = std::process::Command::new("sleep").arg("30").spawn().unwrap();
        fs::write(&pid_path, holder.id().to_string()).unwrap();

        let result = HostLock::acquire("dev", pid_path.clone());
        holder.kill().unwrap();
        holder.wait().unwrap();

        assert!(matches!(result, Err(LockError::Busy { pid, .. }) if pid == holder.id()));
        assert!(pid_path.exists());
    }

    #[test]
    fn test_stale_lock_is_replaced() {
        let temp_dir = TempDir::new().unwrap();
        let pid_path = temp_dir.path().join("dev.pid");
        fs::write(&pid_path, "4000000000").unwrap();

        let _lock = HostLock::acquire("dev", pid_path.clone()).unwrap();
        let contents = fs::read_to_string(&pid_path).unwrap();
        assert_eq!(contents.trim(), std::process::id().to_string());
    }

    #[test]
    fn test_garbage_lock_is_replaced() {
        let temp_dir = TempDir::new().unwrap();
        let pid_path = temp_dir.path().join("dev.pid");
        fs::write(&pid_path, "not a pid").unwrap();

        assert!(HostLock::acquire("dev", pid_path).is_ok());
    }

    #[test]
    fn test_second_acquire_is_busy_while_first_is_held() {
        let temp_dir = TempDir::new().unwrap();
        let pid_path = temp_dir.path().join("dev.pid");

        let first = HostLock::acquire("dev", pid_path.clone()).unwrap();
        let second = HostLock::acquire("dev", pid_path.clone());
        assert!(
            matches!(second, Err(LockError::Busy { ref name, pid }) if name == "dev" && pid == std::process::id())
        );
        // The losing attempt must not touch the holder's file
        assert!(pid_path.exists());

        drop(first);
        assert!(HostLock::acquire("dev", pid_path).is_ok());
    }

    #[test]
    fn test_empty_lock_file_is_not_stolen() {
        let temp_dir = TempDir::new().unwrap();
        let pid_path = temp_dir.path().join("dev.pid");
        fs::write(&pid_path, "").unwrap();

        let err = HostLock::acquire("dev", pid_path.clone()).unwrap_err();
        assert!(matches!(err, LockError::LockFailed(_)));
        assert!(pid_path.exists());
    }

    #[test]
    fn test_is_process_running_with_current_process() {
        assert!(is_process_running(std::process::id()));
    }
}
