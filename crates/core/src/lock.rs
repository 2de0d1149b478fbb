//! Run-scoped exclusive lock.
//!
//! The `running` status token is only an advisory marker: it is written after
//! the decision to run a stage and says nothing about whether the writer is
//! still alive. Two pipeline invocations pointed at the same run directory
//! would otherwise race each other into duplicate external-tool invocations,
//! so the engine holds this lock for the whole pipeline duration.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

const LOCK_FILE: &str = ".runqc.lock";

/// Errors that can occur while acquiring the run lock.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another invocation already holds the lock on this run directory.
    #[error("Run directory {} is locked by another invocation (remove {} if it is stale)", .path.display(), LOCK_FILE)]
    AlreadyLocked { path: PathBuf },

    /// The lock file could not be created.
    #[error("Failed to create lock file in {}: {source}", .path.display())]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Exclusive advisory lock on one run directory.
///
/// Acquisition creates `.runqc.lock` with `create_new`, so exactly one
/// invocation can hold it. The file records the owning PID for operators
/// cleaning up after a killed process. Dropping the guard removes the file.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Acquire the lock for `run_dir`, failing fast if it is already held.
    pub fn acquire(run_dir: &Path) -> Result<Self, LockError> {
        let path = run_dir.join(LOCK_FILE);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(LockError::AlreadyLocked {
                    path: run_dir.to_path_buf(),
                })
            }
            Err(source) => {
                return Err(LockError::Create {
                    path: run_dir.to_path_buf(),
                    source,
                })
            }
        };
        // PID is informational only; acquisition already happened via create_new.
        let _ = writeln!(file, "{}", std::process::id());
        Ok(Self { path })
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove run lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_while_held() {
        let dir = tempfile::tempdir().unwrap();
        let lock = RunLock::acquire(dir.path()).unwrap();
        assert!(matches!(
            RunLock::acquire(dir.path()),
            Err(LockError::AlreadyLocked { .. })
        ));
        drop(lock);
        // Released on drop, so a fresh acquire succeeds.
        let _lock = RunLock::acquire(dir.path()).unwrap();
    }

    #[test]
    fn lock_file_records_the_owner_pid() {
        let dir = tempfile::tempdir().unwrap();
        let _lock = RunLock::acquire(dir.path()).unwrap();
        let raw = std::fs::read_to_string(dir.path().join(LOCK_FILE)).unwrap();
        assert_eq!(raw.trim(), std::process::id().to_string());
    }

    #[test]
    fn missing_directory_surfaces_create_error() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("nope");
        assert!(matches!(
            RunLock::acquire(&gone),
            Err(LockError::Create { .. })
        ));
    }
}
