//! Run status persistence.
//!
//! Each run carries exactly one durable piece of pipeline state: a single
//! status token in a small file inside the run directory. The token is the
//! gate every stage consults before deciding to skip, run, or refuse, and it
//! is replaced atomically so a crash can never leave a half-written value
//! that looks like a completed stage.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Lifecycle status of a run.
///
/// The happy path moves `Checked -> Converted -> Reported -> Compiled`,
/// with `Running` written transiently before each external invocation.
/// `Error` can occur from any active stage. `Emailed` and `Completed` are
/// written by the downstream delivery step and permanently block re-entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Run directory seen for the first time, nothing executed yet.
    Checked,
    /// An external tool invocation is in flight.
    Running,
    /// Conversion output produced.
    Converted,
    /// A tool exited non-zero; cleared only by a retry.
    Error,
    /// Quality-check reports produced for every lane.
    Reported,
    /// PDF reports compiled.
    Compiled,
    /// Report delivered by the external mail step.
    Emailed,
    /// Whole pipeline finished and acknowledged.
    Completed,
}

impl RunStatus {
    /// Statuses that refuse any new pipeline entry on this run.
    ///
    /// `Error` is deliberately absent: re-invoking the pipeline is the retry
    /// mechanism for an errored run.
    pub fn blocks_entry(&self) -> bool {
        matches!(
            self,
            RunStatus::Emailed | RunStatus::Running | RunStatus::Completed
        )
    }

    fn token(&self) -> &'static str {
        match self {
            RunStatus::Checked => "checked",
            RunStatus::Running => "running",
            RunStatus::Converted => "converted",
            RunStatus::Error => "error",
            RunStatus::Reported => "reported",
            RunStatus::Compiled => "compiled",
            RunStatus::Emailed => "emailed",
            RunStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for RunStatus {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "checked" => Ok(RunStatus::Checked),
            "running" => Ok(RunStatus::Running),
            "converted" => Ok(RunStatus::Converted),
            "error" => Ok(RunStatus::Error),
            "reported" => Ok(RunStatus::Reported),
            "compiled" => Ok(RunStatus::Compiled),
            "emailed" => Ok(RunStatus::Emailed),
            "completed" => Ok(RunStatus::Completed),
            other => Err(StatusError::UnknownToken {
                token: other.to_string(),
            }),
        }
    }
}

/// Errors that can occur while reading or writing the status token.
#[derive(Debug, Error)]
pub enum StatusError {
    /// Failed to read the status file from disk.
    #[error("Failed to read status file at {}: {source}", .path.display())]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to replace the status file on disk.
    #[error("Failed to write status file at {}: {source}", .path.display())]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to remove the status file.
    #[error("Failed to remove status file at {}: {source}", .path.display())]
    FileRemove {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The status file holds a token outside the known vocabulary.
    #[error("Unrecognized status token '{token}'")]
    UnknownToken { token: String },
}

/// Reads and replaces the single status token of one run.
///
/// The store never caches: every read goes back to disk, because the token
/// may have been changed by an operator between stages.
#[derive(Debug, Clone)]
pub struct StatusStore {
    path: PathBuf,
}

impl StatusStore {
    /// Status store backed by `<run dir>/<file name>`.
    pub fn new(run_dir: &Path, file_name: &str) -> Self {
        Self {
            path: run_dir.join(file_name),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current token.
    ///
    /// Returns `None` when the file does not exist, meaning the run has never
    /// been touched. An unreadable file or an unknown token is an error: the
    /// caller must fail loudly rather than proceed as if unattempted.
    pub fn read(&self) -> Result<Option<RunStatus>, StatusError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StatusError::FileRead {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        raw.trim().parse().map(Some)
    }

    /// Atomically replace the token.
    ///
    /// The new value is written to a temporary file in the same directory and
    /// renamed over the old one, so concurrent readers observe either the
    /// previous token or the new one, never a partial write.
    pub fn write(&self, status: RunStatus) -> Result<(), StatusError> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let write = || -> std::io::Result<()> {
            let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
            writeln!(tmp, "{status}")?;
            tmp.persist(&self.path).map_err(|e| e.error)?;
            Ok(())
        };
        write().map_err(|source| StatusError::FileWrite {
            path: self.path.clone(),
            source,
        })
    }

    /// Remove the token entirely.
    ///
    /// Only called after the whole pipeline has succeeded; a missing file at
    /// that point is still an error because it means someone else touched the
    /// run while we were processing it.
    pub fn clear(&self) -> Result<(), StatusError> {
        std::fs::remove_file(&self.path).map_err(|source| StatusError::FileRemove {
            path: self.path.clone(),
            source,
        })
    }
}
