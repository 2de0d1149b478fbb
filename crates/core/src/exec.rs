//! External tool invocation.
//!
//! Every stage drives its tool through the [`ToolRunner`] trait so tests can
//! substitute a scripted runner and count invocations. The real
//! [`ProcessRunner`] spawns the tool, appends its combined output to the
//! per-invocation log file, and waits for it to exit; there is no timeout and
//! no cancellation, the process runs to completion.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

/// One external tool invocation: resolved program path plus arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

/// Errors that can occur while running an external tool.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The log file could not be opened for appending.
    #[error("Failed to open log file {}: {source}", .path.display())]
    LogOpen {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The program could not be spawned at all.
    #[error("Failed to spawn {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },

    /// Waiting on the spawned program failed.
    #[error("Failed waiting for {}: {source}", .program.display())]
    Wait {
        program: PathBuf,
        source: std::io::Error,
    },

    /// The program ran and exited non-zero (or was killed by a signal).
    #[error("{} exited with status {code:?}, see the run log", .program.display())]
    NonZeroExit {
        program: PathBuf,
        code: Option<i32>,
    },
}

/// Seam between the stage machine and the operating system.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run `invocation` to completion, appending combined stdout and stderr
    /// to `log_file`. `Ok` means exit status zero.
    async fn run(&self, invocation: &Invocation, log_file: &Path) -> Result<(), ExecError>;
}

/// [`ToolRunner`] that actually spawns processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, invocation: &Invocation, log_file: &Path) -> Result<(), ExecError> {
        let open = |path: &Path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| ExecError::LogOpen {
                    path: path.to_path_buf(),
                    source,
                })
        };
        let stdout = open(log_file)?;
        let stderr = open(log_file)?;

        tracing::info!(program = %invocation.program.display(), args = ?invocation.args, "invoking tool");

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .spawn()
            .map_err(|source| ExecError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        let status = child.wait().await.map_err(|source| ExecError::Wait {
            program: invocation.program.clone(),
            source,
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(ExecError::NonZeroExit {
                program: invocation.program.clone(),
                code: status.code(),
            })
        }
    }
}

/// Path of the log file for one pipeline invocation.
///
/// All stages of the invocation append to the same file; the timestamped name
/// keeps logs of earlier attempts around for diagnosis.
pub fn log_file_path(dir: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    dir.join(format!("logfile-{stamp}.log"))
}
