//! Error types for pipeline and stage execution.

use crate::exec::ExecError;
use crate::group::GroupError;
use crate::lock::LockError;
use crate::status::{RunStatus, StatusError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised before any stage runs.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The run directory does not exist.
    #[error("Path of the run not found: {}", .path.display())]
    RunPathMissing { path: PathBuf },

    /// The run's status refuses any new pipeline entry.
    #[error("Run folder already processed, status is '{status}'. Execution aborted.")]
    AlreadyProcessed { status: RunStatus },

    /// Another invocation holds the run lock.
    #[error(transparent)]
    Lock(#[from] LockError),

    /// The status store failed.
    #[error(transparent)]
    Status(#[from] StatusError),
}

/// Errors raised by one stage.
///
/// Tool failures have already written the `error` status when they surface;
/// data failures (`ConversionOutputMissing`, `NoReadFiles`, `NoQcReports`,
/// `MissingQcResults`) deliberately leave the status untouched so a retry
/// re-attempts the stage cleanly.
#[derive(Debug, Error)]
pub enum StageError {
    /// The external tool exited non-zero or could not be run.
    #[error("{stage} failed: {source}")]
    Tool {
        stage: &'static str,
        source: ExecError,
    },

    /// The conversion output directory is not on disk.
    #[error("Conversion output missing at {}", .path.display())]
    ConversionOutputMissing { path: PathBuf },

    /// No read file matched any (lane, read) pair.
    #[error("No read files found under {}, conversion output not ready", .path.display())]
    NoReadFiles { path: PathBuf },

    /// The quality-check stage left no HTML report to typeset.
    #[error("No quality-check reports found under {}", .path.display())]
    NoQcReports { path: PathBuf },

    /// An HTML report has no matching extracted-results directory.
    #[error("Extracted quality-check results missing at {}", .path.display())]
    MissingQcResults { path: PathBuf },

    /// No report template available (configured file unreadable and the
    /// embedded default absent).
    #[error("Report template not available: {reason}")]
    Template { reason: String },

    /// Filesystem work around the stage failed.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The status store failed; fatal for the stage.
    #[error(transparent)]
    Status(#[from] StatusError),

    /// File grouping failed.
    #[error(transparent)]
    Group(#[from] GroupError),
}
