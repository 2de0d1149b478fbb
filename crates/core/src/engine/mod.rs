//! Pipeline execution engine.
//!
//! The engine advances one run through the three stages in order, convert,
//! quality-check, typeset, consulting the status store before each stage and
//! aborting on the first failure. Re-running the engine on the same run is
//! safe: finished stages skip on their status token or on the artifacts
//! already on disk, so a crashed or errored attempt resumes where it left
//! off.

mod convert;
mod error;
mod qc;
mod typeset;

pub use error::{PipelineError, StageError};

use crate::config::PipelineConfig;
use crate::exec::{self, ProcessRunner, ToolRunner};
use crate::lock::RunLock;
use crate::run::Run;
use crate::status::{RunStatus, StatusStore};
use anyhow::{Context, Result};
use std::sync::Arc;

/// Drives the stage state machine for one run at a time.
pub struct PipelineEngine {
    config: PipelineConfig,
    runner: Arc<dyn ToolRunner>,
}

impl PipelineEngine {
    /// Engine invoking the real external tools.
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_runner(config, Arc::new(ProcessRunner))
    }

    /// Engine with a custom tool runner; tests inject a scripted one.
    pub fn with_runner(config: PipelineConfig, runner: Arc<dyn ToolRunner>) -> Self {
        Self { config, runner }
    }

    /// Advance `run` through the whole pipeline.
    ///
    /// Holds the run lock for the duration. On full success the status token
    /// is removed; on a tool failure the token reads `error` and the
    /// returned error names the stage.
    ///
    /// # Errors
    ///
    /// Fails fast when the run directory is missing, the run is locked by
    /// another invocation, or its status refuses entry; otherwise propagates
    /// the first stage failure.
    pub async fn run(&self, run: &Run) -> Result<()> {
        if !run.root().is_dir() {
            return Err(PipelineError::RunPathMissing {
                path: run.root().to_path_buf(),
            }
            .into());
        }

        let _lock = RunLock::acquire(run.root()).map_err(PipelineError::Lock)?;
        let store = StatusStore::new(run.root(), &self.config.status_file);
        self.check_run(&store)?;

        let log_dir = self.config.log_dir.as_deref().unwrap_or(run.root());
        let log_file = exec::log_file_path(log_dir);
        tracing::info!(run = run.name(), log = %log_file.display(), "starting pipeline");

        convert::run_bcl2fastq(&self.config, run, &store, self.runner.as_ref(), &log_file)
            .await
            .context("Error on bcl2fastq. Execution aborted.")?;

        qc::run_fastqc(&self.config, run, &store, self.runner.as_ref(), &log_file)
            .await
            .context("Error on fastqc. Execution aborted.")?;

        typeset::compile_reports(&self.config, run, &store, self.runner.as_ref(), &log_file)
            .await
            .context("Error on compile tex. Execution aborted.")?;

        store
            .clear()
            .context("Pipeline finished but the status token could not be removed")?;
        tracing::info!(run = run.name(), "pipeline finished");
        Ok(())
    }

    /// Whole-pipeline entry check.
    ///
    /// Refuses runs whose status blocks entry (`emailed`, a stale `running`
    /// marker, `completed`); `error` passes so a re-invocation acts as the
    /// retry. A never-seen run is marked `checked`.
    fn check_run(&self, store: &StatusStore) -> Result<(), PipelineError> {
        match store.read()? {
            Some(status) if status.blocks_entry() => {
                Err(PipelineError::AlreadyProcessed { status })
            }
            Some(status) => {
                tracing::debug!(%status, "resuming run");
                Ok(())
            }
            None => {
                store.write(RunStatus::Checked)?;
                Ok(())
            }
        }
    }
}
