//! Conversion stage: raw instrument output to FASTQ.

use crate::config::PipelineConfig;
use crate::engine::error::StageError;
use crate::exec::{Invocation, ToolRunner};
use crate::run::Run;
use crate::status::{RunStatus, StatusStore};
use std::path::Path;

/// Run the conversion tool for `run`, unless it already happened.
///
/// Skips without invoking anything when the status says converted or when
/// the output directory is already on disk; the directory is the real source
/// of truth, the status token only a guard.
pub(crate) async fn run_bcl2fastq(
    config: &PipelineConfig,
    run: &Run,
    store: &StatusStore,
    runner: &dyn ToolRunner,
    log_file: &Path,
) -> Result<(), StageError> {
    if store.read()? == Some(RunStatus::Converted) {
        tracing::debug!(run = run.name(), "conversion already recorded, skipping");
        return Ok(());
    }

    let fastq_dir = run.fastq_dir();
    if fastq_dir.exists() {
        tracing::info!(path = %fastq_dir.display(), "conversion output present, skipping");
        return Ok(());
    }

    let invocation = Invocation::new(&config.tools.bcl2fastq)
        .arg("--runfolder-dir")
        .arg(run.root().to_string_lossy())
        .arg("--output-dir")
        .arg(fastq_dir.to_string_lossy());

    store.write(RunStatus::Running)?;
    match runner.run(&invocation, log_file).await {
        Ok(()) => {
            store.write(RunStatus::Converted)?;
            tracing::info!(run = run.name(), "conversion finished");
            Ok(())
        }
        Err(source) => {
            store.write(RunStatus::Error)?;
            Err(StageError::Tool {
                stage: "bcl2fastq",
                source,
            })
        }
    }
}
