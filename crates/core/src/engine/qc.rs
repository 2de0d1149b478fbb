//! Quality-check stage: one tool invocation per lane over the aliased
//! file set.

use crate::config::PipelineConfig;
use crate::engine::error::StageError;
use crate::exec::{Invocation, ToolRunner};
use crate::group;
use crate::run::Run;
use crate::status::{RunStatus, StatusStore};
use std::path::Path;

/// Run the quality-check tool for every lane of `run`.
///
/// Preconditions, in order: the conversion output directory must exist (a
/// gap here is a data failure, the status stays untouched for a clean
/// retry); an HTML report already sitting in the directory means the stage
/// is done; and grouping must find at least one read file.
///
/// Lanes run sequentially. Each lane's aliases are unlinked as soon as its
/// invocation succeeds; a tool failure marks the run `error` and aborts.
pub(crate) async fn run_fastqc(
    config: &PipelineConfig,
    run: &Run,
    store: &StatusStore,
    runner: &dyn ToolRunner,
    log_file: &Path,
) -> Result<(), StageError> {
    if store.read()? == Some(RunStatus::Reported) {
        tracing::debug!(run = run.name(), "quality check already recorded, skipping");
        return Ok(());
    }

    let fastq_dir = run.fastq_dir();
    if !fastq_dir.is_dir() {
        return Err(StageError::ConversionOutputMissing { path: fastq_dir });
    }

    if has_direct_html(&fastq_dir)? {
        tracing::info!(path = %fastq_dir.display(), "quality-check reports present, skipping");
        return Ok(());
    }

    let grouping = group::materialize(&fastq_dir, run.sequencer())?;
    if grouping.is_empty() {
        return Err(StageError::NoReadFiles { path: fastq_dir });
    }
    tracing::info!(
        run = run.name(),
        lanes = grouping.lanes.len(),
        created = grouping.created.len(),
        "read files grouped"
    );

    for (label, aliases) in &grouping.lanes {
        let invocation = Invocation::new(&config.tools.fastqc)
            .arg("--extract")
            .arg("--casava")
            .arg("-t")
            .arg(config.fastqc_threads.to_string())
            .args(
                aliases
                    .iter()
                    .map(|alias| fastq_dir.join(alias).to_string_lossy().into_owned()),
            );

        tracing::info!(lane = label.as_str(), files = aliases.len(), "running quality check");
        store.write(RunStatus::Running)?;
        match runner.run(&invocation, log_file).await {
            Ok(()) => group::cleanup(&fastq_dir, aliases),
            Err(source) => {
                store.write(RunStatus::Error)?;
                return Err(StageError::Tool {
                    stage: "fastqc",
                    source,
                });
            }
        }
    }

    store.write(RunStatus::Reported)?;
    tracing::info!(run = run.name(), "quality check finished");
    Ok(())
}

/// Whether the directory itself (not subdirectories) holds an HTML report.
fn has_direct_html(dir: &Path) -> Result<bool, StageError> {
    let entries = std::fs::read_dir(dir).map_err(|source| StageError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| StageError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.file_name().to_string_lossy().ends_with(".html") {
            return Ok(true);
        }
    }
    Ok(false)
}
