//! Configuration data models.

use serde::Deserialize;
use std::path::PathBuf;

/// Locations of the three external tools the pipeline drives.
///
/// Each entry is either an absolute path or a bare program name; bare names
/// are resolved on PATH by [`super::loader::resolve_tools`] before the
/// pipeline starts.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ToolPaths {
    /// Conversion tool turning raw instrument output into FASTQ files.
    pub bcl2fastq: PathBuf,
    /// Per-file quality-check tool.
    pub fastqc: PathBuf,
    /// LaTeX compiler producing the final PDF.
    pub pdflatex: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            bcl2fastq: PathBuf::from("bcl2fastq"),
            fastqc: PathBuf::from("fastqc"),
            pdflatex: PathBuf::from("pdflatex"),
        }
    }
}

/// Everything the pipeline stages need to know about their environment.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PipelineConfig {
    /// External tool locations.
    pub tools: ToolPaths,

    /// Name of the per-run status token file.
    pub status_file: String,

    /// Name of the run-metadata sidecar inside the run directory.
    pub samplesheet: String,

    /// Directory (relative to the run directory) the typeset stage writes
    /// per-report subdirectories into. Recreated from scratch on each run.
    pub reports_dir: String,

    /// LaTeX template to render; the embedded default is used when unset.
    pub template_file: Option<PathBuf>,

    /// Directory for per-invocation log files; the run directory when unset.
    pub log_dir: Option<PathBuf>,

    /// Thread count passed to the quality-check tool.
    pub fastqc_threads: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tools: ToolPaths::default(),
            status_file: "run_report".to_string(),
            samplesheet: "SampleSheet.csv".to_string(),
            reports_dir: "FastQC_reports".to_string(),
            template_file: None,
            log_dir: None,
            fastqc_threads: 8,
        }
    }
}
