//! Typeset stage: render the LaTeX template per quality-check report and
//! compile it to PDF.

use crate::config::PipelineConfig;
use crate::engine::error::StageError;
use crate::exec::{Invocation, ToolRunner};
use crate::report::template::{default_template, TemplateVars};
use crate::report::{html, samplesheet, tex};
use crate::run::Run;
use crate::status::{RunStatus, StatusStore};
use std::path::{Path, PathBuf};

/// Compile one PDF per quality-check report.
///
/// Every discovered HTML report must have its extracted-results directory on
/// disk before anything is compiled; a single gap fails the whole stage with
/// the status untouched, so there are never partial report sets. The reports
/// tree is recreated from scratch on each attempt.
pub(crate) async fn compile_reports(
    config: &PipelineConfig,
    run: &Run,
    store: &StatusStore,
    runner: &dyn ToolRunner,
    log_file: &Path,
) -> Result<(), StageError> {
    if store.read()? == Some(RunStatus::Compiled) {
        tracing::debug!(run = run.name(), "reports already compiled, skipping");
        return Ok(());
    }

    let fastq_dir = run.fastq_dir();
    let stems = report_stems(&fastq_dir)?;
    if stems.is_empty() {
        return Err(StageError::NoQcReports { path: fastq_dir });
    }

    // Reconcile first, compile second: all-or-nothing.
    let mut reports = Vec::new();
    for stem in stems {
        let extracted = fastq_dir.join(&stem);
        if !extracted.is_dir() {
            return Err(StageError::MissingQcResults { path: extracted });
        }
        reports.push(Report {
            images_dir: extracted.join("Images"),
            stem,
        });
    }

    let template = load_template(config)?;

    let reports_root = run.root().join(&config.reports_dir);
    if reports_root.exists() {
        std::fs::remove_dir_all(&reports_root).map_err(|source| StageError::Io {
            path: reports_root.clone(),
            source,
        })?;
    }
    std::fs::create_dir_all(&reports_root).map_err(|source| StageError::Io {
        path: reports_root.clone(),
        source,
    })?;

    let sheet = samplesheet::parse_samplesheet(&run.root().join(&config.samplesheet));
    let details = tex::run_details(&sheet);
    let sections = html::load_conversion_report(&fastq_dir);
    let tables = tex::section_tables(&sections);

    for report in reports {
        let report_dir = reports_root.join(&report.stem);
        std::fs::create_dir_all(&report_dir).map_err(|source| StageError::Io {
            path: report_dir.clone(),
            source,
        })?;

        let lane_read = lane_read_tokens(&report.stem);
        let mut vars = TemplateVars::new();
        vars.set("PATH", report.images_dir.to_string_lossy())
            .set("SEQUENCER", run.sequencer().label());
        match &lane_read {
            Some((lane, read)) => vars.set("LANE", lane.to_string()).set("READ", read.clone()),
            None => vars.set("LANE", "").set("READ", ""),
        };
        match &details {
            Some((spec, body)) => vars.set("TABLECOLUMNS", spec.clone()).set("TABLECONTENTS", body.clone()),
            None => vars.set("TABLECOLUMNS", "{|l|}").set("TABLECONTENTS", ""),
        };
        for (i, (title, body)) in tables.iter().enumerate() {
            vars.set_table(i, title, body);
        }

        let tex_path = report_dir.join("report.tex");
        std::fs::write(&tex_path, vars.render(&template)).map_err(|source| StageError::Io {
            path: tex_path.clone(),
            source,
        })?;

        let jobname = match &lane_read {
            Some((lane, read)) => format!("report-L{lane:03}-{read}"),
            None => format!("report-{}", report.stem),
        };
        let invocation = Invocation::new(&config.tools.pdflatex)
            .arg("-output-directory")
            .arg(report_dir.to_string_lossy())
            .arg(format!("--jobname={jobname}"))
            .arg(tex_path.to_string_lossy());

        tracing::info!(report = report.stem.as_str(), "compiling report");
        store.write(RunStatus::Running)?;
        if let Err(source) = runner.run(&invocation, log_file).await {
            store.write(RunStatus::Error)?;
            return Err(StageError::Tool {
                stage: "pdflatex",
                source,
            });
        }
    }

    store.write(RunStatus::Compiled)?;
    tracing::info!(run = run.name(), "reports compiled");
    Ok(())
}

struct Report {
    stem: String,
    images_dir: PathBuf,
}

/// The configured template file, or the embedded default.
fn load_template(config: &PipelineConfig) -> Result<String, StageError> {
    match &config.template_file {
        Some(path) => std::fs::read_to_string(path).map_err(|source| StageError::Io {
            path: path.clone(),
            source,
        }),
        None => default_template().ok_or_else(|| StageError::Template {
            reason: "embedded default template missing".to_string(),
        }),
    }
}

/// Stems of the HTML reports directly in the conversion output directory,
/// sorted by name. The stem is the file name up to the first dot, matching
/// the extracted-results directory next to it.
fn report_stems(fastq_dir: &Path) -> Result<Vec<String>, StageError> {
    let entries = std::fs::read_dir(fastq_dir).map_err(|source| StageError::Io {
        path: fastq_dir.to_path_buf(),
        source,
    })?;
    let mut stems = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| StageError::Io {
            path: fastq_dir.to_path_buf(),
            source,
        })?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(stem) = name.strip_suffix(".html") {
            let stem = stem.split('.').next().unwrap_or(stem);
            stems.push(stem.to_string());
        }
    }
    stems.sort();
    stems.dedup();
    Ok(stems)
}

/// Find the lane and read tokens in a report stem.
///
/// Scans for an `L` plus three digits and an `R` plus one digit, so both
/// `L1_L001_R1_001` and tool-suffixed stems resolve. Returns the numeric
/// lane and the read token.
fn lane_read_tokens(stem: &str) -> Option<(u32, String)> {
    let mut lane = None;
    let mut read = None;
    for token in stem.split('_') {
        if let Some(digits) = token.strip_prefix('L') {
            if digits.len() == 3 && digits.chars().all(|c| c.is_ascii_digit()) {
                lane = digits.parse().ok();
            }
        }
        if let Some(digit) = token.strip_prefix('R') {
            if digit.len() == 1 && digit.chars().all(|c| c.is_ascii_digit()) {
                read = Some(token.to_string());
            }
        }
    }
    Some((lane?, read?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lane_read_found_in_alias_stems() {
        assert_eq!(
            lane_read_tokens("L1_L001_R1_001"),
            Some((1, "R1".to_string()))
        );
        assert_eq!(
            lane_read_tokens("L4_L004_R2_012_fastqc"),
            Some((4, "R2".to_string()))
        );
        assert_eq!(lane_read_tokens("random_name"), None);
    }

    #[test]
    fn stems_cut_at_the_first_dot() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("L1_L001_R1_001.fastq_fastqc.html"), "x").unwrap();
        std::fs::write(dir.path().join("b_report.html"), "x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        let stems = report_stems(dir.path()).unwrap();
        assert_eq!(stems, vec!["L1_L001_R1_001", "b_report"]);
    }
}
