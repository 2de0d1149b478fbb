//! Shared fixtures for pipeline integration tests: a scripted tool runner
//! and helpers that fake the artifacts the real tools would leave behind.

use async_trait::async_trait;
use runqc_core::exec::{ExecError, Invocation, ToolRunner};
use runqc_core::run::{Run, SequencerKind};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

type Behavior = Box<dyn Fn(&Invocation) -> Result<(), ExecError> + Send + Sync>;

/// One recorded invocation: which program, with which arguments, and what
/// the status token read at that moment.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub program: String,
    pub args: Vec<String>,
    pub status_at_call: Option<String>,
}

/// Tool runner that records every invocation and delegates side effects to
/// a scripted behavior instead of spawning processes.
pub struct MockRunner {
    calls: Mutex<Vec<RecordedCall>>,
    status_file: PathBuf,
    behavior: Behavior,
}

impl MockRunner {
    pub fn new(
        status_file: PathBuf,
        behavior: impl Fn(&Invocation) -> Result<(), ExecError> + Send + Sync + 'static,
    ) -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            status_file,
            behavior: Box::new(behavior),
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Program base names of the recorded invocations, in order.
    pub fn programs(&self) -> Vec<String> {
        self.calls().iter().map(|c| c.program.clone()).collect()
    }
}

#[async_trait]
impl ToolRunner for MockRunner {
    async fn run(&self, invocation: &Invocation, _log_file: &Path) -> Result<(), ExecError> {
        let program = invocation
            .program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let status_at_call = std::fs::read_to_string(&self.status_file)
            .ok()
            .map(|s| s.trim().to_string());
        self.calls.lock().unwrap().push(RecordedCall {
            program,
            args: invocation.args.clone(),
            status_at_call,
        });
        (self.behavior)(invocation)
    }
}

/// Exit-code failure for scripting tool errors.
pub fn exit_failure(invocation: &Invocation, code: i32) -> ExecError {
    ExecError::NonZeroExit {
        program: invocation.program.clone(),
        code: Some(code),
    }
}

/// A MiSeq run rooted in a fresh subdirectory of `dir`.
pub fn miseq_run(dir: &Path) -> Run {
    let root = dir.join("160225_M00123_0042");
    std::fs::create_dir_all(&root).unwrap();
    Run::new(root, SequencerKind::Miseq, None)
}

/// Drop read files and a minimal conversion report tree into a conversion
/// output directory, as the conversion tool would.
pub fn seed_conversion_output(fastq_dir: &Path, reads: &[&str]) {
    std::fs::create_dir_all(fastq_dir).unwrap();
    for name in reads {
        std::fs::write(fastq_dir.join(name), b"@read\n").unwrap();
    }
    let html_dir = fastq_dir.join("Reports").join("html");
    std::fs::create_dir_all(html_dir.join("all")).unwrap();
    std::fs::write(
        html_dir.join("index.html"),
        r#"<frame src="all/lane.html">"#,
    )
    .unwrap();
    std::fs::write(
        html_dir.join("all/laneBarcode.html"),
        r#"<h2>Lane Summary</h2>
<table id="ReportTable">
<tr><th>Lane</th><th>Yield</th></tr>
<tr><td>1</td><td>12.3</td></tr>
</table>"#,
    )
    .unwrap();
}

/// Fake one quality-check result per `.gz` input of the invocation: an HTML
/// report next to the inputs plus the extracted-results directory with an
/// `Images` subdirectory.
pub fn fake_qc_results(invocation: &Invocation) {
    for arg in &invocation.args {
        if !arg.ends_with(".gz") {
            continue;
        }
        let path = PathBuf::from(arg);
        let fastq_dir = path.parent().unwrap();
        let stem = path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .split('.')
            .next()
            .unwrap()
            .to_string();
        std::fs::write(fastq_dir.join(format!("{stem}.html")), "<html></html>").unwrap();
        std::fs::create_dir_all(fastq_dir.join(&stem).join("Images")).unwrap();
    }
}

/// Fake the conversion tool: create the directory passed as `--output-dir`
/// and fill it with `reads` plus the report tree.
pub fn fake_conversion(invocation: &Invocation, reads: &[&str]) {
    let out = invocation
        .args
        .iter()
        .skip_while(|a| a.as_str() != "--output-dir")
        .nth(1)
        .expect("conversion invocation carries --output-dir");
    seed_conversion_output(Path::new(out), reads);
}

/// Write a small sidecar so the run-details table has content.
pub fn seed_samplesheet(run: &Run) {
    std::fs::write(
        run.root().join("SampleSheet.csv"),
        "[Header]\nExperiment Name,Run_7\n[Data]\nSample_ID,index\nS1,ATTACTCG\n",
    )
    .unwrap();
}
