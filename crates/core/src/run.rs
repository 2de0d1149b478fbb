//! Run metadata models.
//!
//! A [`Run`] identifies one sequencing-instrument output folder being
//! processed. It is constructed once by the driver and passed immutably
//! through every pipeline stage.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// The instrument family a run came from.
///
/// The kind determines how many flow-cell lanes the conversion output
/// is split into: one for MiSeq, four for NextSeq.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SequencerKind {
    Miseq,
    Nextseq,
}

impl SequencerKind {
    /// Number of flow-cell lanes this instrument produces.
    pub fn lane_count(&self) -> u32 {
        match self {
            SequencerKind::Miseq => 1,
            SequencerKind::Nextseq => 4,
        }
    }

    /// Lane indices, 1-based.
    pub fn lanes(&self) -> std::ops::RangeInclusive<u32> {
        1..=self.lane_count()
    }

    /// Uppercase label used in report templates.
    pub fn label(&self) -> &'static str {
        match self {
            SequencerKind::Miseq => "MISEQ",
            SequencerKind::Nextseq => "NEXTSEQ",
        }
    }
}

impl fmt::Display for SequencerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SequencerKind {
    type Err = UnknownSequencer;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "miseq" => Ok(SequencerKind::Miseq),
            "nextseq" => Ok(SequencerKind::Nextseq),
            other => Err(UnknownSequencer(other.to_string())),
        }
    }
}

/// Error returned when a sequencer name is not recognized.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Unknown sequencer '{0}', expected 'miseq' or 'nextseq'")]
pub struct UnknownSequencer(String);

/// One sequencing run being processed.
///
/// Immutable once constructed. All stage artifacts live under [`Run::root`];
/// the conversion output directory is derived from the logical run name.
#[derive(Debug, Clone)]
pub struct Run {
    root: PathBuf,
    name: String,
    sequencer: SequencerKind,
}

impl Run {
    /// Build a run from its root directory.
    ///
    /// When `name` is `None`, the logical run name is derived from the last
    /// component of the root path, so `/data/runs/160225_NB501279/` becomes
    /// `160225_NB501279`.
    pub fn new(root: impl Into<PathBuf>, sequencer: SequencerKind, name: Option<String>) -> Self {
        let root = root.into();
        let name = name.unwrap_or_else(|| derive_name(&root));
        Self {
            root,
            name,
            sequencer,
        }
    }

    /// The run's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The logical run name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The instrument family.
    pub fn sequencer(&self) -> SequencerKind {
        self.sequencer
    }

    /// Directory the conversion tool writes per-lane/read files into.
    pub fn fastq_dir(&self) -> PathBuf {
        self.root.join(format!("{}_fastq", self.name))
    }
}

fn derive_name(root: &Path) -> String {
    root.components()
        .next_back()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .unwrap_or_else(|| root.to_string_lossy().into_owned())
}
