//! Per-lane, per-read file grouping.
//!
//! The conversion tool scatters compressed read files across the output
//! directory and one level of subdirectories, with names only loosely under
//! our control. The quality-check tool, on the other hand, expects a flat,
//! contiguously numbered file set. This module bridges the two: it discovers
//! the source files for every (lane, read) pair, plans a canonical alias name
//! per file, and materializes the aliases as symlinks next to the originals.
//!
//! Aliases are disposable indirection, not data: the quality-check stage
//! unlinks them as soon as its invocation for the lane succeeds. Planning is
//! a pure function over an injected listing so the numbering logic is
//! testable without a filesystem.

use crate::run::SequencerKind;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Errors that can occur during discovery and alias materialization.
#[derive(Debug, Error)]
pub enum GroupError {
    /// Failed to list the conversion output directory.
    #[error("Failed to list {}: {source}", .path.display())]
    List {
        path: PathBuf,
        source: walkdir::Error,
    },

    /// Failed to create an alias symlink.
    #[error("Failed to create alias {}: {source}", .path.display())]
    Symlink {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Some lanes have read files while this one has none.
    ///
    /// The conversion output is expected to cover every lane of the
    /// instrument; a gap means the conversion was interrupted or the
    /// sequencer kind is wrong.
    #[error("No read files found for lane {lane} while other lanes have some")]
    MissingLane { lane: u32 },
}

/// Matches source files belonging to one (lane, read) pair.
///
/// A file belongs to the pair when its name contains the `_L<lane>_R<read>`
/// infix (lane zero-padded to three digits) and carries the compressed
/// suffix. Alias names produced by [`plan_aliases`] also match this shape,
/// which is why discovery skips symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilePattern {
    lane: u32,
    read: u8,
}

impl FilePattern {
    pub fn new(lane: u32, read: u8) -> Self {
        Self { lane, read }
    }

    pub fn lane(&self) -> u32 {
        self.lane
    }

    pub fn read(&self) -> u8 {
        self.read
    }

    /// Lane label used as the grouping key, e.g. `L001`.
    pub fn lane_label(&self) -> String {
        format!("L{:03}", self.lane)
    }

    fn infix(&self) -> String {
        format!("_L{:03}_R{}", self.lane, self.read)
    }

    /// Whether `file_name` belongs to this (lane, read) pair.
    pub fn matches(&self, file_name: &str) -> bool {
        file_name.ends_with(".gz") && file_name.contains(&self.infix())
    }
}

/// The planned file set for one (lane, read) pair.
///
/// `sources` keeps discovery order; `aliases[i]` is the canonical name for
/// `sources[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadGroup {
    pub lane: u32,
    pub read: u8,
    pub sources: Vec<String>,
    pub aliases: Vec<String>,
}

/// Plan canonical alias names for `sources`, in order.
///
/// The alias embeds the 1-based discovery position zero-padded to three
/// digits: `L1_L001_R1_001.fastq.gz`. The extension is everything after the
/// first dot of the source file name, preserved verbatim, so multi-dot
/// conventions like `.fastq.gz` survive and anything else is treated as
/// opaque.
///
/// Pure: same sources in, same aliases out. Distinct (lane, read) pairs can
/// never collide because the pair is spelled into every alias name.
pub fn plan_aliases(pattern: FilePattern, sources: Vec<String>) -> ReadGroup {
    let aliases = sources
        .iter()
        .enumerate()
        .map(|(i, source)| {
            let name = file_name(source);
            let ext = name.split_once('.').map_or("gz", |(_, ext)| ext);
            format!(
                "L{lane}_L{lane:03}_R{read}_{seq:03}.{ext}",
                lane = pattern.lane,
                read = pattern.read,
                seq = i + 1,
            )
        })
        .collect();
    ReadGroup {
        lane: pattern.lane,
        read: pattern.read,
        sources,
        aliases,
    }
}

fn file_name(relative: &str) -> &str {
    relative.rsplit('/').next().unwrap_or(relative)
}

/// The materialized alias sets for a conversion output directory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Grouping {
    /// Lane label (`L001`…) to the alias names covering every discovered
    /// source for that lane, reads 1 and 2 in order. Same content on every
    /// invocation against the same directory state.
    pub lanes: BTreeMap<String, Vec<String>>,

    /// Aliases established by this invocation. An alias already present as a
    /// symlink is left untouched and not listed here.
    pub created: Vec<String>,
}

impl Grouping {
    /// True when no source file matched any (lane, read) pair, meaning the
    /// conversion output is not ready for quality checking.
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }
}

/// Discover sources and materialize alias symlinks for every (lane, read)
/// pair of the instrument.
///
/// Discovery lists `dir` directly and one level into subdirectories, sorted
/// by file name within each level, so alias numbering is stable across
/// repeated invocations. Symlinks are skipped: a previous invocation's
/// aliases are never treated as sources.
///
/// # Errors
///
/// Fails on unlistable directories, on symlink creation, and on a lane gap
/// (some lanes matched sources, this one did not).
pub fn materialize(dir: &Path, kind: SequencerKind) -> Result<Grouping, GroupError> {
    let listing = list_candidates(dir)?;
    let mut grouping = Grouping::default();
    let mut empty_lanes = Vec::new();

    for lane in kind.lanes() {
        let mut lane_aliases = Vec::new();
        for read in 1..=2u8 {
            let pattern = FilePattern::new(lane, read);
            let sources: Vec<String> = listing
                .iter()
                .filter(|rel| pattern.matches(file_name(rel)))
                .cloned()
                .collect();
            let group = plan_aliases(pattern, sources);
            for (source, alias) in group.sources.iter().zip(&group.aliases) {
                let link = dir.join(alias);
                if link.is_symlink() {
                    continue;
                }
                std::os::unix::fs::symlink(dir.join(source), &link).map_err(|source| {
                    GroupError::Symlink {
                        path: link.clone(),
                        source,
                    }
                })?;
                grouping.created.push(alias.clone());
            }
            lane_aliases.extend(group.aliases);
        }
        if lane_aliases.is_empty() {
            empty_lanes.push(lane);
        } else {
            grouping
                .lanes
                .insert(FilePattern::new(lane, 1).lane_label(), lane_aliases);
        }
    }

    if !grouping.lanes.is_empty() {
        if let Some(&lane) = empty_lanes.first() {
            return Err(GroupError::MissingLane { lane });
        }
    }

    Ok(grouping)
}

/// Remove the aliases of one lane after its quality-check invocation
/// succeeded.
///
/// Best effort: an alias already removed concurrently is logged and
/// tolerated, never escalated. Originals are untouched, only symlinks are
/// unlinked.
pub fn cleanup(dir: &Path, aliases: &[String]) {
    for alias in aliases {
        let link = dir.join(alias);
        if !link.is_symlink() {
            continue;
        }
        if let Err(e) = std::fs::remove_file(&link) {
            tracing::warn!(path = %link.display(), error = %e, "failed to unlink alias");
        }
    }
}

/// Relative paths of regular files in `dir` and one level below, each level
/// sorted by name. Symlinks are excluded.
fn list_candidates(dir: &Path) -> Result<Vec<String>, GroupError> {
    let mut candidates = Vec::new();
    for depth in [1, 2] {
        for entry in WalkDir::new(dir)
            .min_depth(depth)
            .max_depth(depth)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|source| GroupError::List {
                path: dir.to_path_buf(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(rel) = entry.path().strip_prefix(dir) {
                candidates.push(rel.to_string_lossy().into_owned());
            }
        }
    }
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"@read\n").unwrap();
    }

    #[test]
    fn pattern_matches_infix_and_suffix() {
        let pattern = FilePattern::new(1, 1);
        assert!(pattern.matches("Undetermined_S0_L001_R1_001.fastq.gz"));
        assert!(!pattern.matches("Undetermined_S0_L001_R2_001.fastq.gz"));
        assert!(!pattern.matches("Undetermined_S0_L002_R1_001.fastq.gz"));
        assert!(!pattern.matches("Undetermined_S0_L001_R1_001.fastq"));

        let pattern = FilePattern::new(3, 2);
        assert!(pattern.matches("sample_L003_R2_007.fastq.gz"));
        assert_eq!(pattern.lane_label(), "L003");
    }

    #[test]
    fn twelve_files_number_contiguously() {
        let sources: Vec<String> = (b'a'..=b'l')
            .map(|c| format!("{}_L001_R1.fastq.gz", c as char))
            .collect();
        let group = plan_aliases(FilePattern::new(1, 1), sources);
        assert_eq!(group.aliases.len(), 12);
        assert_eq!(group.aliases[0], "L1_L001_R1_001.fastq.gz");
        assert_eq!(group.aliases[11], "L1_L001_R1_012.fastq.gz");
    }

    #[test]
    fn padding_is_fixed_width_three() {
        let sources: Vec<String> = (0..150)
            .map(|i| format!("s{i:04}_L002_R2.fastq.gz"))
            .collect();
        let group = plan_aliases(FilePattern::new(2, 2), sources);
        assert_eq!(group.aliases[0], "L2_L002_R2_001.fastq.gz");
        assert_eq!(group.aliases[9], "L2_L002_R2_010.fastq.gz");
        assert_eq!(group.aliases[99], "L2_L002_R2_100.fastq.gz");
        assert_eq!(group.aliases[149], "L2_L002_R2_150.fastq.gz");
    }

    #[test]
    fn extension_is_everything_after_the_first_dot() {
        let group = plan_aliases(
            FilePattern::new(1, 1),
            vec!["weird_L001_R1.tar.old.gz".to_string()],
        );
        assert_eq!(group.aliases[0], "L1_L001_R1_001.tar.old.gz");
    }

    #[test]
    fn subdirectory_prefix_does_not_leak_into_extension() {
        let group = plan_aliases(
            FilePattern::new(1, 1),
            vec!["sub.dir/x_L001_R1.fastq.gz".to_string()],
        );
        assert_eq!(group.aliases[0], "L1_L001_R1_001.fastq.gz");
    }

    #[test]
    fn distinct_pairs_never_collide() {
        let mut seen = std::collections::HashSet::new();
        for lane in 1..=4 {
            for read in 1..=2 {
                let sources: Vec<String> = (0..5)
                    .map(|i| format!("s{i}_L{lane:03}_R{read}.fastq.gz"))
                    .collect();
                let group = plan_aliases(FilePattern::new(lane, read), sources);
                for alias in &group.aliases {
                    assert!(seen.insert(alias.clone()), "collision on {alias}");
                }
            }
        }
    }

    #[test]
    fn materialize_links_direct_and_nested_sources() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("b_L001_R1_001.fastq.gz"));
        touch(&dir.path().join("a_L001_R1_001.fastq.gz"));
        touch(&dir.path().join("extra/c_L001_R2_001.fastq.gz"));

        let grouping = materialize(dir.path(), SequencerKind::Miseq).unwrap();
        assert_eq!(
            grouping.lanes["L001"],
            vec![
                "L1_L001_R1_001.fastq.gz",
                "L1_L001_R1_002.fastq.gz",
                "L1_L001_R2_001.fastq.gz",
            ]
        );
        // Direct entries sort before nested ones; a < b within the level.
        let r1_first = std::fs::read_link(dir.path().join("L1_L001_R1_001.fastq.gz")).unwrap();
        assert!(r1_first.ends_with("a_L001_R1_001.fastq.gz"));
        let r2 = std::fs::read_link(dir.path().join("L1_L001_R2_001.fastq.gz")).unwrap();
        assert!(r2.ends_with("extra/c_L001_R2_001.fastq.gz"));
    }

    #[test]
    fn rerun_reports_nothing_new_but_same_lane_set() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a_L001_R1_001.fastq.gz"));

        let first = materialize(dir.path(), SequencerKind::Miseq).unwrap();
        assert_eq!(first.created, vec!["L1_L001_R1_001.fastq.gz"]);

        let second = materialize(dir.path(), SequencerKind::Miseq).unwrap();
        assert!(second.created.is_empty());
        assert_eq!(second.lanes, first.lanes);
    }

    #[test]
    fn no_sources_means_empty_not_error() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("notes.txt"));
        let grouping = materialize(dir.path(), SequencerKind::Nextseq).unwrap();
        assert!(grouping.is_empty());
    }

    #[test]
    fn lane_gap_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a_L001_R1_001.fastq.gz"));
        touch(&dir.path().join("a_L003_R1_001.fastq.gz"));
        assert!(matches!(
            materialize(dir.path(), SequencerKind::Nextseq),
            Err(GroupError::MissingLane { lane: 2 })
        ));
    }

    #[test]
    fn cleanup_unlinks_aliases_and_keeps_originals() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a_L001_R1_001.fastq.gz"));
        let grouping = materialize(dir.path(), SequencerKind::Miseq).unwrap();

        cleanup(dir.path(), &grouping.lanes["L001"]);
        assert!(!dir.path().join("L1_L001_R1_001.fastq.gz").exists());
        assert!(dir.path().join("a_L001_R1_001.fastq.gz").exists());

        // A second cleanup over the same list is a no-op, not a failure.
        cleanup(dir.path(), &grouping.lanes["L001"]);
    }
}
