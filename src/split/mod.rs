use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

use crate::error::{Result, SplitError};
use crate::io::RecordSource;

mod partition;
mod two_way;

pub use partition::{partition_of, partition_round_robin, NamePattern, PartitionLayout};
pub use two_way::{sample, split_two_way};

/// Record counts of a two-way split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitReport {
    pub selected: usize,
    pub remainder: usize,
}

/// Outcome of a single-output sample. `written` falls short of `requested`
/// only when the input ended before the selection was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleReport {
    pub requested: usize,
    pub written: usize,
}

impl SampleReport {
    pub fn is_complete(&self) -> bool {
        self.written == self.requested
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionOutput {
    pub part: usize,
    pub path: PathBuf,
    /// Records written during this run.
    pub records: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionReport {
    pub partitions: Vec<PartitionOutput>,
}

impl PartitionReport {
    pub fn total(&self) -> usize {
        self.partitions.iter().map(|p| p.records).sum()
    }
}

/// Whether passes over the input draw a progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    visible: bool,
}

impl Progress {
    pub fn visible() -> Self {
        Self { visible: true }
    }

    pub fn hidden() -> Self {
        Self { visible: false }
    }

    pub(crate) fn bar(&self, len: usize, label: &str) -> ProgressBar {
        if !self.visible {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        let style = ProgressStyle::default_bar()
            .template(
                "{spinner:.green} {prefix:>10} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} records ({percent}%)",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style.progress_chars("=> "));
        pb.set_prefix(label.to_string());
        pb
    }
}

/// Refuse outputs that would overwrite the input before it has been read.
fn check_outputs<'a, S, I>(source: &S, outputs: I) -> Result<()>
where
    S: RecordSource + ?Sized,
    I: IntoIterator<Item = &'a Path>,
{
    for path in outputs {
        if source.reads_from(path) {
            return Err(SplitError::OutputIsInput {
                path: path.to_path_buf(),
            });
        }
    }
    Ok(())
}

/// Read `source` to its end and return the number of well-formed records.
pub fn count_records<S: RecordSource + ?Sized>(source: &S) -> Result<usize> {
    let mut count = 0;
    for record in source.open()? {
        record?;
        count += 1;
    }
    Ok(count)
}
