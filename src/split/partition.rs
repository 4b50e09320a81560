use regex::{Captures, Regex};
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::{debug, info};

use super::{check_outputs, PartitionOutput, PartitionReport, Progress};
use crate::error::{Result, SplitError};
use crate::io::{RecordSource, RecordWriter, WriteMode};

pub const DEFAULT_NAME_PATTERN: &str = "{part}_{per_part}.bson";

/// Widest zero padding `{part:0W}` accepts.
pub const MAX_PART_WIDTH: usize = 20;

/// Partition a record index lands in.
pub fn partition_of(index: usize, parts: usize) -> usize {
    index % parts
}

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{part(?::(\d+))?\}").expect("placeholder regex"))
}

/// File name template for partition outputs.
///
/// Placeholders:
/// - `{part}`: partition id
/// - `{part:04}`: partition id zero-padded to the given width
/// - `{per_part}`: declared count divided by the number of partitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePattern {
    template: String,
}

impl NamePattern {
    pub fn new(template: &str) -> Result<Self> {
        if !placeholder().is_match(template) {
            return Err(SplitError::Pattern(format!(
                "name pattern '{}' must contain a {{part}} placeholder",
                template
            )));
        }
        if template.contains(&['/', '\\'][..]) {
            return Err(SplitError::Pattern(format!(
                "name pattern '{}' must be a file name, not a path",
                template
            )));
        }
        for caps in placeholder().captures_iter(template) {
            if let Some(width) = caps.get(1) {
                match width.as_str().parse::<usize>() {
                    Ok(w) if w <= MAX_PART_WIDTH => {}
                    _ => {
                        return Err(SplitError::Pattern(format!(
                            "name pattern '{}': width {} exceeds {}",
                            template,
                            width.as_str(),
                            MAX_PART_WIDTH
                        )))
                    }
                }
            }
        }
        Ok(Self {
            template: template.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    pub fn render(&self, part: usize, per_part: usize) -> String {
        placeholder()
            .replace_all(&self.template, |caps: &Captures| match caps.get(1) {
                Some(width) => {
                    let width = width.as_str().parse::<usize>().unwrap_or(0);
                    format!("{:0width$}", part, width = width)
                }
                None => part.to_string(),
            })
            .replace("{per_part}", &per_part.to_string())
    }
}

impl Default for NamePattern {
    fn default() -> Self {
        Self {
            template: DEFAULT_NAME_PATTERN.to_string(),
        }
    }
}

/// Where and how partition files are written.
#[derive(Debug, Clone)]
pub struct PartitionLayout {
    pub output_dir: PathBuf,
    pub parts: usize,
    pub name_pattern: NamePattern,
    pub write_mode: WriteMode,
}

impl PartitionLayout {
    pub fn new(output_dir: impl Into<PathBuf>, parts: usize) -> Self {
        Self {
            output_dir: output_dir.into(),
            parts,
            name_pattern: NamePattern::default(),
            write_mode: WriteMode::Append,
        }
    }

    pub fn with_name_pattern(mut self, name_pattern: NamePattern) -> Self {
        self.name_pattern = name_pattern;
        self
    }

    pub fn with_write_mode(mut self, write_mode: WriteMode) -> Self {
        self.write_mode = write_mode;
        self
    }

    pub fn partition_path(&self, part: usize, declared: usize) -> PathBuf {
        let per_part = if self.parts == 0 {
            0
        } else {
            declared / self.parts
        };
        self.output_dir.join(self.name_pattern.render(part, per_part))
    }
}

/// Send record `i` of the first `declared` records to partition
/// `i mod parts`, in a single forward pass.
///
/// With `WriteMode::Append`, existing partition files keep their records and
/// a re-run duplicates everything it writes.
pub fn partition_round_robin<S: RecordSource + ?Sized>(
    source: &S,
    layout: &PartitionLayout,
    declared: usize,
    progress: Progress,
) -> Result<PartitionReport> {
    if layout.parts == 0 {
        return Err(SplitError::InvalidPartitionCount);
    }
    let paths: Vec<PathBuf> = (0..layout.parts)
        .map(|part| layout.partition_path(part, declared))
        .collect();
    check_outputs(source, paths.iter().map(PathBuf::as_path))?;
    info!(
        declared,
        parts = layout.parts,
        mode = ?layout.write_mode,
        "partitioning {:?} into {}",
        source.locations(),
        layout.output_dir.display()
    );

    std::fs::create_dir_all(&layout.output_dir)
        .map_err(|e| SplitError::write(&layout.output_dir, e))?;

    let mut writers = paths
        .iter()
        .map(|path| RecordWriter::open(path, layout.write_mode))
        .collect::<Result<Vec<_>>>()?;

    let bar = progress.bar(declared, "partition");
    let mut read = 0;
    for record in source.open()?.take(declared) {
        let record = record?;
        writers[partition_of(read, layout.parts)].write_record(&record)?;
        read += 1;
        bar.inc(1);
    }
    bar.finish_and_clear();
    if read < declared {
        return Err(SplitError::ExhaustedInput { declared, read });
    }

    let mut partitions = Vec::with_capacity(writers.len());
    for (part, writer) in writers.into_iter().enumerate() {
        let path = writer.path().to_path_buf();
        let records = writer.finish()?;
        debug!(part, records, path = %path.display(), "partition closed");
        partitions.push(PartitionOutput {
            part,
            path,
            records,
        });
    }

    Ok(PartitionReport { partitions })
}
