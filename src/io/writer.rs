use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::reader::Record;
use crate::error::{Result, SplitError};

/// What happens to an output file that already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Start from an empty file.
    Truncate,
    /// Keep existing records and add new ones after them. Re-running a
    /// policy in this mode duplicates its records.
    Append,
}

/// Buffered output stream of encoded records.
///
/// Dropping the writer without calling `finish` leaves whatever was buffered
/// up to the drop on disk; no cleanup happens on error.
pub struct RecordWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    records_written: usize,
}

impl RecordWriter {
    /// Create (or truncate) `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(path, WriteMode::Truncate)
    }

    /// Open `path` according to `mode`, creating parent directories first.
    pub fn open(path: impl AsRef<Path>, mode: WriteMode) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| SplitError::write(parent, e))?;
            }
        }

        let mut options = OpenOptions::new();
        match mode {
            WriteMode::Truncate => options.write(true).create(true).truncate(true),
            WriteMode::Append => options.append(true).create(true),
        };
        let file = options.open(path).map_err(|e| SplitError::write(path, e))?;

        Ok(Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            records_written: 0,
        })
    }

    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        self.writer
            .write_all(record.as_bytes())
            .map_err(|e| SplitError::write(&self.path, e))?;
        self.records_written += 1;
        Ok(())
    }

    /// Records written through this writer (not counting pre-existing ones).
    pub fn records_written(&self) -> usize {
        self.records_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush buffered bytes and close the file, returning the record count.
    pub fn finish(mut self) -> Result<usize> {
        self.writer
            .flush()
            .map_err(|e| SplitError::write(&self.path, e))?;
        Ok(self.records_written)
    }
}
