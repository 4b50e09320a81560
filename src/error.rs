use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error type for record decoding, selection and output failures.
#[derive(Debug, Error)]
pub enum SplitError {
    #[error("sample size {requested} exceeds the declared record count {available}")]
    InvalidSampleSize { requested: usize, available: usize },
    #[error("partition count must be greater than zero")]
    InvalidPartitionCount,
    #[error("invalid selection: {0}")]
    InvalidSelection(String),
    #[error("input exhausted after {read} records (declared {declared})")]
    ExhaustedInput { declared: usize, read: usize },
    #[error("failed to write {}: {source}", path.display())]
    IoWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to open {}: {source}", path.display())]
    IoRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed record at index {index}: {reason}")]
    Decode { index: usize, reason: String },
    #[error("output {} is also an input", path.display())]
    OutputIsInput { path: PathBuf },
    #[error("pattern error: {0}")]
    Pattern(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, SplitError>;

impl SplitError {
    pub(crate) fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        SplitError::IoWrite {
            path: path.into(),
            source,
        }
    }
}
