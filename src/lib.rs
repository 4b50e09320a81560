//! Sample, split and partition streams of length-prefixed BSON records.
//!
//! Records are relayed as opaque bytes. Three policies are available:
//! a two-way split ([`split::split_two_way`]), a single-output random sample
//! ([`split::sample`]) and a round-robin partition
//! ([`split::partition_round_robin`]).

pub mod config;
pub mod error;
pub mod io;
pub mod logging;
pub mod runtime;
pub mod selection;
pub mod split;

pub use error::{Result, SplitError};
pub use io::{FileSource, Record, RecordReader, RecordSource, RecordWriter, WriteMode};
pub use selection::SelectionSet;
pub use split::{
    count_records, partition_round_robin, sample, split_two_way, NamePattern, PartitionLayout,
    PartitionReport, Progress, SampleReport, SplitReport,
};
