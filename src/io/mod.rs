// Record codec: decoding side, sources and stream factories
pub mod reader;

pub use reader::{FileSource, Record, RecordReader, RecordSource, RecordStream};

// Record codec: encoding side and output files
pub mod writer;

pub use writer::{RecordWriter, WriteMode};
