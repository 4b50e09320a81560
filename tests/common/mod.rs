#![allow(dead_code)]

use std::fs::File;
use std::path::Path;

use record_splitter::{Record, RecordReader};

/// Record whose single int32 element `i` carries its position in the input.
pub fn indexed_record(i: i32) -> Record {
    let mut elements = vec![0x10, b'i', 0x00];
    elements.extend_from_slice(&i.to_le_bytes());
    Record::from_elements(&elements)
}

pub fn record_index(record: &Record) -> i32 {
    let b = record.as_bytes();
    i32::from_le_bytes([b[7], b[8], b[9], b[10]])
}

/// Write records `0..n` to `path`.
pub fn write_input(path: &Path, n: usize) {
    write_range(path, 0, n);
}

pub fn write_range(path: &Path, start: usize, end: usize) {
    let bytes: Vec<u8> = (start..end)
        .flat_map(|i| indexed_record(i as i32).into_bytes())
        .collect();
    std::fs::write(path, bytes).unwrap();
}

pub fn read_indices(path: &Path) -> Vec<i32> {
    RecordReader::new(File::open(path).unwrap())
        .map(|r| record_index(&r.unwrap()))
        .collect()
}
