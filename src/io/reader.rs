use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};

use crate::error::{Result, SplitError};

/// Smallest well-formed document: 4 length bytes plus the terminator.
pub const MIN_RECORD_LEN: usize = 5;

/// Largest document the codec accepts (16 MiB).
pub const MAX_RECORD_LEN: usize = 16 * 1024 * 1024;

/// One encoded document, kept as its exact on-disk bytes.
///
/// The frame is a little-endian `i32` total length (counting the prefix
/// itself), the element bytes, and a trailing `0x00`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record(Vec<u8>);

impl Record {
    /// Frame raw element bytes as a document.
    pub fn from_elements(elements: &[u8]) -> Self {
        let len = elements.len() + MIN_RECORD_LEN;
        let mut bytes = Vec::with_capacity(len);
        bytes.extend_from_slice(&(len as i32).to_le_bytes());
        bytes.extend_from_slice(elements);
        bytes.push(0);
        Record(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Encoded size in bytes, prefix and terminator included.
    pub fn encoded_len(&self) -> usize {
        self.0.len()
    }

    /// True for the 5-byte document that carries no elements.
    pub fn has_no_elements(&self) -> bool {
        self.0.len() == MIN_RECORD_LEN
    }
}

/// Forward-only decoder over a stream of concatenated documents.
pub struct RecordReader<R> {
    reader: R,
    next_index: usize,
    done: bool,
}

impl<R: Read> RecordReader<R> {
    pub fn new(reader: R) -> Self {
        Self::starting_at(reader, 0)
    }

    /// Decoder whose first record carries `index` in error reports.
    pub fn starting_at(reader: R, index: usize) -> Self {
        Self {
            reader,
            next_index: index,
            done: false,
        }
    }

    /// Index the next decoded record will have.
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    fn decode_error(&self, reason: impl Into<String>) -> SplitError {
        SplitError::Decode {
            index: self.next_index,
            reason: reason.into(),
        }
    }

    /// Fill `buf` as far as the stream allows, returning the byte count.
    fn read_prefix(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled)
    }

    fn read_record(&mut self) -> Result<Option<Record>> {
        let mut prefix = [0u8; 4];
        let filled = self.read_prefix(&mut prefix)?;
        if filled == 0 {
            return Ok(None);
        }
        if filled < prefix.len() {
            return Err(self.decode_error(format!(
                "truncated length prefix ({} of 4 bytes)",
                filled
            )));
        }

        let declared = i32::from_le_bytes(prefix);
        if declared < MIN_RECORD_LEN as i32 || declared as usize > MAX_RECORD_LEN {
            return Err(self.decode_error(format!("invalid document length {}", declared)));
        }

        let len = declared as usize;
        let mut bytes = vec![0u8; len];
        bytes[..4].copy_from_slice(&prefix);
        if let Err(e) = self.reader.read_exact(&mut bytes[4..]) {
            return Err(if e.kind() == ErrorKind::UnexpectedEof {
                self.decode_error(format!("truncated document, expected {} bytes", len))
            } else {
                e.into()
            });
        }
        if bytes[len - 1] != 0 {
            return Err(self.decode_error("missing document terminator"));
        }

        self.next_index += 1;
        Ok(Some(Record(bytes)))
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

pub type RecordStream<'a> = Box<dyn Iterator<Item = Result<Record>> + 'a>;

/// Produces a fresh forward-only stream on every call to `open`.
///
/// Policies that need more than one pass reopen the source instead of
/// seeking, so the underlying transport never has to support rewinding.
pub trait RecordSource {
    fn open(&self) -> Result<RecordStream<'_>>;

    /// Human-readable locations, used in logs and the run manifest.
    fn locations(&self) -> Vec<String>;

    /// True if writing to `path` would overwrite part of this source.
    fn reads_from(&self, _path: &Path) -> bool {
        false
    }
}

/// One or more files read back to back as a single indexed stream.
#[derive(Debug, Clone)]
pub struct FileSource {
    paths: Vec<PathBuf>,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            paths: vec![path.into()],
        }
    }

    pub fn from_paths(paths: Vec<PathBuf>) -> Result<Self> {
        if paths.is_empty() {
            return Err(SplitError::Pattern(
                "a file source needs at least one path".to_string(),
            ));
        }
        Ok(Self { paths })
    }

    /// Expand `pattern` if it contains glob metacharacters, otherwise treat
    /// it as a plain path. An existing file is always taken literally, even
    /// when its name contains metacharacters. Matches are sorted so the
    /// record order is stable.
    pub fn from_pattern(pattern: &str) -> Result<Self> {
        if Path::new(pattern).is_file() || !pattern.contains(&['*', '?', '['][..]) {
            return Ok(Self::new(pattern));
        }

        let entries = glob::glob(pattern)
            .map_err(|e| SplitError::Pattern(format!("{}: {}", pattern, e)))?;
        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| SplitError::Pattern(e.to_string()))?;
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        if paths.is_empty() {
            return Err(SplitError::Pattern(format!(
                "no input files match '{}'",
                pattern
            )));
        }
        Ok(Self { paths })
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl RecordSource for FileSource {
    fn open(&self) -> Result<RecordStream<'_>> {
        // Fail fast on an unreadable first file; later files open lazily.
        let first = open_file(&self.paths[0])?;
        Ok(Box::new(MultiFileStream {
            paths: &self.paths,
            next_path: 1,
            current: Some(RecordReader::new(first)),
            records_before: 0,
            failed: false,
        }))
    }

    fn locations(&self) -> Vec<String> {
        self.paths
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect()
    }

    fn reads_from(&self, path: &Path) -> bool {
        let target = same_file_key(path);
        self.paths.iter().any(|input| same_file_key(input) == target)
    }
}

/// Canonical form of `path` when it exists, the path itself otherwise.
fn same_file_key(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn open_file(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).map_err(|source| SplitError::IoRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file))
}

/// Reads files in order, continuing record indices across file boundaries.
struct MultiFileStream<'a> {
    paths: &'a [PathBuf],
    next_path: usize,
    current: Option<RecordReader<BufReader<File>>>,
    records_before: usize,
    failed: bool,
}

impl Iterator for MultiFileStream<'_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            if let Some(reader) = self.current.as_mut() {
                match reader.next() {
                    Some(Ok(record)) => return Some(Ok(record)),
                    Some(Err(e)) => {
                        self.failed = true;
                        self.current = None;
                        return Some(Err(e));
                    }
                    None => {}
                }
                self.records_before = reader.next_index();
                self.current = None;
            }

            let paths = self.paths;
            let path = paths.get(self.next_path)?;
            self.next_path += 1;
            match open_file(path) {
                Ok(file) => {
                    self.current = Some(RecordReader::starting_at(file, self.records_before));
                }
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn record(tag: u8) -> Record {
        Record::from_elements(&[0x08, b'b', 0x00, tag])
    }

    fn encode(records: &[Record]) -> Vec<u8> {
        records.iter().flat_map(|r| r.as_bytes().to_vec()).collect()
    }

    #[test]
    fn frames_elements_with_length_and_terminator() {
        let r = record(1);
        assert_eq!(r.encoded_len(), 9);
        assert_eq!(&r.as_bytes()[..4], &9i32.to_le_bytes());
        assert_eq!(r.as_bytes()[8], 0);
        assert!(!r.has_no_elements());

        let empty = Record::from_elements(&[]);
        assert_eq!(empty.encoded_len(), MIN_RECORD_LEN);
        assert!(empty.has_no_elements());
    }

    #[test]
    fn decodes_concatenated_records_in_order() {
        let records = vec![record(1), record(2), record(3)];
        let decoded: Vec<Record> = RecordReader::new(Cursor::new(encode(&records)))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(decoded, records);
    }

    #[test]
    fn empty_input_yields_nothing() {
        let mut reader = RecordReader::new(Cursor::new(Vec::new()));
        assert!(reader.next().is_none());
    }

    #[test]
    fn truncated_prefix_is_a_decode_error() {
        let mut bytes = encode(&[record(1)]);
        bytes.extend_from_slice(&[9, 0]);
        let items: Vec<_> = RecordReader::new(Cursor::new(bytes)).collect();
        assert_eq!(items.len(), 2);
        assert!(matches!(
            items[1],
            Err(SplitError::Decode { index: 1, .. })
        ));
    }

    #[test]
    fn truncated_body_is_a_decode_error() {
        let mut bytes = encode(&[record(1), record(2)]);
        bytes.truncate(bytes.len() - 3);
        let mut reader = RecordReader::new(Cursor::new(bytes));
        assert!(reader.next().unwrap().is_ok());
        match reader.next() {
            Some(Err(SplitError::Decode { index, reason })) => {
                assert_eq!(index, 1);
                assert!(reason.contains("truncated"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(reader.next().is_none());
    }

    #[test]
    fn rejects_impossible_lengths_and_missing_terminator() {
        let too_short = 3i32.to_le_bytes().to_vec();
        assert!(matches!(
            RecordReader::new(Cursor::new(too_short)).next(),
            Some(Err(SplitError::Decode { .. }))
        ));

        let mut no_terminator = record(7).into_bytes();
        let last = no_terminator.len() - 1;
        no_terminator[last] = 0xff;
        assert!(matches!(
            RecordReader::new(Cursor::new(no_terminator)).next(),
            Some(Err(SplitError::Decode { .. }))
        ));
    }

    #[test]
    fn file_source_continues_indices_across_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.bson");
        let b = dir.path().join("b.bson");
        std::fs::write(&a, encode(&[record(1), record(2)])).unwrap();
        let mut broken = encode(&[record(3)]);
        broken.extend_from_slice(&[1, 2]);
        std::fs::write(&b, broken).unwrap();

        let source = FileSource::from_paths(vec![a, b]).unwrap();
        let items: Vec<_> = source.open().unwrap().collect();
        assert_eq!(items.len(), 4);
        assert!(items[..3].iter().all(|r| r.is_ok()));
        assert!(matches!(items[3], Err(SplitError::Decode { index: 3, .. })));
    }

    #[test]
    fn file_source_stops_after_an_error_in_an_earlier_file() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.bson");
        let b = dir.path().join("b.bson");
        let mut broken = encode(&[record(0)]);
        broken.extend_from_slice(&[1, 2]);
        std::fs::write(&a, broken).unwrap();
        std::fs::write(&b, encode(&[record(1), record(2)])).unwrap();

        let source = FileSource::from_paths(vec![a, b]).unwrap();
        let mut stream = source.open().unwrap();
        assert!(matches!(stream.next(), Some(Ok(_))));
        assert!(matches!(
            stream.next(),
            Some(Err(SplitError::Decode { index: 1, .. }))
        ));
        assert!(stream.next().is_none());
        assert!(stream.next().is_none());
    }

    #[test]
    fn existing_file_with_bracket_name_is_not_a_glob() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data[1].bson");
        std::fs::write(&path, encode(&[record(0), record(1)])).unwrap();

        let source = FileSource::from_pattern(&path.to_string_lossy()).unwrap();
        assert_eq!(source.paths(), &[path.clone()][..]);
        assert_eq!(source.open().unwrap().count(), 2);
    }

    #[test]
    fn reads_from_matches_inputs_through_different_spellings() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.bson");
        std::fs::write(&input, encode(&[record(0)])).unwrap();

        let source = FileSource::new(&input);
        assert!(source.reads_from(&input));
        assert!(source.reads_from(&dir.path().join(".").join("input.bson")));
        assert!(!source.reads_from(&dir.path().join("output.bson")));
    }

    #[test]
    fn glob_pattern_expands_sorted_and_rejects_empty_matches() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["2.bson", "1.bson", "notes.txt"] {
            std::fs::write(dir.path().join(name), encode(&[record(0)])).unwrap();
        }

        let pattern = format!("{}/*.bson", dir.path().display());
        let source = FileSource::from_pattern(&pattern).unwrap();
        let names: Vec<_> = source
            .paths()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["1.bson", "2.bson"]);

        let missing = format!("{}/*.missing", dir.path().display());
        assert!(matches!(
            FileSource::from_pattern(&missing),
            Err(SplitError::Pattern(_))
        ));
    }

    #[test]
    fn missing_file_fails_on_open() {
        let source = FileSource::new("/nonexistent/input.bson");
        assert!(matches!(source.open(), Err(SplitError::IoRead { .. })));
    }
}
