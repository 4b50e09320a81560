use std::path::Path;
use tracing::{debug, info, warn};

use super::{check_outputs, Progress, SampleReport, SplitReport};
use crate::error::{Result, SplitError};
use crate::io::{RecordSource, RecordWriter};
use crate::selection::SelectionSet;

struct SelectedPass {
    written: usize,
    read: usize,
    satisfied: bool,
}

/// Copy the selected records to `writer`, stopping as soon as the last one
/// has been written. An empty selection never opens the source.
fn write_selected<S: RecordSource + ?Sized>(
    source: &S,
    writer: &mut RecordWriter,
    selection: &SelectionSet,
    progress: Progress,
) -> Result<SelectedPass> {
    if selection.is_empty() {
        return Ok(SelectedPass {
            written: 0,
            read: 0,
            satisfied: true,
        });
    }

    let bar = progress.bar(selection.universe(), "selected");
    let mut cursor = selection.cursor();
    let mut read = 0;
    for record in source.open()? {
        let record = record?;
        if cursor.advance(read) {
            writer.write_record(&record)?;
        }
        read += 1;
        bar.inc(1);
        if cursor.is_exhausted() {
            break;
        }
    }
    bar.finish_and_clear();

    Ok(SelectedPass {
        written: cursor.matched(),
        read,
        satisfied: cursor.is_exhausted(),
    })
}

fn check_universe(selection: &SelectionSet, declared: usize) -> Result<()> {
    if selection.universe() != declared {
        return Err(SplitError::InvalidSelection(format!(
            "selection was drawn from {} records but {} were declared",
            selection.universe(),
            declared
        )));
    }
    Ok(())
}

/// Write the selected records to `selected_path` and every other record of
/// the first `declared` to `remainder_path`, keeping stream order in both.
///
/// The source is opened twice: once for the selected records, once for the
/// remainder.
pub fn split_two_way<S: RecordSource + ?Sized>(
    source: &S,
    selected_path: &Path,
    remainder_path: &Path,
    declared: usize,
    selection: &SelectionSet,
    progress: Progress,
) -> Result<SplitReport> {
    check_universe(selection, declared)?;
    check_outputs(source, [selected_path, remainder_path])?;
    info!(
        declared,
        selected = selection.len(),
        "splitting {:?}",
        source.locations()
    );

    let mut selected_out = RecordWriter::create(selected_path)?;
    let pass = write_selected(source, &mut selected_out, selection, progress)?;
    if !pass.satisfied {
        return Err(SplitError::ExhaustedInput {
            declared,
            read: pass.read,
        });
    }
    let selected = selected_out.finish()?;
    debug!(selected, read = pass.read, "selected pass complete");

    let mut remainder_out = RecordWriter::create(remainder_path)?;
    let bar = progress.bar(declared, "remainder");
    let mut cursor = selection.cursor();
    let mut read = 0;
    for record in source.open()?.take(declared) {
        let record = record?;
        if !cursor.advance(read) {
            remainder_out.write_record(&record)?;
        }
        read += 1;
        bar.inc(1);
    }
    bar.finish_and_clear();
    if read < declared {
        return Err(SplitError::ExhaustedInput { declared, read });
    }
    let remainder = remainder_out.finish()?;
    debug!(remainder, "remainder pass complete");

    Ok(SplitReport {
        selected,
        remainder,
    })
}

/// Write the selected records to a single output, in stream order.
///
/// A stream shorter than the selection needs is not an error here: the
/// report carries fewer written records than requested.
pub fn sample<S: RecordSource + ?Sized>(
    source: &S,
    output_path: &Path,
    declared: usize,
    selection: &SelectionSet,
    progress: Progress,
) -> Result<SampleReport> {
    check_universe(selection, declared)?;
    check_outputs(source, [output_path])?;
    info!(
        declared,
        requested = selection.len(),
        "sampling {:?}",
        source.locations()
    );

    let mut out = RecordWriter::create(output_path)?;
    let pass = write_selected(source, &mut out, selection, progress)?;
    let written = out.finish()?;

    if !pass.satisfied {
        warn!(
            requested = selection.len(),
            written,
            read = pass.read,
            declared,
            "input ended before the sample was complete"
        );
    }

    Ok(SampleReport {
        requested: selection.len(),
        written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{FileSource, Record, RecordReader};
    use crate::split::testing::{record_index, MemorySource};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::fs::File;

    fn indices_in(path: &Path) -> Vec<i32> {
        RecordReader::new(File::open(path).unwrap())
            .map(|r| record_index(&r.unwrap()))
            .collect()
    }

    #[test]
    fn splits_concrete_selection() {
        let dir = tempfile::tempdir().unwrap();
        let (a, b) = (dir.path().join("a.bson"), dir.path().join("b.bson"));
        let source = MemorySource::with_len(10);
        let selection = SelectionSet::from_indices(10, vec![2, 5, 9]).unwrap();

        let report = split_two_way(&source, &a, &b, 10, &selection, Progress::hidden()).unwrap();

        assert_eq!(
            report,
            SplitReport {
                selected: 3,
                remainder: 7
            }
        );
        assert_eq!(indices_in(&a), vec![2, 5, 9]);
        assert_eq!(indices_in(&b), vec![0, 1, 3, 4, 6, 7, 8]);
        assert_eq!(source.opens.get(), 2);
    }

    #[test]
    fn empty_selection_skips_first_pass() {
        let dir = tempfile::tempdir().unwrap();
        let (a, b) = (dir.path().join("a.bson"), dir.path().join("b.bson"));
        let source = MemorySource::with_len(4);
        let selection = SelectionSet::from_indices(4, vec![]).unwrap();

        let report = split_two_way(&source, &a, &b, 4, &selection, Progress::hidden()).unwrap();

        assert_eq!(report.selected, 0);
        assert_eq!(report.remainder, 4);
        assert!(a.exists());
        assert!(indices_in(&a).is_empty());
        assert_eq!(indices_in(&b), vec![0, 1, 2, 3]);
        assert_eq!(source.opens.get(), 1);
    }

    #[test]
    fn records_past_the_declared_count_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let (a, b) = (dir.path().join("a.bson"), dir.path().join("b.bson"));
        let source = MemorySource::with_len(8);
        let selection = SelectionSet::from_indices(5, vec![1]).unwrap();

        let report = split_two_way(&source, &a, &b, 5, &selection, Progress::hidden()).unwrap();

        assert_eq!(report.selected + report.remainder, 5);
        assert_eq!(indices_in(&b), vec![0, 2, 3, 4]);
    }

    #[test]
    fn short_stream_fails_the_selected_pass() {
        let dir = tempfile::tempdir().unwrap();
        let (a, b) = (dir.path().join("a.bson"), dir.path().join("b.bson"));
        let source = MemorySource::with_len(50);
        let selection = SelectionSet::draw(&mut StdRng::seed_from_u64(3), 100, 80).unwrap();

        let err = split_two_way(&source, &a, &b, 100, &selection, Progress::hidden()).unwrap_err();

        assert!(matches!(
            err,
            SplitError::ExhaustedInput {
                declared: 100,
                read: 50
            }
        ));
        assert!(!b.exists());
    }

    #[test]
    fn short_stream_fails_the_remainder_pass() {
        let dir = tempfile::tempdir().unwrap();
        let (a, b) = (dir.path().join("a.bson"), dir.path().join("b.bson"));
        let source = MemorySource::with_len(6);
        let selection = SelectionSet::from_indices(10, vec![0, 3]).unwrap();

        let err = split_two_way(&source, &a, &b, 10, &selection, Progress::hidden()).unwrap_err();

        assert!(matches!(
            err,
            SplitError::ExhaustedInput {
                declared: 10,
                read: 6
            }
        ));
    }

    #[test]
    fn decode_errors_propagate() {
        let dir = tempfile::tempdir().unwrap();
        let (a, b) = (dir.path().join("a.bson"), dir.path().join("b.bson"));
        let mut source = MemorySource::with_len(6);
        source.fail_at = Some(4);
        let selection = SelectionSet::from_indices(6, vec![0]).unwrap();

        let err = split_two_way(&source, &a, &b, 6, &selection, Progress::hidden()).unwrap_err();
        assert!(matches!(err, SplitError::Decode { index: 4, .. }));
    }

    #[test]
    fn mismatched_selection_universe_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let source = MemorySource::with_len(6);
        let selection = SelectionSet::from_indices(5, vec![0]).unwrap();
        let err = sample(
            &source,
            &dir.path().join("s.bson"),
            6,
            &selection,
            Progress::hidden(),
        )
        .unwrap_err();
        assert!(matches!(err, SplitError::InvalidSelection(_)));
    }

    #[test]
    fn sample_stops_after_last_selected_record() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("s.bson");
        let mut source = MemorySource::with_len(10);
        // Anything read after index 4 would fail.
        source.fail_at = Some(5);
        let selection = SelectionSet::from_indices(10, vec![1, 4]).unwrap();

        let report = sample(&source, &out, 10, &selection, Progress::hidden()).unwrap();

        assert!(report.is_complete());
        assert_eq!(indices_in(&out), vec![1, 4]);
    }

    #[test]
    fn sample_on_short_stream_writes_what_it_can() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("s.bson");
        let source = MemorySource::with_len(5);
        let selection = SelectionSet::from_indices(10, vec![2, 4, 7]).unwrap();

        let report = sample(&source, &out, 10, &selection, Progress::hidden()).unwrap();

        assert_eq!(
            report,
            SampleReport {
                requested: 3,
                written: 2
            }
        );
        assert!(!report.is_complete());
        assert_eq!(indices_in(&out), vec![2, 4]);
    }

    #[test]
    fn preserves_record_bytes_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.bson");
        let records: Vec<Record> = (0..3)
            .map(|i| Record::from_elements(&[0x02, b's', 0x00, 2, 0, 0, 0, b'a' + i, 0]))
            .collect();
        let bytes: Vec<u8> = records.iter().flat_map(|r| r.as_bytes().to_vec()).collect();
        std::fs::write(&input, &bytes).unwrap();

        let (a, b) = (dir.path().join("a.bson"), dir.path().join("b.bson"));
        let selection = SelectionSet::from_indices(3, vec![1]).unwrap();
        split_two_way(
            &FileSource::new(&input),
            &a,
            &b,
            3,
            &selection,
            Progress::hidden(),
        )
        .unwrap();

        assert_eq!(std::fs::read(&a).unwrap(), records[1].as_bytes());
        let mut rest = records[0].as_bytes().to_vec();
        rest.extend_from_slice(records[2].as_bytes());
        assert_eq!(std::fs::read(&b).unwrap(), rest);
    }

    #[test]
    fn output_overlapping_the_input_leaves_it_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.bson");
        let bytes: Vec<u8> = (0..10)
            .flat_map(|i| crate::split::testing::indexed_record(i).into_bytes())
            .collect();
        std::fs::write(&input, &bytes).unwrap();
        let source = FileSource::new(&input);
        let other = dir.path().join("other.bson");
        let selection = SelectionSet::from_indices(10, vec![1, 4]).unwrap();

        let err = split_two_way(&source, &input, &other, 10, &selection, Progress::hidden())
            .unwrap_err();
        assert!(matches!(err, SplitError::OutputIsInput { ref path } if path == &input));

        let err = split_two_way(&source, &other, &input, 10, &selection, Progress::hidden())
            .unwrap_err();
        assert!(matches!(err, SplitError::OutputIsInput { .. }));

        let err = sample(&source, &input, 10, &selection, Progress::hidden()).unwrap_err();
        assert!(matches!(err, SplitError::OutputIsInput { .. }));

        assert_eq!(std::fs::read(&input).unwrap(), bytes);
        assert!(!other.exists());
    }
}
