//! CSV list sources.
//!
//! Each file has a header row; only the first two columns (question number,
//! problem name) are read. Quoted fields are allowed and extra columns are
//! ignored.

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::warn;
use tracker_core::model::{ListEntry, QuestionNumber};

use crate::error::SourceError;

/// Entries parsed from one source, plus the rows that were dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedList {
    pub entries: Vec<ListEntry>,
    pub skipped_rows: usize,
    pub duplicates: usize,
}

/// Read a list source from disk.
///
/// # Errors
///
/// Returns `SourceError` if the file cannot be opened, its header is
/// unreadable, or it has fewer than two columns.
pub fn read_list_file(path: &Path) -> Result<ParsedList, SourceError> {
    let file = File::open(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_list(file, path)
}

/// Parse a list source. `origin` is only used for diagnostics.
///
/// Rows with a non-numeric question number, or without a problem name, are
/// skipped with a warning. A question number seen twice keeps its first row.
///
/// # Errors
///
/// Returns `SourceError` on I/O failures or a header with fewer than two
/// columns.
pub fn read_list<R: Read>(reader: R, origin: &Path) -> Result<ParsedList, SourceError> {
    let csv_err = |source| SourceError::Csv {
        path: origin.to_path_buf(),
        source,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    if rdr.headers().map_err(csv_err)?.len() < 2 {
        return Err(SourceError::MissingColumns {
            path: origin.to_path_buf(),
        });
    }

    let mut parsed = ParsedList::default();
    let mut seen = HashSet::new();
    for result in rdr.records() {
        let record = match result {
            Ok(record) => record,
            Err(err) if err.is_io_error() => return Err(csv_err(err)),
            Err(err) => {
                warn!(file = %origin.display(), error = %err, "skipping unreadable row");
                parsed.skipped_rows += 1;
                continue;
            }
        };
        let line = record.position().map_or(0, csv::Position::line);

        let number = record.get(0).unwrap_or_default();
        let Ok(question) = number.parse::<QuestionNumber>() else {
            warn!(file = %origin.display(), line, value = number, "skipping row with invalid question number");
            parsed.skipped_rows += 1;
            continue;
        };
        let Some(name) = record.get(1).filter(|name| !name.is_empty()) else {
            warn!(file = %origin.display(), line, %question, "skipping row without a problem name");
            parsed.skipped_rows += 1;
            continue;
        };

        if !seen.insert(question) {
            warn!(file = %origin.display(), line, %question, "duplicate question number; keeping first row");
            parsed.duplicates += 1;
            continue;
        }
        parsed.entries.push(ListEntry::new(question, name));
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> ParsedList {
        read_list(input.as_bytes(), Path::new("test.csv")).unwrap()
    }

    #[test]
    fn reads_first_two_columns_only() {
        let parsed = parse(
            "Question Number,Problem,Difficulty,Link\n\
             1,Two Sum,Easy,https://x\n\
             49,\"Group Anagrams, Again\",Medium\n",
        );
        assert_eq!(
            parsed.entries,
            vec![
                ListEntry::new(QuestionNumber::new(1), "Two Sum"),
                ListEntry::new(QuestionNumber::new(49), "Group Anagrams, Again"),
            ]
        );
        assert_eq!(parsed.skipped_rows, 0);
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let parsed = parse("q,name\nabc,Bad\n-4,Negative\n7\n8,\n9,Fine\n");
        assert_eq!(
            parsed.entries,
            vec![ListEntry::new(QuestionNumber::new(9), "Fine")]
        );
        assert_eq!(parsed.skipped_rows, 4);
    }

    #[test]
    fn duplicates_keep_first_occurrence() {
        let parsed = parse("q,name\n3,First\n3,Second\n");
        assert_eq!(
            parsed.entries,
            vec![ListEntry::new(QuestionNumber::new(3), "First")]
        );
        assert_eq!(parsed.duplicates, 1);
    }

    #[test]
    fn single_column_header_is_rejected() {
        let err = read_list("q\n1\n".as_bytes(), Path::new("narrow.csv")).unwrap_err();
        assert!(matches!(err, SourceError::MissingColumns { .. }));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = read_list_file(&tmp.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
    }
}
