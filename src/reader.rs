//! File access for a single read pass.

use crate::error::{Error, Result};
use crate::parser::StreamParser;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Number of leading bytes kept to recognise the same file on the next pass.
const FINGERPRINT_SIZE: u64 = 1000;

/// Opens the watched file for a binary read.
pub(crate) fn open_file(path: &Path) -> Result<File> {
    File::open(path).map_err(|source| Error::Open {
        path: path.to_path_buf(),
        source,
    })
}

/// Size of the open file, found by seeking to its end.
pub(crate) fn measure_file(file: &mut File, path: &Path) -> Result<u64> {
    file.seek(SeekFrom::End(0)).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// True when the file is now shorter than the offset already consumed.
pub(crate) fn detect_file_truncation(current_size: u64, last_position: u64) -> bool {
    current_size < last_position
}

/// Offset the next pass starts reading from.
///
/// The first pass of a session, and any pass after the file shrank below the
/// high-water mark, start over at 0.
pub(crate) fn start_offset(high_water_mark: Option<u64>, current_size: u64) -> u64 {
    match high_water_mark {
        Some(offset) if !detect_file_truncation(current_size, offset) => offset,
        _ => 0,
    }
}

/// Device and inode of an open file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(not(unix), allow(dead_code))]
struct FileId {
    dev: u64,
    ino: u64,
}

impl FileId {
    #[cfg(unix)]
    fn from_file(file: &File) -> io::Result<Option<Self>> {
        use std::os::unix::fs::MetadataExt;

        let metadata = file.metadata()?;
        Ok(Some(Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        }))
    }

    /// Only the content fingerprint is compared on other platforms.
    #[cfg(not(unix))]
    fn from_file(_file: &File) -> io::Result<Option<Self>> {
        Ok(None)
    }
}

/// What a pass saw of the file: its inode and its first bytes.
///
/// A file replaced by rename gets a new inode. A file truncated and rewritten
/// in place keeps its inode but, unless the new content repeats the old, not
/// its leading bytes. Either shows up here even when the size did not shrink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FileIdentity {
    id: Option<FileId>,
    head: Vec<u8>,
}

impl FileIdentity {
    /// Reads the identity of `file`, fingerprinting at most its first `size` bytes.
    pub(crate) fn read(file: &mut File, path: &Path, size: u64) -> Result<Self> {
        let read_error = |source: io::Error| Error::Read {
            path: path.to_path_buf(),
            source,
        };

        let id = FileId::from_file(file).map_err(read_error)?;

        let mut head = Vec::new();
        file.seek(SeekFrom::Start(0)).map_err(read_error)?;
        file.take(size.min(FINGERPRINT_SIZE))
            .read_to_end(&mut head)
            .map_err(read_error)?;

        Ok(Self { id, head })
    }

    /// Whether `current` is this same file, possibly grown since.
    pub(crate) fn continued_by(&self, current: &FileIdentity) -> bool {
        self.id == current.id && current.head.starts_with(&self.head)
    }
}

/// Feeds bytes `start..end` of `file` to `parser`.
///
/// Bytes past `end` are left for the next pass even if they were appended
/// while this one ran.
pub(crate) fn feed_range<P: StreamParser>(
    file: &mut File,
    path: &Path,
    start: u64,
    end: u64,
    parser: &mut P,
    on_entry: &mut dyn FnMut(P::Entry),
) -> Result<()> {
    let read_error = |source: io::Error| Error::Read {
        path: path.to_path_buf(),
        source,
    };

    file.seek(SeekFrom::Start(start)).map_err(read_error)?;
    let mut limited = file.take(end.saturating_sub(start));
    parser
        .parse_stream(&mut limited, on_entry)
        .map_err(read_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::LineParser;
    use crate::test_helpers::TempLogFile;
    use std::path::PathBuf;

    fn feed_all(temp: &TempLogFile, start: u64, end: u64, parser: &mut LineParser) -> Vec<String> {
        let mut file = open_file(temp.path()).unwrap();
        let mut entries = Vec::new();
        feed_range(&mut file, temp.path(), start, end, parser, &mut |e| entries.push(e))
            .expect("Should read file successfully");
        entries
    }

    #[test]
    fn test_detect_file_truncation() {
        assert!(detect_file_truncation(100, 200)); // File was truncated
        assert!(!detect_file_truncation(200, 100)); // File grew
        assert!(!detect_file_truncation(100, 100)); // No change
    }

    #[test]
    fn test_start_offset() {
        assert_eq!(start_offset(None, 0), 0); // First pass, empty file
        assert_eq!(start_offset(None, 500), 0); // First pass reads existing content
        assert_eq!(start_offset(Some(100), 200), 100); // Grew
        assert_eq!(start_offset(Some(100), 100), 100); // Unchanged
        assert_eq!(start_offset(Some(200), 100), 0); // Truncated or rotated
    }

    fn identity_of(temp: &TempLogFile) -> FileIdentity {
        let mut file = open_file(temp.path()).unwrap();
        let size = measure_file(&mut file, temp.path()).unwrap();
        FileIdentity::read(&mut file, temp.path(), size).unwrap()
    }

    #[test]
    fn test_identity_survives_growth() {
        let temp = TempLogFile::with_content("ENTRY-A\n").unwrap();
        let before = identity_of(&temp);

        temp.append_bytes(b"ENTRY-B\n").unwrap();

        assert!(before.continued_by(&identity_of(&temp)));
        assert!(before.continued_by(&before));
    }

    #[test]
    fn test_identity_of_empty_file_matches_any_growth() {
        let temp = TempLogFile::new().unwrap();
        let empty = identity_of(&temp);
        assert!(empty.head.is_empty());

        temp.append_bytes(b"ENTRY-A\n").unwrap();
        assert!(empty.continued_by(&identity_of(&temp)));
    }

    #[test]
    fn test_identity_changes_on_same_size_rewrite() {
        let temp = TempLogFile::with_content("ENTRY-A\n").unwrap();
        let before = identity_of(&temp);

        temp.truncate().unwrap();
        temp.append_bytes(b"ENTRY-B\n").unwrap();

        assert!(!before.continued_by(&identity_of(&temp)));
    }

    #[cfg(unix)]
    #[test]
    fn test_identity_changes_on_rename_with_same_content() {
        let temp = TempLogFile::with_content("ENTRY-A\n").unwrap();
        let before = identity_of(&temp);

        temp.replace("ENTRY-A\n").unwrap();

        let after = identity_of(&temp);
        assert_eq!(before.head, after.head);
        assert!(!before.continued_by(&after));
    }

    #[test]
    fn test_identity_fingerprint_is_bounded() {
        let temp = TempLogFile::with_content(&"x".repeat(4096)).unwrap();
        assert_eq!(identity_of(&temp).head.len() as u64, FINGERPRINT_SIZE);

        // Only bytes up to the measured size are fingerprinted.
        let mut file = open_file(temp.path()).unwrap();
        let partial = FileIdentity::read(&mut file, temp.path(), 10).unwrap();
        assert_eq!(partial.head.len(), 10);
    }

    #[test]
    fn test_open_missing_file() {
        let path = PathBuf::from("/invalid/path/that/does/not/exist.log");
        match open_file(&path) {
            Err(Error::Open { path: p, source }) => {
                assert_eq!(p, path);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("Expected Error::Open, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_measure_file() {
        let temp = TempLogFile::with_content("ENTRY-A\n").unwrap();
        let mut file = open_file(temp.path()).unwrap();
        assert_eq!(measure_file(&mut file, temp.path()).unwrap(), 8);
    }

    #[test]
    fn test_measure_empty_file() {
        let temp = TempLogFile::new().unwrap();
        let mut file = open_file(temp.path()).unwrap();
        assert_eq!(measure_file(&mut file, temp.path()).unwrap(), 0);
    }

    #[test]
    fn test_feed_whole_file() {
        let temp = TempLogFile::with_content(
            "2023-01-01 10:00:00 INFO Starting application\n\
             2023-01-01 10:00:01 INFO Loading configuration\n",
        )
        .unwrap();
        let size = std::fs::metadata(temp.path()).unwrap().len();

        let entries = feed_all(&temp, 0, size, &mut LineParser::default());

        assert_eq!(
            entries,
            vec![
                "2023-01-01 10:00:00 INFO Starting application",
                "2023-01-01 10:00:01 INFO Loading configuration",
            ]
        );
    }

    #[test]
    fn test_feed_from_offset() {
        let temp = TempLogFile::with_content("ENTRY-A\nENTRY-B\n").unwrap();
        let entries = feed_all(&temp, 8, 16, &mut LineParser::default());
        assert_eq!(entries, vec!["ENTRY-B"]);
    }

    #[test]
    fn test_feed_stops_at_recorded_end() {
        let temp = TempLogFile::with_content("ENTRY-A\n").unwrap();
        let mut file = open_file(temp.path()).unwrap();
        let size = measure_file(&mut file, temp.path()).unwrap();

        // Appended after the size was taken: belongs to the next pass.
        temp.append_bytes(b"ENTRY-B\n").unwrap();

        let mut parser = LineParser::default();
        let mut entries = Vec::new();
        feed_range(&mut file, temp.path(), 0, size, &mut parser, &mut |e| entries.push(e)).unwrap();

        assert_eq!(entries, vec!["ENTRY-A"]);
        assert!(parser.pending().is_empty());
    }

    #[test]
    fn test_feed_empty_range() {
        let temp = TempLogFile::with_content("ENTRY-A\n").unwrap();
        let entries = feed_all(&temp, 8, 8, &mut LineParser::default());
        assert!(entries.is_empty());
    }
}
