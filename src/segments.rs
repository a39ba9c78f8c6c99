//! Segment location and decompression
//!
//! A segment is one day's worth of accounting-log data. The live file is
//! preferred; when it has been rotated away, the gzip archive at the same
//! path is stream-decompressed into the run's scratch directory. Missing
//! both forms is fatal for the run.

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use flate2::read::GzDecoder;
use thiserror::Error;

use crate::window::ReportKind;

/// Suffix appended to a live segment path to form its archive path
const ARCHIVE_SUFFIX: &str = "gz";

/// Errors while locating or materializing a segment
#[derive(Debug, Error)]
pub enum SegmentError {
    /// Neither the live segment nor its archive exists
    #[error("no live or archived accounting segment for {date}")]
    Unavailable { date: NaiveDate },

    /// The archive exists but could not be decompressed
    #[error("failed to decompress {path:?}: {source}")]
    Decompress {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A ready-to-read segment for one covered date
#[derive(Debug, Clone)]
pub struct SegmentRef {
    pub date: NaiveDate,
    /// May point into scratch storage if the segment was decompressed
    pub path: PathBuf,
}

/// Finds segments under the accounting log tree, decompressing into scratch
/// storage when only the archive remains
pub struct SegmentStore {
    log_dir: PathBuf,
    scratch_dir: PathBuf,
}

impl SegmentStore {
    pub fn new(log_dir: impl Into<PathBuf>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Canonical live path for a date. Daily reports read the current
    /// rotation `saDD` directly; longer windows go through the year-month
    /// subdirectory.
    pub fn live_path(&self, kind: ReportKind, date: NaiveDate) -> PathBuf {
        let name = format!("sa{:02}", date.day());
        if kind.dated_subdir() {
            self.log_dir
                .join(format!("{:04}{:02}", date.year(), date.month()))
                .join(name)
        } else {
            self.log_dir.join(name)
        }
    }

    /// Return a readable segment for `date`, decompressing if necessary
    pub fn locate(&self, kind: ReportKind, date: NaiveDate) -> Result<SegmentRef, SegmentError> {
        let live = self.live_path(kind, date);
        if live.is_file() {
            return Ok(SegmentRef { date, path: live });
        }

        let mut archive = live.clone().into_os_string();
        archive.push(".");
        archive.push(ARCHIVE_SUFFIX);
        let archive = PathBuf::from(archive);
        if !archive.is_file() {
            return Err(SegmentError::Unavailable { date });
        }

        let scratch = self
            .scratch_dir
            .join(live.file_name().expect("segment path has a filename"));
        decompress(&archive, &scratch)?;
        Ok(SegmentRef {
            date,
            path: scratch,
        })
    }
}

/// Stream-copy a gzip archive to a plain file
fn decompress(archive: &Path, target: &Path) -> Result<(), SegmentError> {
    tracing::debug!("Decompressing {:?} to {:?}", archive, target);
    let mut reader = GzDecoder::new(File::open(archive)?);
    let mut writer = File::create(target)?;
    std::io::copy(&mut reader, &mut writer).map_err(|source| SegmentError::Decompress {
        path: archive.to_path_buf(),
        source,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn write_gz(path: &Path, contents: &[u8]) {
        let mut encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
        encoder.write_all(contents).unwrap();
        encoder.finish().unwrap();
    }

    #[test]
    fn test_daily_path_has_no_subdirectory() {
        let store = SegmentStore::new("/var/log/sysstat", "/tmp/scratch");
        assert_eq!(
            store.live_path(ReportKind::Daily, date(2024, 3, 7)),
            PathBuf::from("/var/log/sysstat/sa07")
        );
    }

    #[test]
    fn test_monthly_path_uses_year_month_subdirectory() {
        let store = SegmentStore::new("/var/log/sysstat", "/tmp/scratch");
        assert_eq!(
            store.live_path(ReportKind::Monthly, date(2024, 3, 7)),
            PathBuf::from("/var/log/sysstat/202403/sa07")
        );
    }

    #[test]
    fn test_live_segment_returned_unchanged() {
        let log_dir = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let live = log_dir.path().join("sa14");
        std::fs::write(&live, b"live data").unwrap();

        let store = SegmentStore::new(log_dir.path(), scratch.path());
        let segment = store.locate(ReportKind::Daily, date(2024, 3, 14)).unwrap();
        assert_eq!(segment.path, live);
    }

    #[test]
    fn test_archived_segment_decompressed_into_scratch() {
        let log_dir = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let month_dir = log_dir.path().join("202403");
        std::fs::create_dir(&month_dir).unwrap();
        write_gz(&month_dir.join("sa14.gz"), b"archived segment bytes");

        let store = SegmentStore::new(log_dir.path(), scratch.path());
        let segment = store.locate(ReportKind::Weekly, date(2024, 3, 14)).unwrap();

        assert_eq!(segment.path, scratch.path().join("sa14"));
        let restored = std::fs::read(&segment.path).unwrap();
        assert_eq!(restored, b"archived segment bytes");
    }

    #[test]
    fn test_missing_segment_is_unavailable() {
        let log_dir = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();

        let store = SegmentStore::new(log_dir.path(), scratch.path());
        let err = store
            .locate(ReportKind::Weekly, date(2024, 3, 14))
            .unwrap_err();
        assert!(matches!(err, SegmentError::Unavailable { .. }));
    }

    #[test]
    fn test_corrupt_archive_is_a_decompress_error() {
        let log_dir = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        std::fs::write(log_dir.path().join("sa14.gz"), b"not gzip at all").unwrap();

        let store = SegmentStore::new(log_dir.path(), scratch.path());
        let err = store
            .locate(ReportKind::Daily, date(2024, 3, 14))
            .unwrap_err();
        assert!(matches!(err, SegmentError::Decompress { .. }));
    }
}
