//! Append-only rectangle log.
//!
//! The server only ever needs two things from persistence: append a batch of
//! matches and read everything back in the order it was written. Any backend
//! that keeps that ordering can implement [`RectangleLog`].

use crate::error::{StorageError, StorageResult};
use crate::geometry::TaggedRectangle;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::{
    fs::{self as tokio_fs, OpenOptions},
    io::AsyncWriteExt,
    sync::{Mutex, RwLock},
};
use tracing::{debug, info, instrument};

const DELIMITER: char = ',';
const FIELD_COUNT: usize = 5;

/// Rectangle log trait
#[async_trait]
pub trait RectangleLog: Send + Sync + std::fmt::Debug {
    /// Append entries in order. An empty slice leaves the log untouched.
    ///
    /// Entries are not written atomically as a batch: if a write fails
    /// part way, the entries before it stay persisted.
    async fn append(&self, entries: &[TaggedRectangle]) -> StorageResult<()>;

    /// Read every entry in the order it was appended.
    ///
    /// Returns `Ok(None)` if nothing has ever been written, so callers can
    /// report "no data yet" rather than an error.
    async fn read_all(&self) -> StorageResult<Option<Vec<TaggedRectangle>>>;
}

/// Rectangle log stored as a comma-separated file, one record per line:
/// `x,y,width,height,captured_at`.
#[derive(Debug)]
pub struct CsvRectangleLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvRectangleLog {
    /// Create a log backed by `path`. The file is only created on the first
    /// non-empty append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RectangleLog for CsvRectangleLog {
    #[instrument(skip(self, entries), fields(path = %self.path.display(), count = entries.len()))]
    async fn append(&self, entries: &[TaggedRectangle]) -> StorageResult<()> {
        if entries.is_empty() {
            debug!("Nothing to append");
            return Ok(());
        }
        check_timestamps(entries)?;

        // Keeps the records of one batch contiguous within this process.
        let _guard = self.write_lock.lock().await;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| StorageError::FileOpen(self.path.clone(), e))?;

        for entry in entries {
            let record = encode_record(entry);
            file.write_all(record.as_bytes())
                .await
                .map_err(|e| StorageError::FileWrite(self.path.clone(), e))?;
        }

        file.flush()
            .await
            .map_err(|e| StorageError::FileFlush(self.path.clone(), e))?;

        info!("Appended {} rectangle(s)", entries.len());
        Ok(())
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn read_all(&self) -> StorageResult<Option<Vec<TaggedRectangle>>> {
        let contents = match tokio_fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Data file not found");
                return Ok(None);
            }
            Err(e) => return Err(StorageError::FileRead(self.path.clone(), e)),
        };

        let mut records = Vec::new();
        for (index, line) in contents.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            let record = decode_record(line).map_err(|reason| StorageError::MalformedRecord {
                path: self.path.clone(),
                line: index + 1,
                reason,
            })?;
            records.push(record);
        }

        debug!("Read {} rectangle(s)", records.len());
        Ok(Some(records))
    }
}

/// In-process rectangle log.
///
/// Behaves like [`CsvRectangleLog`] without touching the filesystem: it
/// reports "no data" until the first non-empty append.
#[derive(Debug, Default)]
pub struct MemoryRectangleLog {
    entries: RwLock<Option<Vec<TaggedRectangle>>>,
}

impl MemoryRectangleLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RectangleLog for MemoryRectangleLog {
    async fn append(&self, entries: &[TaggedRectangle]) -> StorageResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        check_timestamps(entries)?;

        self.entries
            .write()
            .await
            .get_or_insert_with(Vec::new)
            .extend_from_slice(entries);
        Ok(())
    }

    async fn read_all(&self) -> StorageResult<Option<Vec<TaggedRectangle>>> {
        Ok(self.entries.read().await.clone())
    }
}

fn check_timestamps(entries: &[TaggedRectangle]) -> StorageResult<()> {
    match entries
        .iter()
        .find(|entry| entry.captured_at.contains([DELIMITER, '\n', '\r']))
    {
        Some(entry) => Err(StorageError::InvalidTimestamp(entry.captured_at.clone())),
        None => Ok(()),
    }
}

/// Encode one entry as a newline-terminated record.
fn encode_record(entry: &TaggedRectangle) -> String {
    format!(
        "{x}{d}{y}{d}{w}{d}{h}{d}{t}\n",
        x = entry.x,
        y = entry.y,
        w = entry.width,
        h = entry.height,
        t = entry.captured_at,
        d = DELIMITER,
    )
}

/// Decode one record (without its line terminator).
fn decode_record(line: &str) -> Result<TaggedRectangle, String> {
    let fields: Vec<&str> = line.split(DELIMITER).collect();
    if fields.len() != FIELD_COUNT {
        return Err(format!(
            "expected {} fields, found {}",
            FIELD_COUNT,
            fields.len()
        ));
    }

    let number = |name: &str, value: &str| {
        value
            .parse::<i64>()
            .map_err(|e| format!("invalid {} {:?}: {}", name, value, e))
    };

    Ok(TaggedRectangle {
        x: number("x", fields[0])?,
        y: number("y", fields[1])?,
        width: number("width", fields[2])?,
        height: number("height", fields[3])?,
        captured_at: fields[4].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rectangle;
    use tempfile::TempDir;

    fn sample() -> Vec<TaggedRectangle> {
        vec![
            Rectangle::new(0, 0, 5, 5).tagged("2024-01-02 03:04:05"),
            Rectangle::new(-3, 7, 0, 12).tagged("2024-01-02 03:04:05"),
            Rectangle::new(10, 0, -5, 5).tagged("2024-01-02 03:04:06"),
            Rectangle::new(i64::MIN, i64::MAX, i64::MAX, i64::MIN).tagged("2024-01-02 03:04:07"),
        ]
    }

    fn csv_log(dir: &TempDir) -> CsvRectangleLog {
        CsvRectangleLog::new(dir.path().join("data.csv"))
    }

    #[tokio::test]
    async fn test_missing_file_reads_as_no_data() {
        let dir = TempDir::new().unwrap();
        let log = csv_log(&dir);

        assert_eq!(log.read_all().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let log = csv_log(&dir);

        log.append(&sample()).await.unwrap();

        assert_eq!(log.read_all().await.unwrap(), Some(sample()));
    }

    #[tokio::test]
    async fn test_file_layout() {
        let dir = TempDir::new().unwrap();
        let log = csv_log(&dir);

        log.append(&sample()[..2]).await.unwrap();

        let contents = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(
            contents,
            "0,0,5,5,2024-01-02 03:04:05\n-3,7,0,12,2024-01-02 03:04:05\n"
        );
    }

    #[tokio::test]
    async fn test_appends_accumulate_in_order() {
        let dir = TempDir::new().unwrap();
        let log = csv_log(&dir);
        let entries = sample();

        log.append(&entries[..1]).await.unwrap();
        log.append(&entries[1..]).await.unwrap();

        assert_eq!(log.read_all().await.unwrap(), Some(entries));
    }

    #[tokio::test]
    async fn test_read_all_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let log = csv_log(&dir);
        log.append(&sample()).await.unwrap();

        let first = log.read_all().await.unwrap();
        let second = log.read_all().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_empty_append_leaves_store_unchanged() {
        let dir = TempDir::new().unwrap();
        let log = csv_log(&dir);

        log.append(&[]).await.unwrap();
        assert!(!log.path().exists());

        log.append(&sample()).await.unwrap();
        let before = std::fs::read_to_string(log.path()).unwrap();
        log.append(&[]).await.unwrap();
        let after = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_blank_and_crlf_lines() {
        let dir = TempDir::new().unwrap();
        let log = csv_log(&dir);
        std::fs::write(log.path(), "1,2,3,4,2024-01-01 00:00:00\r\n\n5,6,7,8,later\n").unwrap();

        let records = log.read_all().await.unwrap().unwrap();
        assert_eq!(
            records,
            vec![
                Rectangle::new(1, 2, 3, 4).tagged("2024-01-01 00:00:00"),
                Rectangle::new(5, 6, 7, 8).tagged("later"),
            ]
        );
    }

    #[tokio::test]
    async fn test_existing_empty_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let log = csv_log(&dir);
        std::fs::write(log.path(), "").unwrap();

        assert_eq!(log.read_all().await.unwrap(), Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_non_numeric_field_fails_read() {
        let dir = TempDir::new().unwrap();
        let log = csv_log(&dir);
        std::fs::write(log.path(), "1,2,3,4,ok\n1,two,3,4,bad\n").unwrap();

        match log.read_all().await {
            Err(StorageError::MalformedRecord { line, reason, .. }) => {
                assert_eq!(line, 2);
                assert!(reason.contains("invalid y"), "{reason}");
            }
            other => panic!("expected malformed record, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_wrong_field_count_fails_read() {
        let dir = TempDir::new().unwrap();
        let log = csv_log(&dir);
        std::fs::write(log.path(), "1,2,3,4\n").unwrap();

        assert!(matches!(
            log.read_all().await,
            Err(StorageError::MalformedRecord { line: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_timestamp_with_delimiter_is_rejected() {
        let dir = TempDir::new().unwrap();
        let log = csv_log(&dir);
        let entries = vec![Rectangle::new(0, 0, 1, 1).tagged("2024,01")];

        assert!(matches!(
            log.append(&entries).await,
            Err(StorageError::InvalidTimestamp(_))
        ));
        assert!(!log.path().exists());
    }

    #[tokio::test]
    async fn test_append_to_unwritable_location() {
        let dir = TempDir::new().unwrap();
        let log = CsvRectangleLog::new(dir.path().join("missing").join("data.csv"));

        assert!(matches!(
            log.append(&sample()).await,
            Err(StorageError::FileOpen(_, _))
        ));
    }

    #[tokio::test]
    async fn test_memory_log() {
        let log = MemoryRectangleLog::new();
        assert_eq!(log.read_all().await.unwrap(), None);

        log.append(&[]).await.unwrap();
        assert_eq!(log.read_all().await.unwrap(), None);

        let entries = sample();
        log.append(&entries[..2]).await.unwrap();
        log.append(&entries[2..]).await.unwrap();
        assert_eq!(log.read_all().await.unwrap(), Some(entries));
    }

    #[test]
    fn test_decode_rejects_overflow() {
        let err = decode_record("99999999999999999999,0,0,0,t").unwrap_err();
        assert!(err.contains("invalid x"), "{err}");
    }
}
