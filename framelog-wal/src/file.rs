//! Log file handle.
//!
//! A `LogFile` owns the single open handle to the WAL file. Every append is
//! written at end-of-file and synced before returning. Dropping the value
//! releases the handle.

use crate::error::WalError;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// The WAL file, opened for append and read.
#[derive(Debug)]
pub struct LogFile {
    path: PathBuf,
    file: File,
    len: u64,
}

impl LogFile {
    /// Opens the log file, creating it if absent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WalError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)
            .map_err(|source| WalError::Open {
                path: path.clone(),
                source,
            })?;

        let len = file.metadata()?.len();

        Ok(Self { path, file, len })
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current size of the file in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns whether the file holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends bytes at end-of-file and forces them to stable storage.
    ///
    /// Returns the offset the bytes were written at.
    pub fn append(&mut self, bytes: &[u8]) -> Result<u64, WalError> {
        let offset = self.len;

        self.file.write_all(bytes)?;
        self.file.flush()?;
        self.file.sync_data()?;
        self.len += bytes.len() as u64;

        Ok(offset)
    }

    /// Returns a buffered reader positioned at `offset`.
    pub fn reader_from(&mut self, offset: u64) -> Result<BufReader<&File>, WalError> {
        // Appends ignore the cursor (O_APPEND), so moving it for reads is safe.
        self.file.seek(SeekFrom::Start(offset))?;
        Ok(BufReader::new(&self.file))
    }

    /// Shortens the file to exactly `len` bytes and reopens the handle.
    ///
    /// On error the handle and the recorded length are left as they were, or
    /// both describe the shortened file.
    pub fn truncate_to(&mut self, len: u64) -> Result<(), WalError> {
        let reopened = OpenOptions::new().read(true).append(true).open(&self.path)?;

        let writer = OpenOptions::new().write(true).open(&self.path)?;
        writer.set_len(len)?;
        self.file = reopened;
        self.len = len;
        writer.sync_all()?;

        Ok(())
    }

    /// Syncs file data and metadata to disk.
    pub fn sync(&mut self) -> Result<(), WalError> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Deletes a log file. A missing file is not an error.
    pub fn delete(path: impl AsRef<Path>) -> Result<(), WalError> {
        match std::fs::remove_file(path.as_ref()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.wal");
        assert!(!path.exists());

        let file = LogFile::open(&path).unwrap();
        assert!(path.exists());
        assert!(file.is_empty());
        assert_eq!(file.path(), path);
    }

    #[test]
    fn test_open_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing-dir").join("log.wal");

        let result = LogFile::open(&path);
        assert!(matches!(result, Err(WalError::Open { .. })));
    }

    #[test]
    fn test_append_offsets() {
        let dir = TempDir::new().unwrap();
        let mut file = LogFile::open(dir.path().join("log.wal")).unwrap();

        assert_eq!(file.append(b"hello").unwrap(), 0);
        assert_eq!(file.append(b"world").unwrap(), 5);
        assert_eq!(file.len(), 10);
    }

    #[test]
    fn test_reopen_keeps_length() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.wal");
        {
            let mut file = LogFile::open(&path).unwrap();
            file.append(b"0123456789").unwrap();
        }

        let mut file = LogFile::open(&path).unwrap();
        assert_eq!(file.len(), 10);

        // Appends continue at the end.
        assert_eq!(file.append(b"ab").unwrap(), 10);
        assert_eq!(std::fs::read(&path).unwrap(), b"0123456789ab");
    }

    #[test]
    fn test_reader_from_offset() {
        let dir = TempDir::new().unwrap();
        let mut file = LogFile::open(dir.path().join("log.wal")).unwrap();
        file.append(b"abcdef").unwrap();

        let mut out = String::new();
        file.reader_from(2).unwrap().read_to_string(&mut out).unwrap();
        assert_eq!(out, "cdef");

        // Reading does not disturb appends.
        file.append(b"gh").unwrap();
        let mut out = String::new();
        file.reader_from(0).unwrap().read_to_string(&mut out).unwrap();
        assert_eq!(out, "abcdefgh");
    }

    #[test]
    fn test_truncate_to() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.wal");
        let mut file = LogFile::open(&path).unwrap();
        file.append(b"abcdef").unwrap();

        file.truncate_to(4).unwrap();
        assert_eq!(file.len(), 4);
        assert_eq!(std::fs::read(&path).unwrap(), b"abcd");

        file.append(b"XY").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"abcdXY");
    }

    #[test]
    fn test_failed_truncate_keeps_length_consistent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.wal");
        let mut file = LogFile::open(&path).unwrap();
        file.append(b"abcdef").unwrap();

        std::fs::remove_file(&path).unwrap();
        assert!(file.truncate_to(2).is_err());
        assert_eq!(file.len(), 6);
        assert_eq!(file.append(b"g").unwrap(), 6);
    }

    #[test]
    fn test_delete() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.wal");
        drop(LogFile::open(&path).unwrap());

        LogFile::delete(&path).unwrap();
        assert!(!path.exists());

        // Second delete is a no-op.
        LogFile::delete(&path).unwrap();
    }
}
