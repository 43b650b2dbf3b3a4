//! WAL error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during WAL operations.
#[derive(Debug, Error)]
pub enum WalError {
    #[error("failed to open log file '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame checksum mismatch (expected {expected:#x}, got {actual:#x})")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("invalid frame: {reason}")]
    InvalidFrame { reason: String },

    #[error("record too large: {size} bytes (max {max})")]
    RecordTooLarge { size: usize, max: usize },

    #[error("payload encoding failed: {0}")]
    Encode(String),

    #[error("log has a damaged tail ({valid_len} of {file_len} bytes valid); reopen with repair enabled")]
    DamagedTail { valid_len: u64, file_len: u64 },
}

impl WalError {
    /// Returns whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WalError::Io(_))
    }

    /// Returns whether this error indicates on-disk corruption.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            WalError::ChecksumMismatch { .. } | WalError::InvalidFrame { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let io = WalError::Io(std::io::Error::other("disk full"));
        assert!(io.is_retryable());
        assert!(!io.is_corruption());

        let crc = WalError::ChecksumMismatch {
            expected: 1,
            actual: 2,
        };
        assert!(crc.is_corruption());
        assert!(!crc.is_retryable());
    }

    #[test]
    fn test_open_error_names_path() {
        let err = WalError::Open {
            path: PathBuf::from("/nope/log.wal"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.to_string().contains("/nope/log.wal"));
    }
}
