//! WAL recovery scanning.
//!
//! Frames are parsed strictly in order from offset 0. Scanning stops at the
//! first anomaly and returns everything before it:
//! - Truncated length prefix or frame body (a crash mid-append)
//! - Length prefix too short to hold the trailer (corruption)
//! - Checksum mismatch (corruption)
//!
//! There is no attempt to resynchronize past a bad frame: a damaged length
//! field would misalign every read after it.
//!
//! The scanner knows nothing about the configured record size limit. That
//! limit applies to new appends; frames already on disk are judged by the
//! format alone.

use crate::error::WalError;
use crate::frame::{Frame, FrameCodec, LENGTH_PREFIX_SIZE};
use bytes::Bytes;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

/// Why a scan stopped before end-of-file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Fewer than four bytes remained for the length prefix.
    TruncatedLength { available: usize },
    /// The file ended inside the frame body.
    TruncatedFrame { declared: u32, available: u64 },
    /// The length prefix is out of range.
    InvalidLength { declared: u32 },
    /// The frame body could not be split into payload and trailer.
    MalformedFrame { reason: String },
    /// The frame is complete but its checksum does not match.
    ChecksumMismatch { expected: u32, actual: u32 },
    /// The frame is valid but the payload codec rejected it.
    Undecodable { error: String },
}

impl StopReason {
    /// Returns whether this stop indicates corruption rather than an
    /// interrupted append.
    pub fn is_corruption(&self) -> bool {
        !matches!(
            self,
            StopReason::TruncatedLength { .. } | StopReason::TruncatedFrame { .. }
        )
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::TruncatedLength { available } => {
                write!(f, "truncated length prefix ({} of 4 bytes)", available)
            }
            StopReason::TruncatedFrame {
                declared,
                available,
            } => write!(
                f,
                "truncated frame ({} of {} bytes)",
                available, declared
            ),
            StopReason::InvalidLength { declared } => {
                write!(f, "invalid length prefix {}", declared)
            }
            StopReason::MalformedFrame { reason } => write!(f, "malformed frame: {}", reason),
            StopReason::ChecksumMismatch { expected, actual } => write!(
                f,
                "checksum mismatch (expected {:#x}, got {:#x})",
                expected, actual
            ),
            StopReason::Undecodable { error } => write!(f, "undecodable payload: {}", error),
        }
    }
}

/// Outcome of reading a log to its end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryStatus {
    /// Every byte of the file belonged to a valid frame.
    Complete,
    /// Reading stopped at `offset`; bytes from there on were not used.
    Partial { offset: u64, reason: StopReason },
}

impl RecoveryStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, RecoveryStatus::Complete)
    }

    /// Returns whether the log contains corrupted data.
    pub fn is_corruption(&self) -> bool {
        match self {
            RecoveryStatus::Complete => false,
            RecoveryStatus::Partial { reason, .. } => reason.is_corruption(),
        }
    }
}

impl fmt::Display for RecoveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryStatus::Complete => f.write_str("complete"),
            RecoveryStatus::Partial { offset, reason } => {
                write!(f, "partial: {} at offset {}", reason, offset)
            }
        }
    }
}

/// Result of a recovery scan.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// Valid frames with their file offsets, in file order.
    pub frames: Vec<(u64, Frame)>,
    /// Why the scan stopped.
    pub status: RecoveryStatus,
    /// Byte offset just past the last valid frame.
    pub valid_len: u64,
}

/// Sequential frame scanner.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecoveryScanner;

impl RecoveryScanner {
    /// Scans frames from the start of `reader` until end-of-file or the
    /// first anomaly. Only I/O failures are returned as errors.
    pub fn scan<R: Read>(&self, mut reader: R) -> Result<ScanOutcome, WalError> {
        let mut frames = Vec::new();
        let mut offset = 0u64;

        let status = loop {
            let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
            let n = read_fully(&mut reader, &mut prefix)?;
            if n == 0 {
                break RecoveryStatus::Complete;
            }
            if n < LENGTH_PREFIX_SIZE {
                break RecoveryStatus::Partial {
                    offset,
                    reason: StopReason::TruncatedLength { available: n },
                };
            }

            let declared = u32::from_le_bytes(prefix);
            let body_len = match FrameCodec::body_len(declared) {
                Ok(len) => len,
                Err(_) => {
                    break RecoveryStatus::Partial {
                        offset,
                        reason: StopReason::InvalidLength { declared },
                    }
                }
            };

            // `take` bounds the read; the buffer only grows with real data.
            let mut body = Vec::new();
            reader
                .by_ref()
                .take(body_len as u64)
                .read_to_end(&mut body)?;
            if body.len() < body_len {
                break RecoveryStatus::Partial {
                    offset,
                    reason: StopReason::TruncatedFrame {
                        declared,
                        available: body.len() as u64,
                    },
                };
            }

            match FrameCodec::decode(Bytes::from(body)) {
                Ok(frame) => {
                    frames.push((offset, frame));
                    offset += (LENGTH_PREFIX_SIZE + body_len) as u64;
                }
                Err(WalError::ChecksumMismatch { expected, actual }) => {
                    break RecoveryStatus::Partial {
                        offset,
                        reason: StopReason::ChecksumMismatch { expected, actual },
                    };
                }
                Err(WalError::InvalidFrame { reason }) => {
                    break RecoveryStatus::Partial {
                        offset,
                        reason: StopReason::MalformedFrame { reason },
                    };
                }
                Err(e) => return Err(e),
            }
        };

        match &status {
            RecoveryStatus::Complete => {}
            RecoveryStatus::Partial { offset, reason } if reason.is_corruption() => {
                tracing::warn!(
                    "Log corrupted at offset {}: {}; {} frames before it are valid",
                    offset,
                    reason,
                    frames.len()
                );
            }
            RecoveryStatus::Partial { offset, reason } => {
                tracing::info!(
                    "Log ends with an incomplete frame at offset {}: {}",
                    offset,
                    reason
                );
            }
        }

        Ok(ScanOutcome {
            frames,
            status,
            valid_len: offset,
        })
    }
}

/// Reads until `buf` is full or end-of-file; returns the bytes read.
fn read_fully<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Scans a log file read-only, without opening it for writing or repairing
/// anything.
pub fn verify_log(path: impl AsRef<Path>) -> Result<ScanOutcome, WalError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| WalError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    RecoveryScanner.scan(BufReader::new(file))
}
