//! # framelog-wal
//!
//! Single-file write-ahead log for framelog.
//!
//! This crate provides a durable, append-only log with:
//! - Per-record CRC32 checksums for corruption detection
//! - One fsync per append (no batching)
//! - Microsecond timestamps assigned at append time
//! - Recovery of the longest valid prefix after a crash
//! - Pluggable payload codecs (raw bytes, JSON)

pub mod clock;
pub mod codec;
pub mod error;
#[cfg(any(test, feature = "fault-injection"))]
pub mod fault;
pub mod file;
pub mod frame;
pub mod recovery;
pub mod wal;

pub use codec::{JsonCodec, PayloadCodec, RawCodec};
pub use error::WalError;
pub use file::LogFile;
pub use frame::{Frame, FrameCodec};
pub use recovery::{RecoveryScanner, RecoveryStatus, ScanOutcome, StopReason};
pub use wal::{Record, Recovery, Wal, WalConfig, WalStats};

/// Default maximum payload size (16 MiB).
pub const DEFAULT_MAX_RECORD_SIZE: usize = 16 * 1024 * 1024;
