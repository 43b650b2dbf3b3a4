//! Main WAL implementation.

use crate::clock::Clock;
use crate::codec::{PayloadCodec, RawCodec};
use crate::error::WalError;
use crate::file::LogFile;
use crate::frame::FrameCodec;
use crate::recovery::{RecoveryScanner, RecoveryStatus, ScanOutcome, StopReason};
use crate::DEFAULT_MAX_RECORD_SIZE;
use std::path::{Path, PathBuf};

/// WAL configuration.
#[derive(Debug, Clone)]
pub struct WalConfig {
    /// Log file path.
    pub path: PathBuf,
    /// Maximum payload size in bytes.
    pub max_record_size: usize,
    /// Truncate an incomplete final frame on open. Corruption is never
    /// repaired automatically.
    pub repair_on_open: bool,
}

impl WalConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_record_size: DEFAULT_MAX_RECORD_SIZE,
            repair_on_open: true,
        }
    }

    pub fn with_max_record_size(mut self, size: usize) -> Self {
        self.max_record_size = size;
        self
    }

    pub fn with_repair_on_open(mut self, repair: bool) -> Self {
        self.repair_on_open = repair;
        self
    }
}

/// A recovered record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record<T> {
    pub value: T,
    /// Microseconds since the Unix epoch, assigned at append time.
    pub timestamp: u64,
}

/// Records read back from the log, with the reason reading stopped.
#[derive(Debug, Clone)]
pub struct Recovery<T> {
    pub records: Vec<Record<T>>,
    pub status: RecoveryStatus,
}

impl<T> Recovery<T> {
    pub fn is_complete(&self) -> bool {
        self.status.is_complete()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drops timestamps and status, keeping values in log order.
    pub fn into_values(self) -> Vec<T> {
        self.records.into_iter().map(|r| r.value).collect()
    }
}

/// I/O statistics for the WAL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalStats {
    /// Records appended since open.
    pub appends: u64,
    /// Total bytes written, framing included.
    pub bytes_written: u64,
    /// Total fsync operations.
    pub fsyncs: u64,
    /// Calls to `recover`.
    pub recoveries: u64,
    /// Recoveries that stopped before end-of-file.
    pub damaged_recoveries: u64,
}

/// Write-Ahead Log over a single file.
pub struct Wal<C: PayloadCodec = RawCodec> {
    config: WalConfig,
    pub(crate) file: LogFile,
    codec: C,
    scanner: RecoveryScanner,
    clock: Clock,
    /// End of the valid prefix when a damaged tail is being preserved.
    damaged_tail: Option<u64>,
    /// What the scan at open found, before any repair.
    open_status: RecoveryStatus,
    stats: WalStats,
}

/// How `check_tail` treats bytes past the valid prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TailPolicy {
    /// Keep them and refuse appends.
    Preserve,
    /// Truncate an interrupted append; keep corruption.
    RepairTruncation,
    /// Truncate whatever follows the valid prefix.
    RepairAll,
}

impl<C: PayloadCodec> Wal<C> {
    /// Opens or creates the log at the configured path.
    ///
    /// The existing file is scanned once to seed the timestamp clock and to
    /// find any damaged tail left by a crash. An incomplete final frame is
    /// truncated when `repair_on_open` is set; corrupted bytes are always
    /// kept, and appends are refused until `repair` is called. The scan
    /// result is available from `open_status`.
    pub fn open(config: WalConfig, codec: C) -> Result<Self, WalError> {
        let file = LogFile::open(&config.path)?;
        let policy = if config.repair_on_open {
            TailPolicy::RepairTruncation
        } else {
            TailPolicy::Preserve
        };

        let mut wal = Self {
            config,
            file,
            codec,
            scanner: RecoveryScanner,
            clock: Clock::default(),
            damaged_tail: None,
            open_status: RecoveryStatus::Complete,
            stats: WalStats::default(),
        };

        let outcome = wal.check_tail(policy)?;
        let last_timestamp = outcome
            .frames
            .last()
            .map(|(_, frame)| frame.timestamp)
            .unwrap_or(0);
        wal.clock = Clock::starting_at(last_timestamp);
        wal.open_status = outcome.status;

        tracing::info!(
            "WAL opened: {} ({} records, {} bytes)",
            wal.path().display(),
            outcome.frames.len(),
            wal.file.len()
        );
        if wal.open_status.is_corruption() {
            tracing::error!(
                "WAL {} is corrupted ({}); appends disabled until repaired",
                wal.path().display(),
                wal.open_status
            );
        }

        Ok(wal)
    }

    /// Scans the file and handles a damaged tail, either truncating it or
    /// remembering it so appends are refused.
    pub(crate) fn check_tail(&mut self, policy: TailPolicy) -> Result<ScanOutcome, WalError> {
        let outcome = self.scanner.scan(self.file.reader_from(0)?)?;
        let file_len = self.file.len();
        self.damaged_tail = None;

        if outcome.valid_len < file_len {
            let repair = match policy {
                TailPolicy::Preserve => false,
                TailPolicy::RepairTruncation => !outcome.status.is_corruption(),
                TailPolicy::RepairAll => true,
            };
            if repair {
                self.file.truncate_to(outcome.valid_len)?;
                tracing::warn!(
                    "Repaired {}: discarded {} bytes after offset {} ({})",
                    self.file.path().display(),
                    file_len - outcome.valid_len,
                    outcome.valid_len,
                    outcome.status
                );
            } else {
                tracing::warn!(
                    "Preserving damaged tail of {} ({} of {} bytes valid); appends disabled",
                    self.file.path().display(),
                    outcome.valid_len,
                    file_len
                );
                self.damaged_tail = Some(outcome.valid_len);
            }
        }

        Ok(outcome)
    }

    /// Appends a value to the log and returns the timestamp assigned to it.
    ///
    /// Returns only after the frame has been synced to stable storage.
    pub fn append(&mut self, value: &C::Value) -> Result<u64, WalError> {
        if let Some(valid_len) = self.damaged_tail {
            return Err(WalError::DamagedTail {
                valid_len,
                file_len: self.file.len(),
            });
        }

        let payload = self
            .codec
            .encode(value)
            .map_err(|e| WalError::Encode(e.to_string()))?;
        if payload.len() > self.config.max_record_size {
            return Err(WalError::RecordTooLarge {
                size: payload.len(),
                max: self.config.max_record_size,
            });
        }

        let timestamp = self.clock.now();
        let frame = FrameCodec::encode(&payload, timestamp)?;

        let before = self.file.len();
        let offset = match self.file.append(&frame) {
            Ok(offset) => offset,
            Err(e) => {
                self.roll_back(before);
                return Err(e);
            }
        };

        self.stats.appends += 1;
        self.stats.bytes_written += frame.len() as u64;
        self.stats.fsyncs += 1;

        tracing::debug!(
            "Appended {} byte record at offset {} (ts={})",
            payload.len(),
            offset,
            timestamp
        );

        Ok(timestamp)
    }

    /// Removes whatever a failed append left behind.
    fn roll_back(&mut self, len: u64) {
        if let Err(e) = self.file.truncate_to(len) {
            tracing::error!(
                "Failed to roll back partial append to offset {}: {}",
                len,
                e
            );
            self.damaged_tail = Some(len);
        }
    }

    /// Reads every valid record from the start of the log.
    ///
    /// Reading stops at the first truncated, corrupted or undecodable frame;
    /// the returned status says which. The file is not modified.
    pub fn recover(&mut self) -> Result<Recovery<C::Value>, WalError> {
        let outcome = self.scanner.scan(self.file.reader_from(0)?)?;

        let mut status = outcome.status;
        let mut records = Vec::with_capacity(outcome.frames.len());
        for (offset, frame) in outcome.frames {
            match self.codec.decode(&frame.payload) {
                Ok(value) => records.push(Record {
                    value,
                    timestamp: frame.timestamp,
                }),
                Err(e) => {
                    tracing::warn!(
                        "Undecodable payload at offset {}: {}; stopping recovery with {} records",
                        offset,
                        e,
                        records.len()
                    );
                    status = RecoveryStatus::Partial {
                        offset,
                        reason: StopReason::Undecodable {
                            error: e.to_string(),
                        },
                    };
                    break;
                }
            }
        }

        self.stats.recoveries += 1;
        if !status.is_complete() {
            self.stats.damaged_recoveries += 1;
        }

        tracing::debug!("Recovered {} records ({})", records.len(), status);

        Ok(Recovery { records, status })
    }

    /// Truncates a damaged tail back to the last valid frame, corrupted
    /// frames included.
    ///
    /// Returns the number of bytes discarded.
    pub fn repair(&mut self) -> Result<u64, WalError> {
        let before = self.file.len();
        let outcome = self.check_tail(TailPolicy::RepairAll)?;
        Ok(before - outcome.valid_len)
    }

    /// Syncs and closes the log.
    pub fn close(mut self) -> Result<(), WalError> {
        self.file.sync()?;
        tracing::info!("WAL closed: {}", self.path().display());
        Ok(())
    }

    /// Closes the log and deletes its file.
    pub fn remove(self) -> Result<(), WalError> {
        let path = self.config.path.clone();
        drop(self);
        LogFile::delete(&path)?;
        tracing::info!("WAL removed: {}", path.display());
        Ok(())
    }

    /// Returns the log file path.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Returns the size of the log file in bytes.
    pub fn len(&self) -> u64 {
        self.file.len()
    }

    /// Returns whether the log file is empty.
    pub fn is_empty(&self) -> bool {
        self.file.is_empty()
    }

    /// Returns the timestamp of the most recent record.
    pub fn last_timestamp(&self) -> u64 {
        self.clock.last()
    }

    /// Returns what the scan at open found, before any repair.
    ///
    /// `Partial` with a truncation reason after a default open means an
    /// interrupted append was discarded. A corruption reason means the bytes
    /// are still on disk.
    pub fn open_status(&self) -> &RecoveryStatus {
        &self.open_status
    }

    /// Returns whether appends are refused because of a preserved damaged tail.
    pub fn has_damaged_tail(&self) -> bool {
        self.damaged_tail.is_some()
    }

    /// Returns the current I/O statistics.
    pub fn stats(&self) -> WalStats {
        self.stats
    }

    pub fn config(&self) -> &WalConfig {
        &self.config
    }
}
