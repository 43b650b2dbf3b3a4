//! Crash simulation.
//!
//! Destructive operations for tests. Only compiled under `cfg(test)` or with
//! the `fault-injection` feature.

use crate::codec::PayloadCodec;
use crate::error::WalError;
use crate::wal::{TailPolicy, Wal};

impl<C: PayloadCodec> Wal<C> {
    /// Shortens the log file to `len` bytes, as a crash mid-append would.
    ///
    /// A damaged tail is left in place, not repaired: appends are refused
    /// until `repair` is called or the log is reopened.
    pub fn truncate(&mut self, len: u64) -> Result<(), WalError> {
        self.file.truncate_to(len)?;
        self.check_tail(TailPolicy::Preserve)?;
        tracing::info!(
            "Log file '{}' truncated to {} bytes to simulate crash",
            self.path().display(),
            len
        );
        Ok(())
    }

    /// Writes bytes verbatim at the end of the log, bypassing framing and
    /// the damaged-tail guard.
    pub fn append_raw(&mut self, bytes: &[u8]) -> Result<u64, WalError> {
        self.file.append(bytes)
    }
}
