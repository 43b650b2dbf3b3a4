//! WAL frame format.
//!
//! Each record is stored as one frame with the following on-disk layout
//! (all integers little-endian):
//!
//! ```text
//! +----------+---------------------+-------------+----------+
//! | length   | payload             | timestamp   | crc32    |
//! | 4 bytes  | length - 12 bytes   | 8 bytes     | 4 bytes  |
//! +----------+---------------------+-------------+----------+
//! ```
//!
//! `length` counts every byte after itself. The checksum is IEEE CRC-32 over
//! `payload || timestamp`; the length prefix is not covered.

use crate::error::WalError;
use bytes::{BufMut, Bytes, BytesMut};

/// Size of the length prefix.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Size of the timestamp field.
pub const TIMESTAMP_SIZE: usize = 8;

/// Size of the checksum field.
pub const CHECKSUM_SIZE: usize = 4;

/// Bytes following the payload (timestamp + checksum).
pub const TRAILER_SIZE: usize = TIMESTAMP_SIZE + CHECKSUM_SIZE;

/// Total framing bytes added to every payload.
pub const FRAME_OVERHEAD: usize = LENGTH_PREFIX_SIZE + TRAILER_SIZE;

/// Largest payload the 4-byte length prefix can describe.
pub const MAX_FRAMEABLE_PAYLOAD: usize = u32::MAX as usize - TRAILER_SIZE;

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub payload: Bytes,
    pub timestamp: u64,
}

/// Stateless encoder/decoder for WAL frames.
pub struct FrameCodec;

impl FrameCodec {
    /// Encodes a payload and timestamp into a complete frame, length prefix
    /// included.
    pub fn encode(payload: &[u8], timestamp: u64) -> Result<BytesMut, WalError> {
        if payload.len() > MAX_FRAMEABLE_PAYLOAD {
            return Err(WalError::RecordTooLarge {
                size: payload.len(),
                max: MAX_FRAMEABLE_PAYLOAD,
            });
        }

        let ts = timestamp.to_le_bytes();
        let mut buf = BytesMut::with_capacity(Self::encoded_len(payload.len()));

        buf.put_u32_le((payload.len() + TRAILER_SIZE) as u32);
        buf.put_slice(payload);
        buf.put_slice(&ts);
        buf.put_u32_le(Self::checksum(payload, &ts));

        Ok(buf)
    }

    /// Decodes a frame body: the `length` bytes that follow the length prefix.
    pub fn decode(body: Bytes) -> Result<Frame, WalError> {
        if body.len() < TRAILER_SIZE {
            return Err(WalError::InvalidFrame {
                reason: format!(
                    "frame body is {} bytes, minimum is {}",
                    body.len(),
                    TRAILER_SIZE
                ),
            });
        }

        let payload_len = body.len() - TRAILER_SIZE;
        let ts_bytes: [u8; TIMESTAMP_SIZE] = body[payload_len..payload_len + TIMESTAMP_SIZE]
            .try_into()
            .map_err(|_| WalError::InvalidFrame {
                reason: "short timestamp field".to_string(),
            })?;
        let crc_bytes: [u8; CHECKSUM_SIZE] = body[payload_len + TIMESTAMP_SIZE..]
            .try_into()
            .map_err(|_| WalError::InvalidFrame {
                reason: "short checksum field".to_string(),
            })?;

        let expected = u32::from_le_bytes(crc_bytes);
        let actual = Self::checksum(&body[..payload_len], &ts_bytes);
        if expected != actual {
            return Err(WalError::ChecksumMismatch { expected, actual });
        }

        Ok(Frame {
            payload: body.slice(..payload_len),
            timestamp: u64::from_le_bytes(ts_bytes),
        })
    }

    /// Validates a declared length prefix and returns the body length to read.
    ///
    /// Any length that fits the trailer is structurally valid; a `u32` prefix
    /// cannot describe more than `MAX_FRAMEABLE_PAYLOAD` bytes of payload.
    pub fn body_len(declared: u32) -> Result<usize, WalError> {
        let declared = declared as usize;
        if declared < TRAILER_SIZE {
            return Err(WalError::InvalidFrame {
                reason: format!("declared length {} is below minimum {}", declared, TRAILER_SIZE),
            });
        }
        Ok(declared)
    }

    /// Returns the on-disk size of a frame carrying `payload_len` bytes.
    pub fn encoded_len(payload_len: usize) -> usize {
        FRAME_OVERHEAD + payload_len
    }

    /// CRC-32 over payload followed by the timestamp bytes.
    pub fn checksum(payload: &[u8], timestamp: &[u8; TIMESTAMP_SIZE]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(payload);
        hasher.update(timestamp);
        hasher.finalize()
    }
}
