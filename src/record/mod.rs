//! Record Module
//!
//! Self-describing, checksummed entries of a partition log.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Record 1                                                │
//! │   Magic: "SKVR" (4) | Checksum: u32 (4) | Len: u32 (4)  │
//! │   Payload (Len bytes)                                   │
//! │     Key (20) | Value (Len - 20)                         │
//! ├─────────────────────────────────────────────────────────┤
//! │ Record 2                                                │
//! │   ... repeated, strictly increasing counter order ...   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no file header, footer or index. Integers are big-endian and the
//! checksum is Adler-32 over the payload.

mod codec;
mod scanner;

use bytes::Bytes;

use crate::key::{Key, KEY_SIZE};

pub use codec::{check_value_len, decode, encode};
pub use scanner::{RecordScanner, ScannedRecord};

// =============================================================================
// Shared Constants (used by codec and scanner)
// =============================================================================

/// Marker at the start of every record
pub const MAGIC: &[u8; 4] = b"SKVR";

/// Magic (4) + Checksum (4) + PayloadLen (4) = 12 bytes
pub const HEADER_SIZE: u64 = 12;

/// Largest payload (key + value) accepted on write or read
pub const MAX_PAYLOAD_LEN: u32 = 10_485_760;

/// Largest value that fits in one record
pub const MAX_VALUE_LEN: usize = MAX_PAYLOAD_LEN as usize - KEY_SIZE;

// =============================================================================
// Record
// =============================================================================

/// One decoded record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: Key,
    pub value: Bytes,
}

impl Record {
    pub fn new(key: Key, value: impl Into<Bytes>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }

    /// Key bytes plus value bytes
    pub fn payload_len(&self) -> u64 {
        (KEY_SIZE + self.value.len()) as u64
    }

    /// Bytes this record occupies in a log file, magic included
    pub fn on_disk_size(&self) -> u64 {
        HEADER_SIZE + self.payload_len()
    }
}
