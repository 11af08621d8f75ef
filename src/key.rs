//! Key Module
//!
//! Composite keys assigned by the engine on every save.
//!
//! ## Layouts
//! ```text
//! Record form (20 bytes, inside a record payload):
//! ┌───────────┬────────────────┬──────────────┐
//! │ Salt (4)  │ Timestamp (8)  │ Counter (8)  │
//! └───────────┴────────────────┴──────────────┘
//!
//! External form (16 bytes, hex encoded to 32 chars):
//! ┌──────────────────────────────┬──────────────┐
//! │ Salt (24 bits) | Ts (40 bits) │ Counter (8)  │
//! └──────────────────────────────┴──────────────┘
//! ```
//! All integers are big-endian.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use bytes::{Buf, BufMut};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, TallyError};

/// Size of a key inside a record payload
pub const KEY_SIZE: usize = 20;

/// Length of the external hex form
pub const EXTERNAL_KEY_LEN: usize = 32;

/// Width of the salt in the external form
pub const SALT_BITS: u32 = 24;

/// Width of the timestamp in the external form
pub const TIMESTAMP_BITS: u32 = 40;

const SALT_MASK: u64 = (1 << SALT_BITS) - 1;
const TIMESTAMP_MASK: u64 = (1 << TIMESTAMP_BITS) - 1;

/// Identifies one stored value
///
/// Two keys are equal only when all three fields match. Ordering is
/// counter-major, so keys from distinct allocations sort by counter alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key {
    /// Random salt, 24 significant bits
    pub salt: u32,
    /// Seconds since the Unix epoch
    pub timestamp: u64,
    /// Value handed out by the counter allocator
    pub counter: u64,
}

impl Key {
    pub fn new(salt: u32, timestamp: u64, counter: u64) -> Self {
        Self {
            salt,
            timestamp,
            counter,
        }
    }

    /// A key for a new write: random salt, current time, counter unset
    pub fn fresh() -> Self {
        let salt = rand::random::<u32>() >> (32 - SALT_BITS);
        let timestamp = chrono::Utc::now().timestamp().max(0) as u64 & TIMESTAMP_MASK;
        Self::new(salt, timestamp, 0)
    }

    /// Copy of this key carrying the given counter
    pub fn with_counter(self, counter: u64) -> Self {
        Self { counter, ..self }
    }

    // =========================================================================
    // Record Encoding
    // =========================================================================

    /// Fixed-width form stored at the front of each record payload
    pub fn to_record_bytes(&self) -> [u8; KEY_SIZE] {
        let mut out = [0u8; KEY_SIZE];
        let mut buf = &mut out[..];
        buf.put_u32(self.salt);
        buf.put_u64(self.timestamp);
        buf.put_u64(self.counter);
        out
    }

    pub fn from_record_bytes(bytes: &[u8; KEY_SIZE]) -> Self {
        let mut buf = &bytes[..];
        let salt = buf.get_u32();
        let timestamp = buf.get_u64();
        let counter = buf.get_u64();
        Self::new(salt, timestamp, counter)
    }

    // =========================================================================
    // External Encoding
    // =========================================================================

    /// 32 lowercase hex characters handed back to callers
    pub fn to_external(&self) -> String {
        let packed = ((self.salt as u64 & SALT_MASK) << TIMESTAMP_BITS)
            | (self.timestamp & TIMESTAMP_MASK);

        let mut raw = [0u8; 16];
        let mut buf = &mut raw[..];
        buf.put_u64(packed);
        buf.put_u64(self.counter);
        hex::encode(raw)
    }

    /// Parse the external form produced by [`Key::to_external`]
    pub fn from_external(s: &str) -> Result<Self> {
        if s.len() != EXTERNAL_KEY_LEN {
            return Err(TallyError::InvalidKey(format!(
                "expected {} characters, got {}",
                EXTERNAL_KEY_LEN,
                s.len()
            )));
        }

        let mut raw = [0u8; 16];
        hex::decode_to_slice(s, &mut raw)
            .map_err(|e| TallyError::InvalidKey(format!("{:?}: {}", s, e)))?;

        let mut buf = &raw[..];
        let packed = buf.get_u64();
        let counter = buf.get_u64();

        Ok(Self::new(
            (packed >> TIMESTAMP_BITS) as u32,
            packed & TIMESTAMP_MASK,
            counter,
        ))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        self.counter
            .cmp(&other.counter)
            .then(self.salt.cmp(&other.salt))
            .then(self.timestamp.cmp(&other.timestamp))
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_external())
    }
}

impl FromStr for Key {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_external(s)
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_external())
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Key::from_external(&s).map_err(serde::de::Error::custom)
    }
}
