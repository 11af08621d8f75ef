//! Partition Router
//!
//! Maps a key to the log file that holds it. Pure path computation, no I/O.

use std::path::PathBuf;

use chrono::{TimeZone, Utc};

use crate::error::{Result, TallyError};
use crate::key::Key;

/// Multiplier used to mix salt and timestamp
const HASH_MULTIPLIER: u64 = 31;

/// Routes keys to `{data_dir}/{YYYY-MM-DD}/{index}.dat`
#[derive(Debug, Clone)]
pub struct PartitionRouter {
    data_dir: PathBuf,
    partitions: u64,
}

impl PartitionRouter {
    /// `partitions` must be non-zero (checked by `Config::validate`)
    pub fn new(data_dir: impl Into<PathBuf>, partitions: u64) -> Self {
        Self {
            data_dir: data_dir.into(),
            partitions,
        }
    }

    /// File holding the record for `key`
    pub fn route(&self, key: &Key) -> Result<PathBuf> {
        let date = Self::date_segment(key.timestamp)?;
        let index = self.partition_index(key);
        Ok(self.data_dir.join(date).join(format!("{}.dat", index)))
    }

    /// Partition index in `[0, partitions)`
    ///
    /// The counter is left out: every key minted in the same second with the
    /// same salt lands in the same file.
    pub fn partition_index(&self, key: &Key) -> u64 {
        let hash = HASH_MULTIPLIER
            .wrapping_mul(HASH_MULTIPLIER.wrapping_add(key.salt as u64))
            .wrapping_add(key.timestamp);
        hash % self.partitions
    }

    /// UTC calendar date of a timestamp, e.g. "2024-03-09"
    fn date_segment(timestamp: u64) -> Result<String> {
        let datetime = i64::try_from(timestamp)
            .ok()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .ok_or_else(|| {
                TallyError::InvalidKey(format!("timestamp {} out of range", timestamp))
            })?;
        Ok(datetime.format("%Y-%m-%d").to_string())
    }
}
