//! Querier
//!
//! Approximate binary search over the byte range of one partition file.
//!
//! ## How It Works
//! Records in one file are appended in strictly increasing counter order, so
//! byte position is monotonic in counter. Each probe picks the middle of the
//! remaining range and asks the scanner for the first record at or after it:
//!
//! ```text
//!   start            mid                       end
//!     │               │                         │
//!     ▼               ▼                         ▼
//!   ┌─────┬──────┬────┼──┬────────┬──────┬──────┐
//!   │ r1  │  r2  │  r3   │   r4   │  r5  │  r6  │
//!   └─────┴──────┴───────┴────────┴──────┴──────┘
//!                        ▲
//!                        first record found from mid
//! ```
//! - found counter == target: done
//! - found counter  > target: continue in `[start, mid - 1]`
//! - found counter  < target: continue past the found record
//! - nothing found in `[mid, end]`: continue in `[start, mid - 1]`

use std::fs::File;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use tracing::trace;

use crate::error::{Result, TallyError};
use crate::key::Key;
use crate::record::RecordScanner;

/// Counters describing scanner activity across all queries
#[derive(Debug, Default)]
pub struct ScanStats {
    probes: AtomicU64,
    records_scanned: AtomicU64,
    corrupt_skips: AtomicU64,
}

/// Point-in-time copy of [`ScanStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Scanner invocations
    pub probes: u64,
    /// Records decoded successfully
    pub records_scanned: u64,
    /// Magic matches rejected by the codec
    pub corrupt_skips: u64,
}

impl ScanStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            probes: self.probes.load(Ordering::Relaxed),
            records_scanned: self.records_scanned.load(Ordering::Relaxed),
            corrupt_skips: self.corrupt_skips.load(Ordering::Relaxed),
        }
    }
}

/// Looks up values in partition files without an index
///
/// Stateless apart from statistics; safe to share across threads. Each call
/// opens its own read descriptor.
#[derive(Debug)]
pub struct Querier {
    chunk_size: usize,
    stats: ScanStats,
}

impl Querier {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            stats: ScanStats::default(),
        }
    }

    /// Find the value stored under `key` in the file at `path`
    pub fn query(&self, path: &Path, key: &Key) -> Result<Bytes> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TallyError::KeyNotFound(format!(
                    "{} (no partition file {})",
                    key,
                    path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };
        let file_size = file.metadata()?.len();

        let mut scanner = RecordScanner::new(&file, self.chunk_size);
        let result = self.search(&mut scanner, file_size, key);

        self.stats
            .records_scanned
            .fetch_add(scanner.decoded(), Ordering::Relaxed);
        self.stats
            .corrupt_skips
            .fetch_add(scanner.skipped(), Ordering::Relaxed);

        match result? {
            Some(value) => Ok(value),
            None => Err(TallyError::KeyNotFound(key.to_string())),
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Worklist search over inclusive byte ranges `(start, end)`
    fn search(
        &self,
        scanner: &mut RecordScanner<'_>,
        file_size: u64,
        key: &Key,
    ) -> Result<Option<Bytes>> {
        let mut ranges: Vec<(u64, u64)> = vec![(0, file_size)];

        while let Some((start, end)) = ranges.pop() {
            if start > end {
                continue;
            }
            let mid = start + (end - start) / 2;

            self.stats.probes.fetch_add(1, Ordering::Relaxed);
            let found = scanner.scan_forward(mid, end)?;

            let Some(found) = found else {
                trace!(start, mid, end, "no record in upper half");
                if let Some(upper) = mid.checked_sub(1) {
                    ranges.push((start, upper));
                }
                continue;
            };

            let counter = found.record.key.counter;
            trace!(start, mid, end, offset = found.offset, counter, "probe");

            if counter == key.counter {
                // Counters are unique, so a mismatch on the other fields
                // means the requested key was never stored
                if found.record.key == *key {
                    return Ok(Some(found.record.value));
                }
                return Ok(None);
            } else if counter > key.counter {
                if let Some(upper) = mid.checked_sub(1) {
                    ranges.push((start, upper));
                }
            } else {
                ranges.push((found.end_offset(), end));
            }
        }

        Ok(None)
    }
}
