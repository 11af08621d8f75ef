//! Record Scanner
//!
//! Turns an arbitrary byte offset into "the next valid record at or after
//! this offset" by searching for the magic marker and letting the codec
//! validate what follows. This is what stands in for an index.

use std::fs::File;
use std::io::{Seek, SeekFrom};

use tracing::warn;

use crate::error::Result;

use super::codec::{decode, read_up_to};
use super::{Record, MAGIC};

/// A record together with the offset of its magic marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedRecord {
    pub offset: u64,
    pub record: Record,
}

impl ScannedRecord {
    /// First byte after this record
    pub fn end_offset(&self) -> u64 {
        self.offset + self.record.on_disk_size()
    }
}

/// Resynchronizing reader over one partition file
///
/// Borrows the file; each query opens its own descriptor, so scanners are
/// never shared between threads.
pub struct RecordScanner<'a> {
    file: &'a File,
    chunk: Vec<u8>,
    skipped: u64,
    decoded: u64,
}

impl<'a> RecordScanner<'a> {
    /// `chunk_size` must hold at least one magic marker
    pub fn new(file: &'a File, chunk_size: usize) -> Self {
        Self {
            file,
            chunk: vec![0u8; chunk_size.max(MAGIC.len())],
            skipped: 0,
            decoded: 0,
        }
    }

    /// Next valid record starting anywhere in `[start, end]`
    ///
    /// Returns `Ok(None)` when end-of-file or `end` is reached first. Magic
    /// matches whose record fails validation are skipped; I/O errors are not.
    pub fn scan_forward(&mut self, start: u64, end: u64) -> Result<Option<ScannedRecord>> {
        let mut file = self.file;
        let mut pos = start;

        loop {
            if pos > end {
                return Ok(None);
            }

            file.seek(SeekFrom::Start(pos))?;
            let n = read_up_to(&mut file, &mut self.chunk)?;
            if n < MAGIC.len() {
                return Ok(None);
            }

            let found = self.chunk[..n]
                .windows(MAGIC.len())
                .position(|window| window == MAGIC);

            let Some(idx) = found else {
                // Short read means end-of-file
                if n < self.chunk.len() {
                    return Ok(None);
                }
                // Overlap by MAGIC.len() - 1 so a marker split across two
                // chunks is still seen
                pos += (n - (MAGIC.len() - 1)) as u64;
                continue;
            };

            let offset = pos + idx as u64;
            if offset > end {
                return Ok(None);
            }

            file.seek(SeekFrom::Start(offset + MAGIC.len() as u64))?;
            match decode(&mut file) {
                Ok(record) => {
                    self.decoded += 1;
                    return Ok(Some(ScannedRecord { offset, record }));
                }
                Err(e) if e.is_corruption() => {
                    self.skipped += 1;
                    warn!(offset, error = %e, "skipping magic match that failed validation");
                    pos = offset + 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Next valid record at or after `start`, up to end-of-file
    pub fn next_record(&mut self, start: u64) -> Result<Option<ScannedRecord>> {
        self.scan_forward(start, u64::MAX)
    }

    /// Magic matches rejected by the codec so far
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Records successfully decoded so far
    pub fn decoded(&self) -> u64 {
        self.decoded
    }
}
