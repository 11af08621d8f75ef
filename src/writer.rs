//! Append Writer
//!
//! Appends encoded records to partition files.
//!
//! ## Responsibilities
//! - Create date directories and partition files on first write
//! - Keep at most one writable descriptor (the "hot" one) open
//! - fsync after every append

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use crate::error::Result;

#[derive(Default)]
struct Descriptors {
    /// Open writable files keyed by path
    open: HashMap<PathBuf, File>,
    /// Path of the most recently written file
    hot: Option<PathBuf>,
}

/// Serialized appender over partition files
///
/// ## Concurrency:
/// - One mutex covers lookup/open, eviction, write and sync, so two appends
///   never interleave their bytes inside one file
pub struct AppendWriter {
    descriptors: Mutex<Descriptors>,
}

impl AppendWriter {
    pub fn new() -> Self {
        Self {
            descriptors: Mutex::new(Descriptors::default()),
        }
    }

    /// Append `bytes` to `path` and sync before returning
    pub fn append(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let mut guard = self.descriptors.lock();
        let descriptors = &mut *guard;

        if descriptors.hot.as_deref() != Some(path) {
            if let Some(previous) = descriptors.hot.take() {
                // Dropping the handle closes it
                descriptors.open.remove(&previous);
                debug!(from = %previous.display(), to = %path.display(), "switching hot descriptor");
            }
            descriptors.hot = Some(path.to_path_buf());
        }

        let file = match descriptors.open.entry(path.to_path_buf()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(Self::open_for_append(path)?),
        };

        file.write_all(bytes)?;
        file.sync_all()?;
        Ok(())
    }

    /// Sync and close every open descriptor
    pub fn close_all(&self) -> Result<()> {
        let mut descriptors = self.descriptors.lock();
        for (_, file) in descriptors.open.drain() {
            file.sync_all()?;
        }
        descriptors.hot = None;
        Ok(())
    }

    /// Number of writable descriptors currently open
    pub fn open_count(&self) -> usize {
        self.descriptors.lock().open.len()
    }

    /// Path of the hot descriptor, if any
    pub fn hot_path(&self) -> Option<PathBuf> {
        self.descriptors.lock().hot.clone()
    }

    fn open_for_append(path: &Path) -> Result<File> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(file)
    }
}

impl Default for AppendWriter {
    fn default() -> Self {
        Self::new()
    }
}
