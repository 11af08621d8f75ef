//! Counter Allocator
//!
//! Persistent, monotonically increasing 64-bit counter shared by every
//! partition of a data directory.
//!
//! ## Reservation Scheme
//! The counter store holds one big-endian u64. A refill reads it as `base`
//! and immediately persists `base + prefetch + 1`, reserving the window
//! `base + 1 ..= base + prefetch + 1` before any value from it is handed out.
//! After a crash the unused tail of a window is skipped, never reused.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::Result;

/// Initial value written by a reset
pub const COUNTER_START: u64 = 1;

/// Cached reservation window
#[derive(Debug, Default)]
struct Window {
    /// Value read from the store on the last refill
    base: u64,
    /// Values handed out from the current window
    cursor: u64,
    /// False until the first refill (or after `invalidate`)
    loaded: bool,
}

/// Hands out unique counter values backed by a file
///
/// ## Concurrency:
/// - One mutex guards the window; allocations are fully serialized
/// - `allocate_with` runs the caller's continuation under that mutex
pub struct CounterAllocator {
    path: PathBuf,
    prefetch: u64,
    window: Mutex<Window>,
}

impl CounterAllocator {
    pub fn new(path: impl Into<PathBuf>, prefetch: u64) -> Self {
        Self {
            path: path.into(),
            prefetch,
            window: Mutex::new(Window::default()),
        }
    }

    /// Allocate a value with no dependent work
    pub fn allocate(&self) -> Result<u64> {
        self.allocate_with(|_| Ok(()))
    }

    /// Allocate a value and hand it to `f` before releasing the lock
    ///
    /// The value is consumed whether or not `f` succeeds; on failure the
    /// error from `f` is returned and the value is never handed out again.
    pub fn allocate_with<F>(&self, f: F) -> Result<u64>
    where
        F: FnOnce(u64) -> Result<()>,
    {
        let mut window = self.window.lock();

        if !window.loaded {
            self.refill(&mut window)?;
        }

        window.cursor += 1;
        let value = window.base + window.cursor;

        // Window exhausted: reserve the next one now so the following
        // allocation starts from a loaded window
        if window.cursor > self.prefetch {
            self.refill(&mut window)?;
        }

        f(value)?;
        Ok(value)
    }

    /// Rewind the store to the initial value and drop the cached window
    pub fn reset(&self) -> Result<()> {
        let mut window = self.window.lock();

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        file.write_all(&COUNTER_START.to_be_bytes())?;
        file.sync_all()?;

        *window = Window::default();
        debug!(path = %self.path.display(), "counter store reset");
        Ok(())
    }

    /// Create the store with the initial value if it does not exist yet
    ///
    /// Returns true when a new store was written.
    pub fn ensure_store(&self) -> Result<bool> {
        let _window = self.window.lock();

        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        file.write_all(&COUNTER_START.to_be_bytes())?;
        file.sync_all()?;
        Ok(true)
    }

    /// Forget the cached window; the next allocation reads the store again
    pub fn invalidate(&self) {
        *self.window.lock() = Window::default();
    }

    /// Value currently persisted in the store
    pub fn stored_value(&self) -> Result<u64> {
        let mut file = File::open(&self.path)?;
        read_u64(&mut file)
    }

    /// Path of the counter store
    pub fn path(&self) -> &Path {
        &self.path
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Load a new window
    ///
    /// On failure the cached window is dropped, so the next allocation
    /// starts from whatever the store holds.
    fn refill(&self, window: &mut Window) -> Result<()> {
        match self.reserve() {
            Ok(base) => {
                window.base = base;
                window.cursor = 0;
                window.loaded = true;
                Ok(())
            }
            Err(e) => {
                *window = Window::default();
                warn!(path = %self.path.display(), error = %e, "counter refill failed");
                Err(e)
            }
        }
    }

    /// Read the store, persist the next reservation, return the old base
    fn reserve(&self) -> Result<u64> {
        let mut file = OpenOptions::new().read(true).write(true).open(&self.path)?;

        let base = read_u64(&mut file)?;
        let reserved = base + self.prefetch + 1;

        file.seek(SeekFrom::Start(0))?;
        file.write_all(&reserved.to_be_bytes())?;
        file.sync_all()?;

        debug!(base, reserved, "counter window refilled");
        Ok(base)
    }
}

fn read_u64(file: &mut File) -> Result<u64> {
    let mut buf = [0u8; 8];
    file.read_exact(&mut buf)?;
    Ok(u64::from_be_bytes(buf))
}
