//! Engine Module
//!
//! The storage engine that coordinates all components.
//!
//! ## Responsibilities
//! - Mint keys (salt, timestamp, counter) for every saved value
//! - Route keys to partition files
//! - Append records durably
//! - Answer queries without an index
//!
//! ## Data Flow
//! ```text
//! save(value)  → counter → key → route → encode → append + fsync
//! query(key)   → decode key → route → binary search with the scanner
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::info;

use crate::config::Config;
use crate::counter::CounterAllocator;
use crate::error::Result;
use crate::key::Key;
use crate::query::{Querier, StatsSnapshot};
use crate::record;
use crate::router::PartitionRouter;
use crate::writer::AppendWriter;

/// The main storage engine
///
/// ## Concurrency Model
///
/// - **Saves**: Serialized by the counter allocator's mutex. The append runs
///   inside the allocation, so within one file records land in counter order.
///   The writer's own mutex guards its descriptor cache.
///
/// - **Queries**: Fully concurrent. Each query opens its own read descriptor
///   and touches no shared mutable state besides atomic statistics.
///
/// One engine per data directory; the counter store has no cross-process
/// locking.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Persistent counter shared by all partitions
    counter: CounterAllocator,

    /// Key → file path
    router: PartitionRouter,

    /// Hot-descriptor appender
    writer: AppendWriter,

    /// Index-free lookups
    querier: Querier,
}

impl Engine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const COUNTER_FILENAME: &'static str = "counter";

    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Validate the config
    /// 2. Create the data directory if it doesn't exist
    /// 3. Initialize the counter store if it doesn't exist
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        fs::create_dir_all(&config.data_dir)?;

        let counter = CounterAllocator::new(
            config.data_dir.join(Self::COUNTER_FILENAME),
            config.counter_prefetch,
        );
        if counter.ensure_store()? {
            info!(path = %counter.path().display(), "initialized counter store");
        }

        let router = PartitionRouter::new(config.data_dir.clone(), config.partitions);
        let querier = Querier::new(config.scan_chunk_size);

        info!(
            data_dir = %config.data_dir.display(),
            partitions = config.partitions,
            "engine opened"
        );

        Ok(Self {
            config,
            counter,
            router,
            writer: AppendWriter::new(),
            querier,
        })
    }

    /// Open with a data directory and partition count, defaults otherwise
    pub fn new(data_dir: impl Into<PathBuf>, partitions: u64) -> Result<Self> {
        Self::open(
            Config::builder()
                .data_dir(data_dir)
                .partitions(partitions)
                .build(),
        )
    }

    /// Store a value and return the key assigned to it
    ///
    /// Steps:
    /// 1. Reject values too large for one record (nothing consumed)
    /// 2. Mint salt + timestamp and route to a partition file
    /// 3. Under the counter lock: take a counter, encode, append, fsync
    pub fn save(&self, value: &[u8]) -> Result<Key> {
        record::check_value_len(value.len())?;

        let key = Key::fresh();
        let path = self.router.route(&key)?;

        let counter = self.counter.allocate_with(|counter| {
            let bytes = record::encode(&key.with_counter(counter), value)?;
            self.writer.append(&path, &bytes)
        })?;

        Ok(key.with_counter(counter))
    }

    /// Fetch the value stored under an external key string
    pub fn query(&self, external_key: &str) -> Result<Bytes> {
        let key = Key::from_external(external_key)?;
        self.query_key(&key)
    }

    /// Fetch the value stored under an already-decoded key
    pub fn query_key(&self, key: &Key) -> Result<Bytes> {
        let path = self.router.route(key)?;
        self.querier.query(&path, key)
    }

    /// Rewind the counter store to its initial value
    ///
    /// For tests and bootstrap only; keys minted afterwards may collide with
    /// keys already on disk.
    pub fn reset_counter(&self) -> Result<()> {
        self.counter.reset()
    }

    /// Close the engine gracefully, syncing the hot descriptor
    pub fn close(self) -> Result<()> {
        self.writer.close_all()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Partition file a key routes to
    pub fn partition_path(&self, key: &Key) -> Result<PathBuf> {
        self.router.route(key)
    }

    /// Scanner statistics accumulated by queries
    pub fn stats(&self) -> StatsSnapshot {
        self.querier.stats()
    }

    /// Number of writable descriptors held open
    pub fn open_descriptors(&self) -> usize {
        self.writer.open_count()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
