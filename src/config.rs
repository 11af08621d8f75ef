//! Configuration for TallyKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{Result, TallyError};

/// Main configuration for a TallyKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── counter                (next counter reservation, u64 BE)
    ///     └── {YYYY-MM-DD}/
    ///           └── {partition}.dat  (append-only record log)
    pub data_dir: PathBuf,

    /// Number of partition files per date directory
    pub partitions: u64,

    // -------------------------------------------------------------------------
    // Counter Configuration
    // -------------------------------------------------------------------------
    /// Extra counter values reserved on each refill of the counter store.
    /// Each refill reserves `counter_prefetch + 1` values.
    pub counter_prefetch: u64,

    // -------------------------------------------------------------------------
    // Query Configuration
    // -------------------------------------------------------------------------
    /// Bytes read per chunk while scanning for a record boundary
    pub scan_chunk_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./tallykv_data"),
            partitions: 10,
            counter_prefetch: 1,
            scan_chunk_size: 4096,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.partitions == 0 {
            return Err(TallyError::Config(
                "partitions must be at least 1".to_string(),
            ));
        }
        // A chunk must be able to hold one whole magic marker
        if self.scan_chunk_size < crate::record::MAGIC.len() {
            return Err(TallyError::Config(format!(
                "scan_chunk_size must be at least {} bytes, got {}",
                crate::record::MAGIC.len(),
                self.scan_chunk_size
            )));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the number of partitions per date
    pub fn partitions(mut self, count: u64) -> Self {
        self.config.partitions = count;
        self
    }

    /// Set how many extra counter values each refill reserves
    pub fn counter_prefetch(mut self, count: u64) -> Self {
        self.config.counter_prefetch = count;
        self
    }

    /// Set the scanner chunk size (in bytes)
    pub fn scan_chunk_size(mut self, size: usize) -> Self {
        self.config.scan_chunk_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
