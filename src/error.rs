//! Error types for TallyKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using TallyError
pub type Result<T> = std::result::Result<T, TallyError>;

/// Unified error type for TallyKV operations
#[derive(Debug, Error)]
pub enum TallyError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Key Errors
    // -------------------------------------------------------------------------
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    // -------------------------------------------------------------------------
    // Record Errors (recovered locally while scanning)
    // -------------------------------------------------------------------------
    #[error("Checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error("Truncated record: expected {expected} bytes, got {actual}")]
    TruncatedRecord { expected: u64, actual: u64 },

    #[error("Oversized payload length field: {0} bytes")]
    OversizedPayload(u32),

    // -------------------------------------------------------------------------
    // Write Errors
    // -------------------------------------------------------------------------
    #[error("Payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TallyError {
    /// True for decode failures caused by bad bytes on disk rather than by
    /// the filesystem. The scanner skips past these and keeps searching.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            TallyError::ChecksumMismatch { .. }
                | TallyError::TruncatedRecord { .. }
                | TallyError::OversizedPayload(_)
        )
    }
}
