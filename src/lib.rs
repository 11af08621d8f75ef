//! # TallyKV
//!
//! An embedded, append-only key-value store with:
//! - Engine-assigned keys ordered by a persistent monotonic counter
//! - Self-describing, checksummed records in per-partition log files
//! - Index-free lookups: binary search over byte offsets with marker
//!   resynchronization
//! - fsync on every save
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Engine                              │
//! │                 save(value) / query(key)                     │
//! └──────────┬──────────────────┬──────────────────┬────────────┘
//!            │                  │                  │
//!            ▼                  ▼                  ▼
//!   ┌─────────────────┐ ┌───────────────┐ ┌─────────────────┐
//!   │ CounterAllocator│ │PartitionRouter│ │     Querier     │
//!   │    (Mutex)      │ │    (pure)     │ │ (binary search) │
//!   └────────┬────────┘ └───────────────┘ └────────┬────────┘
//!            │                                     │
//!            ▼                                     ▼
//!   ┌─────────────────┐                   ┌─────────────────┐
//!   │  AppendWriter   │                   │  RecordScanner  │
//!   │ (hot descriptor)│                   │ (resync on SKVR)│
//!   └────────┬────────┘                   └────────┬────────┘
//!            │                                     │
//!            └──────────────┐   ┌──────────────────┘
//!                           ▼   ▼
//!                    ┌─────────────────┐
//!                    │  Record Codec   │
//!                    └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod key;
pub mod counter;
pub mod router;
pub mod record;
pub mod writer;
pub mod query;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, TallyError};
pub use config::Config;
pub use engine::Engine;
pub use key::Key;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of TallyKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
