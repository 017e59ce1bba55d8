//! # StrongMap
//!
//! A persistent, file-backed dictionary with:
//! - Deterministic key → bucket file + slot addressing (xxHash64)
//! - Fixed-width slot records with a three-slot interpolation probe
//! - An append-only entry log for size queries and enumeration
//! - A forced flush before and after every mutating write
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StrongMap<K, V>                          │
//! │        set / get / has / delete / size / entries             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!                       ▼
//!               ┌──────────────┐
//!               │   Sharder    │  key → hash → dir1/dir2/bucket + slot id
//!               └──────┬───────┘
//!                      │
//!          ┌───────────┴─────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Bucket    │◄─────────│  Entry Log  │
//!   │   Engine    │  replay  │  (append)   │
//!   └──────┬──────┘          └──────┬──────┘
//!          │                        │
//!          ▼                        ▼
//!   ┌─────────────────────────────────────┐
//!   │   Durability (ScopedFile, fsync)    │
//!   └─────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use strongmap::{Config, StrongMap};
//!
//! let config = Config::builder().root("/tmp/data").name("happy-test").build();
//! let mut map: StrongMap<u32, u32> = StrongMap::open(config)?;
//! map.set(&1, &2)?;
//! assert_eq!(map.get(&1)?, Some(2));
//! # Ok::<(), strongmap::StoreError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod codec;
pub mod hash;
pub mod sharder;
pub mod durability;
pub mod bucket;
pub mod entries;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::{Config, GrowthPolicy};
pub use error::{GrowthKind, Result, StoreError};
pub use hash::{KeyHash, KeyHasher};
pub use store::{Entries, StrongMap};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of StrongMap
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
