//! Bucket File Engine
//!
//! One fixed-slot hash table per bucket file.
//!
//! ## Responsibilities
//! - Create bucket files lazily on first write
//! - Place records with a three-slot interpolation probe
//! - Insert, update, look up and tombstone records
//! - Validate the header on every open
//! - Grow the table (longer records or more slots) by rehashing into a
//!   scratch file that is renamed over the original
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Header (recordLength bytes)                                  │
//! │   "STRONGMAP_BUCKET_V1 <name> <recordLength> <recordCount>   │
//! │    <slotCount>" + space padding + "\n"                       │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Slot 0 (recordLength bytes)                                  │
//! │   "<slotId:7 hex> <keyString> <valueString>" + padding + "\n"│
//! │   or all spaces + "\n" when empty / tombstoned               │
//! ├──────────────────────────────────────────────────────────────┤
//! │ ... slotCount slots ...                                      │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod engine;
mod growth;
mod header;
mod slot;

pub use engine::{BucketEngine, PutOutcome};
pub use header::BucketHeader;
pub use slot::{expected_index, probe_indices, SlotRecord};

/// Magic and format version at the start of every bucket header
pub const BUCKET_MAGIC: &str = "STRONGMAP_BUCKET_V1";

/// Slots examined per placement
pub const PROBE_WINDOW: u64 = 3;

/// Suffix of the scratch file a growing bucket is rewritten into
pub const GROW_SUFFIX: &str = "grow";
