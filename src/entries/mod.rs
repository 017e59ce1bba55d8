//! Entry Log
//!
//! Per-dictionary append-only log of every inserted key's hash.
//!
//! ## Responsibilities
//! - O(1) size queries through the header's live count
//! - Enumeration without walking the bucket directory tree
//! - Never compacted: deletes only decrement the live count
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │ Header (fixed width per dictionary name)            │
//! │   "STRONGMAP_ENTRIES_V1 <name> <recordCount>        │
//! │    <lineCount>" + space padding + "\n"              │
//! ├─────────────────────────────────────────────────────┤
//! │ Line 0: 16 hex digits + "\n"  (17 bytes)            │
//! │ Line 1: 16 hex digits + "\n"                        │
//! │ ... lineCount lines, append-only ...                │
//! └─────────────────────────────────────────────────────┘
//! ```

mod header;
mod log;
mod stream;

pub use header::EntryHeader;
pub use log::{EntryLog, HashLines};
pub use stream::EntryStream;

/// Magic and format version at the start of the entry log header
pub const ENTRIES_MAGIC: &str = "STRONGMAP_ENTRIES_V1";

/// Bytes per logged hash: 16 hex digits + newline
pub const LINE_WIDTH: u64 = 17;
