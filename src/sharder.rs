//! Sharder
//!
//! Pure mapping from a key to its on-disk coordinates. No I/O.
//!
//! ## Hash Layout
//! ```text
//!  hash (16 hex digits)
//!  ┌───┬───┬─────────────┬───────────────┐
//!  │ 0 │ 1 │   2 .. 9    │    9 .. 16    │
//!  └───┴───┴─────────────┴───────────────┘
//!  dir1 dir2  bucket id      slot id
//!             (file name)    (0 .. 16^7)
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::codec;
use crate::error::Result;
use crate::hash::{KeyHash, KeyHasher};

/// Hex digits in a slot id
pub const SLOT_ID_HEX_WIDTH: usize = 7;

/// Number of distinct slot ids (16^7)
pub const SLOT_ID_RANGE: u64 = 1 << 28;

/// Extension of bucket files
pub const BUCKET_EXTENSION: &str = "dat";

/// Where a hash lives on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinates {
    pub hash: KeyHash,
    pub dir1: String,
    pub dir2: String,
    /// 7 hex digits, used as the bucket file stem
    pub bucket_id: String,
    /// Slot id within the bucket file, in `0..SLOT_ID_RANGE`
    pub slot_id: u32,
    /// `keys/<dir1>/<dir2>/<bucket_id>.dat`
    pub bucket_path: PathBuf,
}

/// Coordinates plus the serialized key they were derived from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub coords: Coordinates,
    pub key_string: String,
}

/// Maps keys to bucket files and slot ids under one dictionary's `keys/` dir
#[derive(Clone)]
pub struct Sharder {
    keys_dir: PathBuf,
    hasher: Arc<dyn KeyHasher>,
}

impl Sharder {
    pub fn new(keys_dir: impl Into<PathBuf>, hasher: Arc<dyn KeyHasher>) -> Self {
        Self {
            keys_dir: keys_dir.into(),
            hasher,
        }
    }

    /// Serialize `key` and compute its coordinates
    pub fn locate<K: Serialize + ?Sized>(&self, key: &K) -> Result<Location> {
        let key_string = codec::stringify(key)?;
        Ok(self.locate_encoded(key_string))
    }

    /// Coordinates for an already serialized key
    pub fn locate_encoded(&self, key_string: String) -> Location {
        let hash = KeyHash(self.hasher.hash(&key_string));
        Location {
            coords: self.coordinates(hash),
            key_string,
        }
    }

    /// Coordinates for a hash (entry log replay has no key, only the hash)
    pub fn coordinates(&self, hash: KeyHash) -> Coordinates {
        let hex = hash.to_hex();
        let dir1 = hex[0..1].to_string();
        let dir2 = hex[1..2].to_string();
        let bucket_id = hex[2..9].to_string();
        let slot_id = (hash.0 & (SLOT_ID_RANGE - 1)) as u32;

        let bucket_path = self
            .keys_dir
            .join(&dir1)
            .join(&dir2)
            .join(format!("{}.{}", bucket_id, BUCKET_EXTENSION));

        Coordinates {
            hash,
            dir1,
            dir2,
            bucket_id,
            slot_id,
            bucket_path,
        }
    }

    /// Root of all bucket files for this dictionary
    pub fn keys_dir(&self) -> &Path {
        &self.keys_dir
    }
}

impl fmt::Debug for Sharder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sharder")
            .field("keys_dir", &self.keys_dir)
            .finish_non_exhaustive()
    }
}

/// Render a slot id as its fixed-width leading field
pub fn format_slot_id(slot_id: u32) -> String {
    format!("{:0width$x}", slot_id, width = SLOT_ID_HEX_WIDTH)
}
