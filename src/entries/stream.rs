//! Entry log replay
//!
//! Lazily turns logged hashes into current records. Each logged hash is
//! re-sharded and its bucket slot read as it is now; deleted records yield
//! nothing. A hash logged more than once (deleted, then inserted again) is
//! yielded once per scan.
//!
//! There is no isolation: a scan running alongside writes may observe a
//! mix of old and new state.

use std::collections::HashSet;

use crate::bucket::{BucketEngine, SlotRecord};
use crate::error::Result;
use crate::hash::KeyHash;
use crate::sharder::Sharder;

use super::HashLines;

/// Restartable, finite stream of live records in log order
pub struct EntryStream<'a> {
    hashes: HashLines,
    sharder: &'a Sharder,
    buckets: &'a BucketEngine,
    seen: HashSet<KeyHash>,
}

impl<'a> EntryStream<'a> {
    pub fn new(hashes: HashLines, sharder: &'a Sharder, buckets: &'a BucketEngine) -> Self {
        Self {
            hashes,
            sharder,
            buckets,
            seen: HashSet::new(),
        }
    }
}

impl Iterator for EntryStream<'_> {
    type Item = Result<SlotRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let hash = match self.hashes.next()? {
                Ok(hash) => hash,
                Err(e) => return Some(Err(e)),
            };
            if !self.seen.insert(hash) {
                continue;
            }

            let coords = self.sharder.coordinates(hash);
            match self.buckets.read_record(&coords) {
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
