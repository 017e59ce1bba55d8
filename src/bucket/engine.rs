//! Bucket Engine
//!
//! Insert, lookup and delete against the bucket file a key shards to.

use std::path::Path;

use tracing::{debug, trace};

use crate::config::{Config, GrowthPolicy};
use crate::durability::{ensure_dir, sync_dir, vanished, ScopedFile};
use crate::error::{GrowthKind, Result, StoreError};
use crate::sharder::{Coordinates, Location};

use super::growth;
use super::slot::{blank_slot, place_slot, slot_offset, Intent, Placement, SlotRecord};
use super::BucketHeader;

/// Result of a successful put
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The record took a free slot (first occupancy)
    Inserted,
    /// The key was already stored; its slot was rewritten in place
    Updated,
}

/// Operates on the bucket files of one dictionary
///
/// Holds no open handles between calls: every operation opens the bucket
/// file, does its I/O and releases it before returning.
#[derive(Debug, Clone)]
pub struct BucketEngine {
    /// Dictionary name every header must carry
    name: String,

    /// Slot width for new bucket files
    initial_record_length: usize,

    growth_factor: f64,
    growth: GrowthPolicy,
}

impl BucketEngine {
    pub fn new(name: &str, config: &Config) -> Self {
        Self {
            name: name.to_string(),
            initial_record_length: config.initial_record_length,
            growth_factor: config.growth_factor,
            growth: config.growth,
        }
    }

    /// Create the bucket file with one blank slot if it does not exist
    pub fn ensure_file(&self, coords: &Coordinates) -> Result<()> {
        let path = &coords.bucket_path;
        if let Some(dir) = path.parent() {
            ensure_dir(dir)?;
        }

        let record_length = self
            .initial_record_length
            .max(BucketHeader::min_record_length(&self.name));

        let Some(mut file) = ScopedFile::create_new(path)? else {
            return Ok(());
        };

        let header = BucketHeader::new(&self.name, record_length);
        let mut bytes = header.encode();
        bytes.extend_from_slice(&blank_slot(record_length));
        file.write_durable(0, &bytes)?;
        file.sync_all()?;
        if let Some(dir) = path.parent() {
            sync_dir(dir)?;
        }

        debug!(path = %path.display(), record_length, "created bucket file");
        Ok(())
    }

    /// Store `value` (already serialized) under `loc`.
    ///
    /// Growth-required conditions are resolved by rehashing the bucket
    /// when the policy allows it; a slot-id conflict is always returned.
    pub fn put(&self, loc: &Location, value: &str) -> Result<PutOutcome> {
        let mut rounds = 0;
        loop {
            match self.try_put(loc, value) {
                Err(StoreError::GrowthRequired { path, kind }) => {
                    let max_rounds = match self.growth {
                        GrowthPolicy::Automatic { max_rounds } => max_rounds,
                        GrowthPolicy::Disabled => 0,
                    };
                    if matches!(kind, GrowthKind::SlotIdConflict { .. }) || rounds >= max_rounds {
                        return Err(StoreError::GrowthRequired { path, kind });
                    }
                    rounds += 1;
                    let pending = SlotRecord {
                        slot_id: loc.coords.slot_id,
                        key: loc.key_string.clone(),
                        value: value.to_string(),
                    };
                    growth::grow(&path, &self.name, &kind, self.growth_factor, &pending)?;
                }
                other => return other,
            }
        }
    }

    /// One placement attempt, no growth
    fn try_put(&self, loc: &Location, value: &str) -> Result<PutOutcome> {
        let coords = &loc.coords;
        self.ensure_file(coords)?;

        let path = &coords.bucket_path;
        let mut file = ScopedFile::open_write(path)?.ok_or_else(|| vanished(path))?;
        let mut header = BucketHeader::read(&mut file, &self.name)?;

        let record = SlotRecord {
            slot_id: coords.slot_id,
            key: loc.key_string.clone(),
            value: value.to_string(),
        };

        let required = record.line_len();
        if required > header.record_length {
            return Err(StoreError::GrowthRequired {
                path: path.clone(),
                kind: GrowthKind::RecordLength {
                    required,
                    current: header.record_length,
                },
            });
        }

        match place_slot(&mut file, &header, coords.slot_id, Intent::Insert)? {
            Placement::Hit { index, line } => {
                let stored = SlotRecord::from_hit(line, &file, index)?;
                if stored.key != loc.key_string {
                    return Err(StoreError::GrowthRequired {
                        path: path.clone(),
                        kind: GrowthKind::SlotIdConflict {
                            slot_id: coords.slot_id,
                        },
                    });
                }
                let offset = slot_offset(index, header.record_length);
                file.write_durable(offset, &record.encode(header.record_length))?;
                trace!(path = %path.display(), index, "slot updated");
                Ok(PutOutcome::Updated)
            }
            Placement::Vacant { index } => {
                let offset = slot_offset(index, header.record_length);
                file.write_durable(offset, &record.encode(header.record_length))?;
                header.record_count += 1;
                file.write_durable(0, &header.encode())?;
                trace!(path = %path.display(), index, "slot inserted");
                Ok(PutOutcome::Inserted)
            }
            Placement::Miss | Placement::Exhausted => Err(StoreError::GrowthRequired {
                path: path.clone(),
                kind: GrowthKind::SlotCount {
                    slot_count: header.slot_count,
                },
            }),
        }
    }

    /// Serialized value stored under `loc`.
    ///
    /// Stops at the first slot whose id matches: if that slot holds a
    /// different key the result is a `Collision` error, not a further probe.
    pub fn get(&self, loc: &Location) -> Result<Option<String>> {
        let path = &loc.coords.bucket_path;
        let Some(mut file) = ScopedFile::open_read(path)? else {
            return Ok(None);
        };
        let header = BucketHeader::read(&mut file, &self.name)?;

        match place_slot(
            &mut file,
            &header,
            loc.coords.slot_id,
            Intent::Lookup { full_record: true },
        )? {
            Placement::Hit { index, line } => {
                let record = SlotRecord::from_hit(line, &file, index)?;
                if record.key != loc.key_string {
                    return Err(StoreError::Collision {
                        path: path.clone(),
                        slot_id: loc.coords.slot_id,
                        stored_key: record.key,
                        requested_key: loc.key_string.clone(),
                    });
                }
                Ok(Some(record.value))
            }
            _ => Ok(None),
        }
    }

    /// Whether a slot with this id exists. Only the id field is compared;
    /// the stored key is not checked.
    pub fn has(&self, loc: &Location) -> Result<bool> {
        let path = &loc.coords.bucket_path;
        let Some(mut file) = ScopedFile::open_read(path)? else {
            return Ok(false);
        };
        let header = BucketHeader::read(&mut file, &self.name)?;

        let placement = place_slot(
            &mut file,
            &header,
            loc.coords.slot_id,
            Intent::Lookup { full_record: false },
        )?;
        Ok(matches!(placement, Placement::Hit { .. }))
    }

    /// Tombstone the slot with this id. `false` if nothing was there.
    pub fn delete(&self, loc: &Location) -> Result<bool> {
        let path = &loc.coords.bucket_path;
        let Some(mut file) = ScopedFile::open_write(path)? else {
            return Ok(false);
        };
        let mut header = BucketHeader::read(&mut file, &self.name)?;

        let Placement::Hit { index, .. } =
            place_slot(&mut file, &header, loc.coords.slot_id, Intent::Delete)?
        else {
            return Ok(false);
        };

        let offset = slot_offset(index, header.record_length);
        file.write_durable(offset, &blank_slot(header.record_length))?;
        header.record_count = header.record_count.saturating_sub(1);
        file.write_durable(0, &header.encode())?;

        trace!(path = %path.display(), index, "slot tombstoned");
        Ok(true)
    }

    /// Current record for a hash, used by entry log replay.
    /// `None` if the bucket file is missing or the slot is blank.
    pub fn read_record(&self, coords: &Coordinates) -> Result<Option<SlotRecord>> {
        let Some(mut file) = ScopedFile::open_read(&coords.bucket_path)? else {
            return Ok(None);
        };
        let header = BucketHeader::read(&mut file, &self.name)?;

        match place_slot(
            &mut file,
            &header,
            coords.slot_id,
            Intent::Lookup { full_record: true },
        )? {
            Placement::Hit { index, line } => Ok(Some(SlotRecord::from_hit(line, &file, index)?)),
            _ => Ok(None),
        }
    }

    /// Validated header of a bucket file, `None` if it does not exist
    pub fn header(&self, bucket_path: &Path) -> Result<Option<BucketHeader>> {
        match ScopedFile::open_read(bucket_path)? {
            Some(mut file) => Ok(Some(BucketHeader::read(&mut file, &self.name)?)),
            None => Ok(None),
        }
    }

    /// Every live record of a bucket file, in slot order
    pub fn records(&self, bucket_path: &Path) -> Result<Vec<SlotRecord>> {
        let Some(mut file) = ScopedFile::open_read(bucket_path)? else {
            return Ok(Vec::new());
        };
        let header = BucketHeader::read(&mut file, &self.name)?;
        growth::read_live_records(&mut file, &header)
    }

    /// Dictionary name the engine validates headers against
    pub fn name(&self) -> &str {
        &self.name
    }
}

