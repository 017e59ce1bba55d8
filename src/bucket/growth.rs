//! Bucket growth
//!
//! Rehash one bucket file into a larger table:
//! 1. Read every live slot back (id, key and value strings)
//! 2. Size the new table: longer records and/or more slots
//! 3. Re-run placement for each record, adding slots until all fit along
//!    with the record waiting to be inserted
//! 4. Write `<bucket>.dat.grow`, sync, rename over the original, sync the dir
//!
//! The bucket keeps its path. Hashes do not change, so the entry log is
//! left alone.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::durability::{sync_dir, vanished, ScopedFile};
use crate::error::{GrowthKind, Result, StoreError};
use crate::sharder::SLOT_ID_RANGE;

use super::slot::{blank_slot, probe_indices, read_line, SlotRecord};
use super::{BucketHeader, GROW_SUFFIX};

/// Layout attempts before giving up on placing every record
const MAX_LAYOUT_ROUNDS: usize = 64;

/// `ceil(n * factor)`, always at least `n + 1`
pub(crate) fn scale(n: u64, factor: f64) -> u64 {
    ((n as f64 * factor).ceil() as u64).max(n + 1)
}

/// Grow the bucket at `path` so that `kind` no longer applies.
///
/// `pending` is the record the caller is about to write. The new table is
/// sized so that its probe window keeps a free slot; the slot itself is
/// left blank for the caller's retry. Returns the header of the rewritten file.
pub(crate) fn grow(
    path: &Path,
    name: &str,
    kind: &GrowthKind,
    factor: f64,
    pending: &SlotRecord,
) -> Result<BucketHeader> {
    let mut file = ScopedFile::open_read(path)?.ok_or_else(|| vanished(path))?;
    let header = BucketHeader::read(&mut file, name)?;
    let records = read_live_records(&mut file, &header)?;
    drop(file);

    let mut record_length = header.record_length;
    let mut slot_count = header.slot_count;
    match kind {
        GrowthKind::RecordLength { required, .. } => {
            record_length = record_length.max(scale(*required as u64, factor) as usize);
        }
        GrowthKind::SlotCount { .. } => {
            slot_count = scale(slot_count, factor);
        }
        GrowthKind::SlotIdConflict { .. } => {
            return Err(StoreError::GrowthRequired {
                path: path.to_path_buf(),
                kind: kind.clone(),
            });
        }
    }

    // an update reuses its own slot; only a new slot id needs room
    let reserve = !records.iter().any(|r| r.slot_id == pending.slot_id);

    let mut rounds = 0;
    let table = loop {
        if let Some(table) = layout(&records, reserve.then_some(pending), slot_count) {
            break table;
        }
        rounds += 1;
        if rounds >= MAX_LAYOUT_ROUNDS || slot_count >= SLOT_ID_RANGE {
            return Err(StoreError::GrowthRequired {
                path: path.to_path_buf(),
                kind: GrowthKind::SlotCount { slot_count },
            });
        }
        slot_count = scale(slot_count, factor);
    };

    let new_header = BucketHeader {
        name: name.to_string(),
        record_length,
        record_count: records.len() as u64,
        slot_count,
    };

    let mut bytes = Vec::with_capacity(new_header.file_len() as usize);
    bytes.extend_from_slice(&new_header.encode());
    for slot in &table {
        match slot {
            Some(i) => bytes.extend_from_slice(&records[*i].encode(record_length)),
            None => bytes.extend_from_slice(&blank_slot(record_length)),
        }
    }

    let scratch = scratch_path(path);
    {
        let mut out = ScopedFile::create_truncate(&scratch)?;
        out.write_durable(0, &bytes)?;
        out.sync_all()?;
    }
    fs::rename(&scratch, path)?;
    if let Some(dir) = path.parent() {
        sync_dir(dir)?;
    }

    debug!(
        path = %path.display(),
        %kind,
        old_record_length = header.record_length,
        record_length,
        old_slot_count = header.slot_count,
        slot_count,
        records = records.len(),
        "bucket grown"
    );

    Ok(new_header)
}

/// Every occupied slot in index order
pub(crate) fn read_live_records(file: &mut ScopedFile, header: &BucketHeader) -> Result<Vec<SlotRecord>> {
    let mut records = Vec::with_capacity(header.record_count as usize);
    for index in 0..header.slot_count {
        let line = read_line(file, index, header.record_length)?;
        if line.is_empty() {
            continue;
        }
        records.push(SlotRecord::from_hit(Some(line), file, index)?);
    }
    Ok(records)
}

/// Assign each record a slot using the same probe as live inserts.
/// `None` if some record finds its whole window taken, or if `pending`
/// would find no free slot once every record is placed.
fn layout(
    records: &[SlotRecord],
    pending: Option<&SlotRecord>,
    slot_count: u64,
) -> Option<Vec<Option<usize>>> {
    let mut table: Vec<Option<usize>> = vec![None; slot_count as usize];
    for (i, record) in records.iter().enumerate() {
        let index = probe_indices(record.slot_id, slot_count).find(|&idx| table[idx as usize].is_none())?;
        table[index as usize] = Some(i);
    }
    if let Some(pending) = pending {
        probe_indices(pending.slot_id, slot_count).find(|&idx| table[idx as usize].is_none())?;
    }
    Some(table)
}

fn scratch_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(GROW_SUFFIX);
    PathBuf::from(name)
}
