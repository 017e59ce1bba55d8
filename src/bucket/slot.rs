//! Slot records and the interpolation probe

use tracing::trace;

use crate::durability::ScopedFile;
use crate::error::{Result, StoreError};
use crate::sharder::{format_slot_id, SLOT_ID_HEX_WIDTH, SLOT_ID_RANGE};

use super::{BucketHeader, PROBE_WINDOW};

/// A decoded, occupied slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRecord {
    pub slot_id: u32,
    /// Serialized key, exactly as produced by the codec
    pub key: String,
    /// Serialized value
    pub value: String,
}

impl SlotRecord {
    /// Bytes the record needs, newline included
    pub fn line_len(&self) -> usize {
        SLOT_ID_HEX_WIDTH + 1 + self.key.len() + 1 + self.value.len() + 1
    }

    /// Padded slot line. Caller guarantees `line_len() <= record_length`.
    pub fn encode(&self, record_length: usize) -> Vec<u8> {
        let text = format!("{} {} {}", format_slot_id(self.slot_id), self.key, self.value);
        let mut line = text.into_bytes();
        line.resize(record_length.saturating_sub(1).max(line.len()), b' ');
        line.push(b'\n');
        line
    }

    /// Split a slot line on whitespace into id, key and value
    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();
        let id = fields.next()?;
        let key = fields.next()?;
        let value = fields.next()?;
        if fields.next().is_some() || id.len() != SLOT_ID_HEX_WIDTH {
            return None;
        }
        let slot_id = u32::from_str_radix(id, 16).ok()?;
        Some(Self {
            slot_id,
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    /// Parse the raw line of a probe hit
    pub(crate) fn from_hit(line: Option<String>, file: &ScopedFile, index: u64) -> Result<Self> {
        line.as_deref()
            .and_then(Self::parse)
            .ok_or_else(|| StoreError::CorruptRecord {
                path: file.path().to_path_buf(),
                index,
                reason: "slot line is not \"<id> <key> <value>\"".to_string(),
            })
    }
}

/// An empty or tombstoned slot
pub(crate) fn blank_slot(record_length: usize) -> Vec<u8> {
    let mut line = vec![b' '; record_length.saturating_sub(1)];
    line.push(b'\n');
    line
}

/// Index where `slot_id` would sit if slots were spread evenly
pub fn expected_index(slot_id: u32, slot_count: u64) -> u64 {
    ((slot_id as u128 * slot_count as u128) / SLOT_ID_RANGE as u128) as u64
}

/// The slot indices examined for `slot_id`, wrapping at the end of the table
pub fn probe_indices(slot_id: u32, slot_count: u64) -> impl Iterator<Item = u64> {
    let start = expected_index(slot_id, slot_count);
    (0..PROBE_WINDOW.min(slot_count)).map(move |step| (start + step) % slot_count)
}

/// Byte offset of slot `index`; the header takes the first record length
pub(crate) fn slot_offset(index: u64, record_length: usize) -> u64 {
    (index + 1) * record_length as u64
}

/// What the caller intends to do with the slot it is looking for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Intent {
    /// Find the slot holding `slot_id`, else the first free probe
    Insert,
    /// Find the slot holding `slot_id`; optionally read the whole line
    Lookup { full_record: bool },
    /// Find the slot holding `slot_id`
    Delete,
}

/// Outcome of a probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Placement {
    /// A slot whose id field matches. `line` is read for inserts and full lookups.
    Hit { index: u64, line: Option<String> },
    /// First free probe (insert only)
    Vacant { index: u64 },
    /// No id match in the window (lookup/delete)
    Miss,
    /// No id match and no free probe (insert)
    Exhausted,
}

/// Probe up to three slots starting at the interpolated position.
///
/// An id match wins over a free slot so that rewriting an existing key
/// never leaves a second copy further along the window.
pub(crate) fn place_slot(
    file: &mut ScopedFile,
    header: &BucketHeader,
    slot_id: u32,
    intent: Intent,
) -> Result<Placement> {
    let wanted = format_slot_id(slot_id);
    let mut first_vacant = None;

    for index in probe_indices(slot_id, header.slot_count) {
        let offset = slot_offset(index, header.record_length);
        let mut id_field = [0u8; SLOT_ID_HEX_WIDTH];
        let n = file.read_at(offset, &mut id_field)?;

        if n > 0 && id_field[0] == b' ' {
            trace!(index, "probe: empty slot");
            first_vacant.get_or_insert(index);
            continue;
        }
        if n < SLOT_ID_HEX_WIDTH {
            return Err(StoreError::CorruptRecord {
                path: file.path().to_path_buf(),
                index,
                reason: format!("truncated slot ({} bytes)", n),
            });
        }
        if id_field != wanted.as_bytes() {
            trace!(index, "probe: occupied by another slot id");
            continue;
        }

        trace!(index, slot_id = %wanted, "probe: hit");
        let wants_line = matches!(
            intent,
            Intent::Insert | Intent::Lookup { full_record: true }
        );
        let line = if wants_line {
            Some(read_line(file, index, header.record_length)?)
        } else {
            None
        };
        return Ok(Placement::Hit { index, line });
    }

    Ok(match (intent, first_vacant) {
        (Intent::Insert, Some(index)) => Placement::Vacant { index },
        (Intent::Insert, None) => Placement::Exhausted,
        _ => Placement::Miss,
    })
}

/// Read the full line of slot `index`, padding and newline stripped
pub(crate) fn read_line(file: &mut ScopedFile, index: u64, record_length: usize) -> Result<String> {
    let mut buf = vec![0u8; record_length];
    let n = file.read_at(slot_offset(index, record_length), &mut buf)?;
    if n != record_length {
        return Err(StoreError::CorruptRecord {
            path: file.path().to_path_buf(),
            index,
            reason: format!("short slot read: {} of {} bytes", n, record_length),
        });
    }
    let line = String::from_utf8(buf).map_err(|_| StoreError::CorruptRecord {
        path: file.path().to_path_buf(),
        index,
        reason: "slot is not valid UTF-8".to_string(),
    })?;
    Ok(line.trim_end().to_string())
}
