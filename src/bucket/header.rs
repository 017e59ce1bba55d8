//! Bucket header
//!
//! Space separated fields padded to one record length.

use std::path::Path;

use crate::durability::ScopedFile;
use crate::error::{Result, StoreError};

use super::BUCKET_MAGIC;

/// Widest decimal rendering of a u64
const MAX_COUNT_DIGITS: usize = 20;

/// Parsed bucket header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketHeader {
    pub name: String,
    /// Bytes per slot, newline included. The header occupies one slot width.
    pub record_length: usize,
    /// Occupied slots
    pub record_count: u64,
    /// Total slots
    pub slot_count: u64,
}

impl BucketHeader {
    /// Header of a freshly created bucket: one empty slot
    pub fn new(name: &str, record_length: usize) -> Self {
        Self {
            name: name.to_string(),
            record_length,
            record_count: 0,
            slot_count: 1,
        }
    }

    /// Smallest record length whose header line fits any counter values
    pub fn min_record_length(name: &str) -> usize {
        BUCKET_MAGIC.len() + 1 + name.len() + 3 * (1 + MAX_COUNT_DIGITS) + 1
    }

    /// Padded header line, `record_length` bytes including the newline
    pub fn encode(&self) -> Vec<u8> {
        let text = format!(
            "{} {} {} {} {}",
            BUCKET_MAGIC, self.name, self.record_length, self.record_count, self.slot_count
        );
        let mut line = text.into_bytes();
        let width = self.record_length.saturating_sub(1).max(line.len());
        line.resize(width, b' ');
        line.push(b'\n');
        line
    }

    /// Read and validate the header of an open bucket file
    pub fn read(file: &mut ScopedFile, expected_name: &str) -> Result<Self> {
        let mut buf = vec![0u8; Self::min_record_length(expected_name)];
        let n = file.read_at(0, &mut buf)?;
        let text = String::from_utf8_lossy(&buf[..n]);
        let line = text.split('\n').next().unwrap_or_default();
        Self::parse(line, expected_name, file.path())
    }

    /// Parse a header line, checking magic, dictionary name and counters
    pub fn parse(line: &str, expected_name: &str, path: &Path) -> Result<Self> {
        let corrupt = |reason: String| StoreError::CorruptHeader {
            path: path.to_path_buf(),
            reason,
        };

        let fields: Vec<&str> = line.split_whitespace().collect();

        match fields.first() {
            Some(&magic) if magic == BUCKET_MAGIC => {}
            Some(magic) => return Err(corrupt(format!("bad magic {:?}", magic))),
            None => return Err(corrupt("empty header".to_string())),
        }

        match fields.get(1) {
            Some(&name) if name == expected_name => {}
            Some(name) => {
                return Err(corrupt(format!(
                    "belongs to dictionary {:?}, expected {:?}",
                    name, expected_name
                )))
            }
            None => return Err(corrupt("missing dictionary name".to_string())),
        }

        if fields.len() != 5 {
            return Err(corrupt(format!("expected 5 fields, found {}", fields.len())));
        }

        let number = |idx: usize, what: &str| -> Result<u64> {
            fields[idx]
                .parse::<u64>()
                .map_err(|_| corrupt(format!("bad {} {:?}", what, fields[idx])))
        };

        let record_length = number(2, "record length")? as usize;
        let record_count = number(3, "record count")?;
        let slot_count = number(4, "slot count")?;

        if record_length < 2 || slot_count == 0 || record_count > slot_count {
            return Err(corrupt(format!(
                "inconsistent counters: recordLength={} recordCount={} slotCount={}",
                record_length, record_count, slot_count
            )));
        }

        Ok(Self {
            name: expected_name.to_string(),
            record_length,
            record_count,
            slot_count,
        })
    }

    /// Total file length implied by the header
    pub fn file_len(&self) -> u64 {
        (self.slot_count + 1) * self.record_length as u64
    }
}
