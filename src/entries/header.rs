//! Entry log header

use std::path::Path;

use crate::durability::ScopedFile;
use crate::error::{Result, StoreError};

use super::ENTRIES_MAGIC;

const MAX_COUNT_DIGITS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHeader {
    pub name: String,
    /// Live records: incremented on insert, decremented on delete
    pub record_count: u64,
    /// Lines ever appended; never decreases
    pub line_count: u64,
}

impl EntryHeader {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            record_count: 0,
            line_count: 0,
        }
    }

    /// Header width for a dictionary name, newline included
    pub fn width(name: &str) -> usize {
        ENTRIES_MAGIC.len() + 1 + name.len() + 2 * (1 + MAX_COUNT_DIGITS) + 1
    }

    pub fn encode(&self) -> Vec<u8> {
        let text = format!(
            "{} {} {} {}",
            ENTRIES_MAGIC, self.name, self.record_count, self.line_count
        );
        let mut line = text.into_bytes();
        line.resize(Self::width(&self.name) - 1, b' ');
        line.push(b'\n');
        line
    }

    pub fn read(file: &mut ScopedFile, expected_name: &str) -> Result<Self> {
        let width = Self::width(expected_name);
        let mut buf = vec![0u8; width];
        let n = file.read_at(0, &mut buf)?;
        let text = String::from_utf8_lossy(&buf[..n]);
        let line = text.split('\n').next().unwrap_or_default();
        Self::parse(line, expected_name, file.path())
    }

    pub fn parse(line: &str, expected_name: &str, path: &Path) -> Result<Self> {
        let corrupt = |reason: String| StoreError::CorruptHeader {
            path: path.to_path_buf(),
            reason,
        };

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.first() != Some(&ENTRIES_MAGIC) {
            return Err(corrupt(format!("bad magic {:?}", fields.first())));
        }
        if fields.get(1) != Some(&expected_name) {
            return Err(corrupt(format!(
                "belongs to dictionary {:?}, expected {:?}",
                fields.get(1),
                expected_name
            )));
        }
        if fields.len() != 4 {
            return Err(corrupt(format!("expected 4 fields, found {}", fields.len())));
        }

        let record_count = fields[2]
            .parse::<u64>()
            .map_err(|_| corrupt(format!("bad record count {:?}", fields[2])))?;
        let line_count = fields[3]
            .parse::<u64>()
            .map_err(|_| corrupt(format!("bad line count {:?}", fields[3])))?;

        Ok(Self {
            name: expected_name.to_string(),
            record_count,
            line_count,
        })
    }
}
