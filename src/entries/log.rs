//! Entry log reads and writes

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::durability::{ensure_dir, sync_dir, vanished, ScopedFile};
use crate::error::Result;
use crate::hash::{KeyHash, HASH_HEX_WIDTH};

use super::{EntryHeader, LINE_WIDTH};

/// The entry log of one dictionary
#[derive(Debug, Clone)]
pub struct EntryLog {
    path: PathBuf,
    name: String,
}

impl EntryLog {
    pub fn new(path: impl Into<PathBuf>, name: &str) -> Self {
        Self {
            path: path.into(),
            name: name.to_string(),
        }
    }

    /// Create the log with an empty header if it does not exist
    pub fn ensure(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            ensure_dir(dir)?;
        }
        let Some(mut file) = ScopedFile::create_new(&self.path)? else {
            return Ok(());
        };
        file.write_durable(0, &EntryHeader::new(&self.name).encode())?;
        file.sync_all()?;
        if let Some(dir) = self.path.parent() {
            sync_dir(dir)?;
        }
        debug!(path = %self.path.display(), "created entry log");
        Ok(())
    }

    /// Append a hash and bump both counters
    pub fn append(&self, hash: KeyHash) -> Result<()> {
        self.ensure()?;
        let mut file = ScopedFile::open_write(&self.path)?.ok_or_else(|| vanished(&self.path))?;
        let mut header = EntryHeader::read(&mut file, &self.name)?;

        let offset = EntryHeader::width(&self.name) as u64 + header.line_count * LINE_WIDTH;
        file.write_durable(offset, format!("{}\n", hash).as_bytes())?;

        header.line_count += 1;
        header.record_count += 1;
        file.write_durable(0, &header.encode())?;
        Ok(())
    }

    /// Decrement the live count. The logged line stays in place.
    pub fn decrement_live(&self) -> Result<()> {
        let Some(mut file) = ScopedFile::open_write(&self.path)? else {
            warn!(path = %self.path.display(), "decrement on a missing entry log");
            return Ok(());
        };
        let mut header = EntryHeader::read(&mut file, &self.name)?;
        header.record_count = header.record_count.saturating_sub(1);
        file.write_durable(0, &header.encode())?;
        Ok(())
    }

    /// Live record count; 0 before the first write
    pub fn size(&self) -> Result<u64> {
        Ok(self.header()?.map_or(0, |h| h.record_count))
    }

    /// Validated header, `None` if the log does not exist yet
    pub fn header(&self) -> Result<Option<EntryHeader>> {
        match ScopedFile::open_read(&self.path)? {
            Some(mut file) => Ok(Some(EntryHeader::read(&mut file, &self.name)?)),
            None => Ok(None),
        }
    }

    /// Scan the logged hashes from the first line
    pub fn hashes(&self) -> Result<HashLines> {
        let file = match ScopedFile::open_read(&self.path)? {
            Some(mut file) => {
                EntryHeader::read(&mut file, &self.name)?;
                Some(file)
            }
            None => None,
        };
        Ok(HashLines {
            file,
            offset: EntryHeader::width(&self.name) as u64,
            line: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Sequential reader over logged hashes. Stops at the first short read.
pub struct HashLines {
    file: Option<ScopedFile>,
    offset: u64,
    line: u64,
}

impl Iterator for HashLines {
    type Item = Result<KeyHash>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let file = self.file.as_mut()?;
            let mut buf = [0u8; LINE_WIDTH as usize];
            let n = match file.read_at(self.offset, &mut buf) {
                Ok(n) => n,
                Err(e) => {
                    self.file = None;
                    return Some(Err(e));
                }
            };
            if n < buf.len() {
                self.file = None;
                return None;
            }
            self.offset += LINE_WIDTH;
            self.line += 1;

            let parsed = std::str::from_utf8(&buf[..HASH_HEX_WIDTH])
                .ok()
                .filter(|_| buf[HASH_HEX_WIDTH] == b'\n')
                .and_then(KeyHash::from_hex);
            match parsed {
                Some(hash) => return Some(Ok(hash)),
                None => {
                    warn!(
                        path = %file.path().display(),
                        line = self.line - 1,
                        "skipping malformed entry log line"
                    );
                }
            }
        }
    }
}
