//! Durability Layer
//!
//! Every open file is a [`ScopedFile`]: the handle travels with its path and
//! is released when the scope ends. Mutating writes go through
//! [`ScopedFile::write_durable`], which forces a flush to storage before and
//! after the write. There is no batching: one logical write, one flush pair.
//!
//! There is no locking either. Header read-modify-write sequences from two
//! processes sharing a root and name can interleave and lose an update.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::error::{Result, StoreError};

/// An open file handle paired with its path
pub struct ScopedFile {
    file: File,
    path: PathBuf,
}

impl ScopedFile {
    /// Open for reading. `Ok(None)` if the file does not exist.
    pub fn open_read(path: &Path) -> Result<Option<Self>> {
        Self::open_with(path, OpenOptions::new().read(true))
    }

    /// Open for reading and writing. `Ok(None)` if the file does not exist.
    pub fn open_write(path: &Path) -> Result<Option<Self>> {
        Self::open_with(path, OpenOptions::new().read(true).write(true))
    }

    /// Exclusive creation. `Ok(None)` if the file already exists.
    pub fn create_new(path: &Path) -> Result<Option<Self>> {
        match OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
        {
            Ok(file) => Ok(Some(Self::acquired(file, path))),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Create or truncate (scratch files only)
    pub fn create_truncate(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self::acquired(file, path))
    }

    fn open_with(path: &Path, options: &OpenOptions) -> Result<Option<Self>> {
        match options.open(path) {
            Ok(file) => Ok(Some(Self::acquired(file, path))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn acquired(file: File, path: &Path) -> Self {
        trace!(path = %path.display(), "acquired file handle");
        Self {
            file,
            path: path.to_path_buf(),
        }
    }

    /// Read into `buf` starting at `offset`. Returns the number of bytes
    /// read, which is short only at end of file.
    pub fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        self.file.seek(SeekFrom::Start(offset))?;
        let mut filled = 0;
        while filled < buf.len() {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled)
    }

    /// Write `bytes` at `offset` with a forced flush before and after
    pub fn write_durable(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        self.file.sync_data()?;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(bytes)?;
        self.file.sync_data()?;
        Ok(())
    }

    /// Flush data and metadata
    pub fn sync_all(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScopedFile {
    fn drop(&mut self) {
        trace!(path = %self.path.display(), "released file handle");
    }
}

/// Make a rename or creation inside `dir` durable
pub fn sync_dir(dir: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        File::open(dir)?.sync_all()?;
    }
    #[cfg(not(unix))]
    {
        let _ = dir;
    }
    Ok(())
}

/// Create `dir` and its parents
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    Ok(())
}

/// A file that was just created or opened is gone
pub(crate) fn vanished(path: &Path) -> StoreError {
    StoreError::Io(std::io::Error::new(
        ErrorKind::NotFound,
        format!("{} disappeared", path.display()),
    ))
}
