//! Store Module
//!
//! The typed dictionary façade that composes the other components.
//!
//! ## Responsibilities
//! - Resolve the dictionary name (random when not configured) and root
//! - Route set/get/has/delete through the sharder to the bucket engine
//! - Keep the entry log in step with first insertions and deletions
//! - Project entry log replay into entries/keys/values iterators

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::bucket::{BucketEngine, PutOutcome};
use crate::codec;
use crate::config::{generate_name, validate_name, Config};
use crate::entries::{EntryLog, EntryStream};
use crate::error::Result;
use crate::sharder::Sharder;

/// A persistent dictionary from `K` to `V`
///
/// ## Concurrency Model: single thread, no locking
///
/// - Every call does its file I/O on the caller's thread and returns once
///   the write (and its forced flush) has landed
/// - Mutations take `&mut self`; reads and scans take `&self`
/// - Two processes opening the same root + name are NOT coordinated:
///   header counters are read-modify-write and concurrent writers can
///   lose updates
/// - A `set` writes the bucket slot before the entry log line; see
///   [`set`](Self::set) for how a failed log append is handled
pub struct StrongMap<K, V> {
    /// Configuration this map was opened with
    config: Config,

    /// Resolved dictionary name
    name: String,

    /// Key → bucket file + slot id
    sharder: Sharder,

    /// Slot-level reads and writes
    buckets: BucketEngine,

    /// Hash log for size and enumeration
    entries: EntryLog,

    /// Set once any mutating call has been made
    written: bool,

    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> StrongMap<K, V> {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const DICTS_DIR: &'static str = "dicts";
    const KEYS_DIR: &'static str = "keys";
    const ENTRIES_FILENAME: &'static str = "entries.dat";

    /// Open a dictionary. Nothing is created on disk until the first write.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let name = match &config.name {
            Some(name) => name.clone(),
            None => {
                let name = generate_name();
                debug!(name = %name, "generated dictionary name");
                name
            }
        };

        let (sharder, buckets, entries) = Self::components(&config, &name);
        Ok(Self {
            config,
            name,
            sharder,
            buckets,
            entries,
            written: false,
            _marker: PhantomData,
        })
    }

    /// Open with a root and name (convenience method)
    pub fn open_path(root: &Path, name: &str) -> Result<Self> {
        Self::open(Config::builder().root(root).name(name).build())
    }

    fn components(config: &Config, name: &str) -> (Sharder, BucketEngine, EntryLog) {
        let dict_dir = Self::dictionary_dir_for(&config.root, name);
        let sharder = Sharder::new(dict_dir.join(Self::KEYS_DIR), config.hasher.clone());
        let buckets = BucketEngine::new(name, config);
        let entries = EntryLog::new(dict_dir.join(Self::ENTRIES_FILENAME), name);
        (sharder, buckets, entries)
    }

    fn dictionary_dir_for(root: &Path, name: &str) -> PathBuf {
        root.join(Self::DICTS_DIR).join(name)
    }

    fn rebuild(&mut self) {
        let (sharder, buckets, entries) = Self::components(&self.config, &self.name);
        self.sharder = sharder;
        self.buckets = buckets;
        self.entries = entries;
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Point the map at another dictionary name.
    ///
    /// Existing files are not migrated: after a write this simply switches
    /// to a different (possibly new) dictionary.
    pub fn set_name(&mut self, name: impl Into<String>) -> Result<&mut Self> {
        let name = name.into();
        validate_name(&name)?;
        if self.written {
            warn!(from = %self.name, to = %name, "dictionary renamed after first write; files are not migrated");
        }
        self.config.name = Some(name.clone());
        self.name = name;
        self.rebuild();
        Ok(self)
    }

    /// Point the map at another root directory. Same caveat as [`set_name`](Self::set_name).
    pub fn set_root(&mut self, root: impl Into<PathBuf>) -> &mut Self {
        let root = root.into();
        if self.written {
            warn!(from = %self.config.root.display(), to = %root.display(), "root changed after first write; files are not migrated");
        }
        self.config.root = root;
        self.rebuild();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// `<root>/dicts/<name>`
    pub fn dictionary_dir(&self) -> PathBuf {
        Self::dictionary_dir_for(&self.config.root, &self.name)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Sharder used to address keys (for inspection and tests)
    pub fn sharder(&self) -> &Sharder {
        &self.sharder
    }

    /// Bucket engine (for inspection and tests)
    pub fn buckets(&self) -> &BucketEngine {
        &self.buckets
    }

    /// Entry log (for inspection and tests)
    pub fn entry_log(&self) -> &EntryLog {
        &self.entries
    }

    // =========================================================================
    // Dictionary Operations
    // =========================================================================

    /// Store `value` under `key`. Returns the map for chaining.
    ///
    /// Steps:
    /// 1. Serialize key and value, compute coordinates
    /// 2. Write the slot (growing the bucket if needed)
    /// 3. On first occupancy, append the hash to the entry log
    ///
    /// If step 3 fails the new slot is tombstoned again before the error is
    /// returned, so size and enumeration never miss a stored key. Should
    /// that tombstone write fail too, the slot stays occupied without a log
    /// line and an `error!` records the key.
    pub fn set(&mut self, key: &K, value: &V) -> Result<&mut Self>
    where
        K: Serialize,
        V: Serialize,
    {
        let loc = self.sharder.locate(key)?;
        let value_string = codec::stringify(value)?;
        self.written = true;

        if self.buckets.put(&loc, &value_string)? == PutOutcome::Inserted {
            if let Err(e) = self.entries.append(loc.coords.hash) {
                match self.buckets.delete(&loc) {
                    Ok(_) => {
                        warn!(hash = %loc.coords.hash, error = %e, "entry log append failed; insert rolled back");
                    }
                    Err(rollback) => {
                        error!(
                            hash = %loc.coords.hash,
                            key = %loc.key_string,
                            error = %e,
                            rollback_error = %rollback,
                            "entry log append failed and slot could not be cleared; entry log is behind"
                        );
                    }
                }
                return Err(e);
            }
        }
        Ok(self)
    }

    /// Value stored under `key`, `None` if absent.
    ///
    /// Keys compare by serialized form, so any type that serializes like
    /// `K` can be used to look up.
    pub fn get<Q>(&self, key: &Q) -> Result<Option<V>>
    where
        Q: Serialize + ?Sized,
        V: DeserializeOwned,
    {
        let loc = self.sharder.locate(key)?;
        match self.buckets.get(&loc)? {
            Some(value) => Ok(Some(codec::parse(&value)?)),
            None => Ok(None),
        }
    }

    /// Whether a record with `key`'s slot id exists.
    ///
    /// Weaker than [`get`](Self::get): the stored key is not compared, so a
    /// different key sharing the full hash also answers `true`.
    pub fn has<Q>(&self, key: &Q) -> Result<bool>
    where
        Q: Serialize + ?Sized,
    {
        let loc = self.sharder.locate(key)?;
        self.buckets.has(&loc)
    }

    /// Tombstone `key`. `true` only if a live record was removed.
    pub fn delete<Q>(&mut self, key: &Q) -> Result<bool>
    where
        Q: Serialize + ?Sized,
    {
        let loc = self.sharder.locate(key)?;
        self.written = true;

        if !self.buckets.delete(&loc)? {
            return Ok(false);
        }
        self.entries.decrement_live()?;
        Ok(true)
    }

    /// Live record count from the entry log header
    pub fn size(&self) -> Result<u64> {
        self.entries.size()
    }

    /// Lazy `(key, value)` pairs. Each call rescans from the start.
    pub fn entries(&self) -> Result<Entries<'_, K, V>> {
        Ok(Entries {
            stream: self.stream()?,
            _marker: PhantomData,
        })
    }

    /// Lazy keys
    pub fn keys(&self) -> Result<impl Iterator<Item = Result<K>> + '_>
    where
        K: DeserializeOwned,
    {
        Ok(self
            .stream()?
            .map(|record| record.and_then(|r| codec::parse::<K>(&r.key))))
    }

    /// Lazy values
    pub fn values(&self) -> Result<impl Iterator<Item = Result<V>> + '_>
    where
        V: DeserializeOwned,
    {
        Ok(self
            .stream()?
            .map(|record| record.and_then(|r| codec::parse::<V>(&r.value))))
    }

    fn stream(&self) -> Result<EntryStream<'_>> {
        Ok(EntryStream::new(
            self.entries.hashes()?,
            &self.sharder,
            &self.buckets,
        ))
    }
}

/// Iterator over decoded `(key, value)` pairs
pub struct Entries<'a, K, V> {
    stream: EntryStream<'a>,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> Iterator for Entries<'_, K, V>
where
    K: DeserializeOwned,
    V: DeserializeOwned,
{
    type Item = Result<(K, V)>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.stream.next()? {
            Ok(record) => record,
            Err(e) => return Some(Err(e)),
        };
        let decoded = codec::parse::<K>(&record.key)
            .and_then(|key| Ok((key, codec::parse::<V>(&record.value)?)));
        Some(decoded)
    }
}
