//! Configuration for StrongMap
//!
//! Centralized configuration with sensible defaults.
//!
//! `root` and `name` are not persisted anywhere: every process that wants to
//! see the same dictionary must supply the same pair.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use rand::Rng;

use crate::error::{Result, StoreError};
use crate::hash::{KeyHasher, XxKeyHasher};

/// Default bytes per slot for a freshly created bucket file
pub const DEFAULT_RECORD_LENGTH: usize = 128;

/// Grow factor applied to record length and slot count
pub const DEFAULT_GROWTH_FACTOR: f64 = 1.618;

/// Main configuration for a StrongMap dictionary
#[derive(Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Dictionary Identity
    // -------------------------------------------------------------------------
    /// Base directory. Internal structure:
    ///   {root}/dicts/{name}/
    ///     ├── entries.dat              (entry log)
    ///     └── keys/{d1}/{d2}/{id}.dat  (bucket files)
    pub root: PathBuf,

    /// Dictionary name. A random base-36 name is generated when unset.
    pub name: Option<String>,

    // -------------------------------------------------------------------------
    // Bucket Configuration
    // -------------------------------------------------------------------------
    /// Bytes per slot for new bucket files (raised if the header needs more)
    pub initial_record_length: usize,

    /// Multiplier used when a bucket grows
    pub growth_factor: f64,

    /// What to do when a bucket needs more slots or longer records
    pub growth: GrowthPolicy,

    // -------------------------------------------------------------------------
    // Addressing
    // -------------------------------------------------------------------------
    /// Hash function used to address keys
    pub hasher: Arc<dyn KeyHasher>,
}

/// Bucket growth policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthPolicy {
    /// Rehash the bucket file and retry, at most `max_rounds` times per write
    Automatic { max_rounds: usize },

    /// Surface `GrowthRequired` to the caller
    Disabled,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            name: None,
            initial_record_length: DEFAULT_RECORD_LENGTH,
            growth_factor: DEFAULT_GROWTH_FACTOR,
            growth: GrowthPolicy::Automatic { max_rounds: 16 },
            hasher: Arc::new(XxKeyHasher),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("root", &self.root)
            .field("name", &self.name)
            .field("initial_record_length", &self.initial_record_length)
            .field("growth_factor", &self.growth_factor)
            .field("growth", &self.growth)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the on-disk format cannot represent
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if self.growth_factor.is_nan() || self.growth_factor <= 1.0 {
            return Err(StoreError::Config(format!(
                "growth factor must be greater than 1, got {}",
                self.growth_factor
            )));
        }
        if self.initial_record_length < 2 {
            return Err(StoreError::Config(
                "initial record length must be at least 2 bytes".to_string(),
            ));
        }
        Ok(())
    }
}

/// A dictionary name ends up as a header token and a directory name
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(StoreError::Config("dictionary name is empty".to_string()));
    }
    if name == "." || name == ".." {
        return Err(StoreError::Config(format!("invalid dictionary name {:?}", name)));
    }
    if name.chars().any(|c| c.is_whitespace() || c == '/' || c == '\\') {
        return Err(StoreError::Config(format!(
            "dictionary name {:?} contains whitespace or a path separator",
            name
        )));
    }
    Ok(())
}

/// Random base-36 dictionary name
pub fn generate_name() -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut n: u64 = rand::thread_rng().gen();
    let mut out = Vec::new();
    loop {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
        if n == 0 {
            break;
        }
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the root directory
    pub fn root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.root = path.into();
        self
    }

    /// Set the dictionary name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = Some(name.into());
        self
    }

    /// Set the slot width for new bucket files
    pub fn initial_record_length(mut self, len: usize) -> Self {
        self.config.initial_record_length = len;
        self
    }

    /// Set the growth factor
    pub fn growth_factor(mut self, factor: f64) -> Self {
        self.config.growth_factor = factor;
        self
    }

    /// Set the growth policy
    pub fn growth(mut self, policy: GrowthPolicy) -> Self {
        self.config.growth = policy;
        self
    }

    /// Replace the key hash function
    pub fn hasher(mut self, hasher: Arc<dyn KeyHasher>) -> Self {
        self.config.hasher = hasher;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
