//! Key hashing
//!
//! Deterministic, non-cryptographic 64-bit digests used only for addressing.

use std::fmt;
use std::hash::Hasher;

use twox_hash::XxHash64;

/// Width of a rendered hash: 16 lowercase hex digits
pub const HASH_HEX_WIDTH: usize = 16;

/// Maps a serialized key to a 64-bit digest
///
/// Implemented for plain closures so tests can force collisions.
pub trait KeyHasher: Send + Sync {
    fn hash(&self, key: &str) -> u64;
}

impl<F> KeyHasher for F
where
    F: Fn(&str) -> u64 + Send + Sync,
{
    fn hash(&self, key: &str) -> u64 {
        self(key)
    }
}

/// xxHash64 with seed 0
#[derive(Debug, Clone, Copy, Default)]
pub struct XxKeyHasher;

impl KeyHasher for XxKeyHasher {
    fn hash(&self, key: &str) -> u64 {
        let mut h = XxHash64::with_seed(0);
        h.write(key.as_bytes());
        h.finish()
    }
}

/// A key digest. Displays as 16 zero-padded lowercase hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyHash(pub u64);

impl KeyHash {
    /// Render as the fixed-width hex form used in file names and the entry log
    pub fn to_hex(self) -> String {
        format!("{:016x}", self.0)
    }

    /// Parse exactly 16 hex digits
    pub fn from_hex(text: &str) -> Option<Self> {
        if text.len() != HASH_HEX_WIDTH || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        u64::from_str_radix(text, 16).ok().map(KeyHash)
    }
}

impl fmt::Display for KeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
