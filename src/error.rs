//! Error types for StrongMap
//!
//! Provides a unified error type for all operations.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for StrongMap operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // On-disk Format Errors
    // -------------------------------------------------------------------------
    /// Magic/version prefix or dictionary name mismatch. Never retried.
    #[error("Corrupt header in {}: {reason}", path.display())]
    CorruptHeader { path: PathBuf, reason: String },

    #[error("Corrupt record at slot {index} of {}: {reason}", path.display())]
    CorruptRecord {
        path: PathBuf,
        index: u64,
        reason: String,
    },

    // -------------------------------------------------------------------------
    // Addressing Errors
    // -------------------------------------------------------------------------
    /// A slot id matched but the stored key is a different key.
    #[error(
        "Collision in {} at slot id {slot_id:07x}: stored key {stored_key} differs from {requested_key}",
        path.display()
    )]
    Collision {
        path: PathBuf,
        slot_id: u32,
        stored_key: String,
        requested_key: String,
    },

    #[error("Growth required for {}: {kind}", path.display())]
    GrowthRequired { path: PathBuf, kind: GrowthKind },

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Why a bucket file cannot accept a record as it stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrowthKind {
    /// The encoded slot line is longer than the bucket's record length
    RecordLength { required: usize, current: usize },

    /// None of the probed slots is free
    SlotCount { slot_count: u64 },

    /// A different key already owns this slot id; growing cannot separate them
    SlotIdConflict { slot_id: u32 },
}

impl fmt::Display for GrowthKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrowthKind::RecordLength { required, current } => write!(
                f,
                "record needs {} bytes but slots are {} bytes",
                required, current
            ),
            GrowthKind::SlotCount { slot_count } => {
                write!(f, "no free slot in probe window of {} slots", slot_count)
            }
            GrowthKind::SlotIdConflict { slot_id } => {
                write!(f, "slot id {:07x} is owned by another key", slot_id)
            }
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl StoreError {
    /// True for the growth-required family of errors
    pub fn is_growth_required(&self) -> bool {
        matches!(self, StoreError::GrowthRequired { .. })
    }
}
