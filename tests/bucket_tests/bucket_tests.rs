//! Tests for the Bucket Engine
//!
//! These tests verify:
//! - Lazy bucket file creation and header layout
//! - Insert vs. update in place
//! - Lookup, existence check and tombstoning
//! - Header integrity (magic, dictionary name)
//! - The get/has asymmetry on shared slot ids

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use strongmap::bucket::{BucketEngine, PutOutcome};
use strongmap::hash::{KeyHasher, XxKeyHasher};
use strongmap::sharder::{format_slot_id, Location, Sharder};
use strongmap::{Config, StoreError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

const NAME: &str = "bucket-test";

fn setup_engine() -> (TempDir, Sharder, BucketEngine) {
    setup_engine_with_hasher(Arc::new(XxKeyHasher))
}

fn setup_engine_with_hasher(hasher: Arc<dyn KeyHasher>) -> (TempDir, Sharder, BucketEngine) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder().root(temp_dir.path()).name(NAME).build();
    let sharder = Sharder::new(temp_dir.path().join("keys"), hasher);
    let engine = BucketEngine::new(NAME, &config);
    (temp_dir, sharder, engine)
}

/// Hasher that pins selected serialized keys to chosen hashes
fn pinned_hasher(pins: &[(&str, u64)]) -> Arc<dyn KeyHasher> {
    let pins: HashMap<String, u64> = pins.iter().map(|(k, h)| (k.to_string(), *h)).collect();
    Arc::new(move |key: &str| pins.get(key).copied().unwrap_or_else(|| XxKeyHasher.hash(key)))
}

fn locate(sharder: &Sharder, key: u32) -> Location {
    sharder.locate(&key).unwrap()
}

fn read_file(path: &PathBuf) -> String {
    String::from_utf8(fs::read(path).unwrap()).unwrap()
}

// =============================================================================
// File Creation Tests
// =============================================================================

#[test]
fn test_ensure_file_creates_single_slot_table() {
    let (_temp, sharder, engine) = setup_engine();
    let loc = locate(&sharder, 1);

    engine.ensure_file(&loc.coords).unwrap();

    let header = engine.header(&loc.coords.bucket_path).unwrap().unwrap();
    assert_eq!(header.record_length, 128);
    assert_eq!(header.record_count, 0);
    assert_eq!(header.slot_count, 1);

    let bytes = fs::read(&loc.coords.bucket_path).unwrap();
    assert_eq!(bytes.len(), 256);
    assert!(bytes[128..255].iter().all(|&b| b == b' '));
    assert_eq!(bytes[255], b'\n');
}

#[test]
fn test_ensure_file_is_idempotent() {
    let (_temp, sharder, engine) = setup_engine();
    let loc = locate(&sharder, 1);

    engine.put(&loc, "2").unwrap();
    engine.ensure_file(&loc.coords).unwrap();

    assert_eq!(engine.get(&loc).unwrap(), Some("2".to_string()));
}

#[test]
fn test_record_length_raised_for_long_names() {
    let temp_dir = TempDir::new().unwrap();
    let name = "n".repeat(100);
    let config = Config::builder().root(temp_dir.path()).name(name.as_str()).build();
    let sharder = Sharder::new(temp_dir.path().join("keys"), Arc::new(XxKeyHasher));
    let engine = BucketEngine::new(&name, &config);
    let loc = locate(&sharder, 1);

    engine.put(&loc, "2").unwrap();

    let header = engine.header(&loc.coords.bucket_path).unwrap().unwrap();
    assert!(header.record_length > 128);
    assert_eq!(engine.get(&loc).unwrap(), Some("2".to_string()));
}

#[test]
fn test_missing_bucket_reads_as_absent() {
    let (_temp, sharder, engine) = setup_engine();
    let loc = locate(&sharder, 7);

    assert_eq!(engine.get(&loc).unwrap(), None);
    assert!(!engine.has(&loc).unwrap());
    assert!(!engine.delete(&loc).unwrap());
    assert!(engine.header(&loc.coords.bucket_path).unwrap().is_none());
    assert!(!loc.coords.bucket_path.exists());
}

// =============================================================================
// Put Tests
// =============================================================================

#[test]
fn test_put_writes_slot_line() {
    let (_temp, sharder, engine) = setup_engine();
    let loc = locate(&sharder, 1);

    let outcome = engine.put(&loc, "2").unwrap();

    assert_eq!(outcome, PutOutcome::Inserted);
    let text = read_file(&loc.coords.bucket_path);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with(&format!("STRONGMAP_BUCKET_V1 {} 128 1 1", NAME)));
    assert_eq!(
        lines[1].trim_end(),
        format!("{} 1 2", format_slot_id(loc.coords.slot_id))
    );
}

#[test]
fn test_put_same_key_updates_in_place() {
    let (_temp, sharder, engine) = setup_engine();
    let loc = locate(&sharder, 1);

    assert_eq!(engine.put(&loc, "2").unwrap(), PutOutcome::Inserted);
    assert_eq!(engine.put(&loc, "3").unwrap(), PutOutcome::Updated);

    let header = engine.header(&loc.coords.bucket_path).unwrap().unwrap();
    assert_eq!(header.record_count, 1);
    assert_eq!(engine.get(&loc).unwrap(), Some("3".to_string()));
}

#[test]
fn test_update_after_neighbor_delete_does_not_duplicate() {
    // Both keys share a bucket file and interpolate to slot 0
    let base = 0x1234_5678_9000_0000u64;
    let hasher = pinned_hasher(&[("1", base | 1), ("2", base | 2)]);
    let (_temp, sharder, engine) = setup_engine_with_hasher(hasher);
    let one = locate(&sharder, 1);
    let two = locate(&sharder, 2);

    engine.put(&one, "a").unwrap();
    engine.put(&two, "b").unwrap();
    assert!(engine.delete(&one).unwrap());

    assert_eq!(engine.put(&two, "c").unwrap(), PutOutcome::Updated);

    let records = engine.records(&two.coords.bucket_path).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].value, "c");
}

// =============================================================================
// Lookup Tests
// =============================================================================

#[test]
fn test_get_and_has_after_put() {
    let (_temp, sharder, engine) = setup_engine();
    let loc = locate(&sharder, 1);

    engine.put(&loc, "2").unwrap();

    assert!(engine.has(&loc).unwrap());
    assert_eq!(engine.get(&loc).unwrap(), Some("2".to_string()));
}

#[test]
fn test_get_miss_in_existing_bucket() {
    let base = 0x1234_5678_9000_0000u64;
    let hasher = pinned_hasher(&[("1", base | 1), ("2", base | 2)]);
    let (_temp, sharder, engine) = setup_engine_with_hasher(hasher);

    engine.put(&locate(&sharder, 1), "a").unwrap();

    let two = locate(&sharder, 2);
    assert_eq!(engine.get(&two).unwrap(), None);
    assert!(!engine.has(&two).unwrap());
}

#[test]
fn test_get_collision_vs_has() {
    let hasher = pinned_hasher(&[("1", 0xfeed), ("2", 0xfeed)]);
    let (_temp, sharder, engine) = setup_engine_with_hasher(hasher);
    let one = locate(&sharder, 1);
    let two = locate(&sharder, 2);

    engine.put(&one, "a").unwrap();

    // has only compares the slot id field
    assert!(engine.has(&two).unwrap());

    // get compares the stored key and refuses to guess
    let err = engine.get(&two).unwrap_err();
    match err {
        StoreError::Collision {
            stored_key,
            requested_key,
            ..
        } => {
            assert_eq!(stored_key, "1");
            assert_eq!(requested_key, "2");
        }
        other => panic!("expected Collision, got {:?}", other),
    }
}

// =============================================================================
// Delete Tests
// =============================================================================

#[test]
fn test_delete_tombstones_slot() {
    let (_temp, sharder, engine) = setup_engine();
    let loc = locate(&sharder, 1);
    engine.put(&loc, "2").unwrap();

    assert!(engine.delete(&loc).unwrap());

    let bytes = fs::read(&loc.coords.bucket_path).unwrap();
    assert_eq!(bytes.len(), 256);
    assert!(bytes[128..255].iter().all(|&b| b == b' '));
    let header = engine.header(&loc.coords.bucket_path).unwrap().unwrap();
    assert_eq!(header.record_count, 0);
    assert_eq!(header.slot_count, 1);
    assert_eq!(engine.get(&loc).unwrap(), None);
    assert!(!engine.has(&loc).unwrap());
}

#[test]
fn test_delete_twice_returns_false() {
    let (_temp, sharder, engine) = setup_engine();
    let loc = locate(&sharder, 1);
    engine.put(&loc, "2").unwrap();

    assert!(engine.delete(&loc).unwrap());
    assert!(!engine.delete(&loc).unwrap());
}

#[test]
fn test_delete_matches_slot_id_only() {
    let hasher = pinned_hasher(&[("1", 0xfeed), ("2", 0xfeed)]);
    let (_temp, sharder, engine) = setup_engine_with_hasher(hasher);
    let one = locate(&sharder, 1);
    engine.put(&one, "a").unwrap();

    assert!(engine.delete(&locate(&sharder, 2)).unwrap());
    assert_eq!(engine.get(&one).unwrap(), None);
}

#[test]
fn test_tombstoned_slot_is_reused() {
    let (_temp, sharder, engine) = setup_engine();
    let loc = locate(&sharder, 1);

    engine.put(&loc, "2").unwrap();
    engine.delete(&loc).unwrap();
    assert_eq!(engine.put(&loc, "3").unwrap(), PutOutcome::Inserted);

    let header = engine.header(&loc.coords.bucket_path).unwrap().unwrap();
    assert_eq!(header.slot_count, 1);
    assert_eq!(header.record_count, 1);
}

// =============================================================================
// Header Integrity Tests
// =============================================================================

#[test]
fn test_other_dictionary_name_is_corrupt_header() {
    let (temp, sharder, engine) = setup_engine();
    let loc = locate(&sharder, 1);
    engine.put(&loc, "2").unwrap();

    let config = Config::builder().root(temp.path()).name("intruder").build();
    let intruder = BucketEngine::new("intruder", &config);

    assert!(matches!(
        intruder.get(&loc),
        Err(StoreError::CorruptHeader { .. })
    ));
    assert!(matches!(
        intruder.put(&loc, "3"),
        Err(StoreError::CorruptHeader { .. })
    ));
    // the original record is untouched
    assert_eq!(engine.get(&loc).unwrap(), Some("2".to_string()));
}

#[test]
fn test_bad_magic_is_corrupt_header() {
    let (_temp, sharder, engine) = setup_engine();
    let loc = locate(&sharder, 1);
    engine.put(&loc, "2").unwrap();

    let mut bytes = fs::read(&loc.coords.bucket_path).unwrap();
    bytes[..9].copy_from_slice(b"GARBAGE!!");
    fs::write(&loc.coords.bucket_path, bytes).unwrap();

    assert!(matches!(
        engine.has(&loc),
        Err(StoreError::CorruptHeader { .. })
    ));
    assert!(matches!(
        engine.delete(&loc),
        Err(StoreError::CorruptHeader { .. })
    ));
}

#[test]
fn test_truncated_bucket_is_reported() {
    let (_temp, sharder, engine) = setup_engine();
    let loc = locate(&sharder, 1);
    engine.put(&loc, "2").unwrap();

    let bytes = fs::read(&loc.coords.bucket_path).unwrap();
    fs::write(&loc.coords.bucket_path, &bytes[..130]).unwrap();

    assert!(matches!(
        engine.get(&loc),
        Err(StoreError::CorruptRecord { .. })
    ));
}
