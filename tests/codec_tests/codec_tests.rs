//! Tests for the key/value codec
//!
//! These tests verify:
//! - Exact round trips for scalars and nested composite values
//! - Bit-exact round trips for f64, including extremes
//! - Encoded text never contains whitespace
//! - Deterministic encoding (same value, same string)
//! - Error reporting on malformed input

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use strongmap::codec::{parse, stringify};
use strongmap::StoreError;

// =============================================================================
// Helper Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Profile {
    name: String,
    tags: Vec<String>,
    scores: BTreeMap<String, f64>,
    parent: Option<Box<Profile>>,
}

// =============================================================================
// Round Trip Tests
// =============================================================================

#[test]
fn test_integer_encodes_as_json() {
    assert_eq!(stringify(&1).unwrap(), "1");
    assert_eq!(parse::<i64>("1").unwrap(), 1);
}

#[test]
fn test_nested_json_round_trip() {
    let value = json!({"happy": "CRIS", "yes": [999, 2.12e-94]});

    let encoded = stringify(&value).unwrap();
    let decoded: Value = parse(&encoded).unwrap();

    assert_eq!(decoded, value);
    assert_eq!(decoded["yes"][1].as_f64(), Some(2.12e-94));
}

#[test]
fn test_struct_round_trip() {
    let child = Profile {
        name: "child with spaces".to_string(),
        tags: vec!["a b".to_string(), "tab\there".to_string()],
        scores: BTreeMap::from([("x y".to_string(), 1.5)]),
        parent: None,
    };
    let profile = Profile {
        name: "root".to_string(),
        tags: vec![],
        scores: BTreeMap::new(),
        parent: Some(Box::new(child)),
    };

    let decoded: Profile = parse(&stringify(&profile).unwrap()).unwrap();

    assert_eq!(decoded, profile);
}

fn assert_f64_exact(value: f64) {
    let encoded = stringify(&value).unwrap();
    let decoded: f64 = parse(&encoded).unwrap();
    assert_eq!(
        decoded.to_bits(),
        value.to_bits(),
        "{:e} encoded as {} decoded as {:e}",
        value,
        encoded,
        decoded
    );
}

#[test]
fn test_random_f64_round_trip_is_bit_exact() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut checked = 0;
    while checked < 50_000 {
        let value = f64::from_bits(rng.gen::<u64>());
        if !value.is_finite() {
            continue;
        }
        assert_f64_exact(value);
        checked += 1;
    }
}

#[test]
fn test_extreme_f64_round_trip() {
    let values = [
        0.0,
        -0.0,
        f64::MAX,
        f64::MIN,
        f64::MIN_POSITIVE,
        -f64::MIN_POSITIVE,
        f64::EPSILON,
        f64::from_bits(1),                     // smallest subnormal
        f64::from_bits(0x000f_ffff_ffff_ffff), // largest subnormal
        -f64::from_bits(0x0008_0000_0000_0000),
        1.0715660391465826e-75,
        2.12e-94,
        0.1 + 0.2,
    ];
    for value in values {
        assert_f64_exact(value);
    }
}

#[test]
fn test_f64_inside_composite_round_trip() {
    let value = vec![(1.0715660391465826e-75, -0.0), (f64::from_bits(1), f64::MAX)];
    let decoded: Vec<(f64, f64)> = parse(&stringify(&value).unwrap()).unwrap();
    let bits = |v: &[(f64, f64)]| -> Vec<(u64, u64)> {
        v.iter().map(|(a, b)| (a.to_bits(), b.to_bits())).collect()
    };
    assert_eq!(bits(&decoded), bits(&value));
}

#[test]
fn test_percent_sign_round_trip() {
    let value = "100% %20 literal".to_string();
    let decoded: String = parse(&stringify(&value).unwrap()).unwrap();
    assert_eq!(decoded, value);
}

// =============================================================================
// Whitespace Tests
// =============================================================================

#[test]
fn test_encoding_has_no_whitespace() {
    let values = vec![
        json!("a b"),
        json!("line\nbreak"),
        json!("tab\t"),
        json!("ideographic\u{3000}space"),
        json!("no-break\u{00a0}space"),
        json!({"key with space": ["x y", {"z w": 1}]}),
    ];

    for value in values {
        let encoded = stringify(&value).unwrap();
        assert!(
            !encoded.chars().any(char::is_whitespace),
            "whitespace in {:?}",
            encoded
        );
        assert_eq!(parse::<Value>(&encoded).unwrap(), value);
    }
}

// =============================================================================
// Determinism Tests
// =============================================================================

#[test]
fn test_object_key_order_is_canonical() {
    let a: Value = serde_json::from_str(r#"{"b":1,"a":2}"#).unwrap();
    let b: Value = serde_json::from_str(r#"{"a":2,"b":1}"#).unwrap();

    assert_eq!(stringify(&a).unwrap(), stringify(&b).unwrap());
}

#[test]
fn test_equal_values_encode_identically() {
    let first = stringify(&json!({"alpha": [1, 2, 3]})).unwrap();
    let second = stringify(&json!({"alpha": [1, 2, 3]})).unwrap();
    assert_eq!(first, second);
}

// =============================================================================
// Error Tests
// =============================================================================

#[test]
fn test_parse_invalid_json_fails() {
    let result = parse::<Value>("{not json");
    assert!(matches!(result, Err(StoreError::Serialization(_))));
}

#[test]
fn test_parse_bad_escape_fails() {
    let result = parse::<String>("\"a%2\"");
    assert!(matches!(result, Err(StoreError::Serialization(_))));
}

#[test]
fn test_parse_type_mismatch_fails() {
    let result = parse::<u32>("\"text\"");
    assert!(matches!(result, Err(StoreError::Serialization(_))));
}
