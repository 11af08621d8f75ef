//! Tests for Key encoding
//!
//! These tests verify:
//! - External 32-hex-character form (packing, round-trip, rejection)
//! - Fixed 20-byte record form
//! - Counter-major ordering
//! - Display / FromStr / serde string form

use serde::de::value::{Error as DeError, StrDeserializer};
use serde::de::IntoDeserializer;
use serde::Deserialize;
use tallykv::key::{Key, EXTERNAL_KEY_LEN, KEY_SIZE};
use tallykv::TallyError;

// =============================================================================
// Helper Functions
// =============================================================================

fn random_key() -> Key {
    Key::new(
        rand::random::<u32>() >> 8,
        rand::random::<u64>() >> 24,
        rand::random::<u64>(),
    )
}

// =============================================================================
// External Encoding Tests
// =============================================================================

#[test]
fn test_external_known_vector() {
    let key = Key::new(1, 2, 3);

    assert_eq!(key.to_external(), "00000100000000020000000000000003");
}

#[test]
fn test_external_packs_salt_above_timestamp() {
    let key = Key::new(0x00ab_cdef, 0x12_3456_789a, 0xdead_beef);

    assert_eq!(key.to_external(), "abcdef123456789a00000000deadbeef");
}

#[test]
fn test_external_is_32_lowercase_hex() {
    for _ in 0..100 {
        let external = random_key().to_external();
        assert_eq!(external.len(), EXTERNAL_KEY_LEN);
        assert!(external
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }
}

#[test]
fn test_external_round_trip() {
    for _ in 0..1_000 {
        let key = random_key();
        let decoded = Key::from_external(&key.to_external()).unwrap();
        assert_eq!(decoded, key);
    }
}

#[test]
fn test_external_round_trip_extremes() {
    let keys = [
        Key::new(0, 0, 0),
        Key::new((1 << 24) - 1, (1 << 40) - 1, u64::MAX),
        Key::new(0, (1 << 40) - 1, 1),
        Key::new((1 << 24) - 1, 0, 1),
    ];
    for key in keys {
        assert_eq!(Key::from_external(&key.to_external()).unwrap(), key);
    }
}

#[test]
fn test_external_accepts_uppercase() {
    let key = Key::new(0x00ab_cdef, 0x12_3456_789a, 0xdead_beef);
    let upper = key.to_external().to_uppercase();

    assert_eq!(Key::from_external(&upper).unwrap(), key);
}

#[test]
fn test_external_rejects_wrong_length() {
    for input in ["", "abc", "0000010000000002000000000000000", "000001000000000200000000000000030"] {
        let result = Key::from_external(input);
        assert!(
            matches!(result, Err(TallyError::InvalidKey(_))),
            "length {} should be rejected",
            input.len()
        );
    }
}

#[test]
fn test_external_rejects_non_hex() {
    let result = Key::from_external("zz000100000000020000000000000003");

    assert!(matches!(result, Err(TallyError::InvalidKey(_))));
}

#[test]
fn test_external_rejects_multibyte_chars_of_right_byte_length() {
    // 16 two-byte characters: 32 bytes but not hex
    let input = "é".repeat(16);
    assert_eq!(input.len(), 32);

    assert!(matches!(
        Key::from_external(&input),
        Err(TallyError::InvalidKey(_))
    ));
}

// =============================================================================
// Record Encoding Tests
// =============================================================================

#[test]
fn test_record_bytes_layout() {
    let key = Key::new(0x0102_0304, 0x0506_0708_090a_0b0c, 0x0d0e_0f10_1112_1314);
    let bytes = key.to_record_bytes();

    assert_eq!(bytes.len(), KEY_SIZE);
    assert_eq!(&bytes[0..4], &[0x01, 0x02, 0x03, 0x04]);
    assert_eq!(&bytes[4..12], &0x0506_0708_090a_0b0cu64.to_be_bytes());
    assert_eq!(&bytes[12..20], &0x0d0e_0f10_1112_1314u64.to_be_bytes());
}

#[test]
fn test_record_bytes_keep_full_precision() {
    // Full-width fields survive the record form even though the external
    // form would truncate them
    let key = Key::new(u32::MAX, u64::MAX, u64::MAX);

    assert_eq!(Key::from_record_bytes(&key.to_record_bytes()), key);
}

// =============================================================================
// Ordering Tests
// =============================================================================

#[test]
fn test_ordering_is_counter_major() {
    let early = Key::new(0x00ff_ffff, 9_999_999_999, 1);
    let late = Key::new(0, 0, 2);

    assert!(early < late);
    assert!(late > early);
}

#[test]
fn test_equality_requires_all_fields() {
    let a = Key::new(1, 2, 3);

    assert_eq!(a, Key::new(1, 2, 3));
    assert_ne!(a, Key::new(9, 2, 3));
    assert_ne!(a, Key::new(1, 9, 3));
    assert_ne!(a, Key::new(1, 2, 9));
}

#[test]
fn test_sorting_keys_sorts_by_counter() {
    let mut keys: Vec<Key> = (0..50).rev().map(|c| Key::new(c as u32, 0, c)).collect();
    keys.sort();

    let counters: Vec<u64> = keys.iter().map(|k| k.counter).collect();
    assert_eq!(counters, (0..50).collect::<Vec<u64>>());
}

// =============================================================================
// Fresh Keys
// =============================================================================

#[test]
fn test_fresh_key_fits_external_form() {
    let now = chrono::Utc::now().timestamp() as u64;

    for _ in 0..100 {
        let key = Key::fresh();
        assert!(key.salt < (1 << 24));
        assert!(key.timestamp < (1 << 40));
        assert!(key.timestamp.abs_diff(now) <= 5);
        assert_eq!(key.counter, 0);
    }
}

#[test]
fn test_with_counter_keeps_salt_and_timestamp() {
    let key = Key::new(7, 8, 0).with_counter(99);

    assert_eq!(key, Key::new(7, 8, 99));
}

// =============================================================================
// String Form Tests
// =============================================================================

#[test]
fn test_display_and_from_str() {
    let key = random_key();
    let text = key.to_string();

    assert_eq!(text, key.to_external());
    assert_eq!(text.parse::<Key>().unwrap(), key);
    assert!("not-a-key".parse::<Key>().is_err());
}

#[test]
fn test_deserialize_from_string() {
    let key = random_key();
    let external = key.to_external();

    let de: StrDeserializer<'_, DeError> = external.as_str().into_deserializer();
    assert_eq!(Key::deserialize(de).unwrap(), key);

    let bad: StrDeserializer<'_, DeError> = "short".into_deserializer();
    assert!(Key::deserialize(bad).is_err());
}
