//! Pattern Scan Tests
//!
//! Tests verify:
//! - Glob semantics through both containers
//! - Range pruning on the ordered container
//! - Limits and value collection

use std::collections::BTreeSet;

use kvbench::memtable::{Container, HashStore, OrderedStore};
use kvbench::pattern::{bounds, glob_match};

// =============================================================================
// Helper Functions
// =============================================================================

fn filled<C: Container>(keys: &[&str]) -> C {
    let mut store = C::default();
    for key in keys {
        store.insert(key.as_bytes(), format!("val:{}", key).as_bytes());
    }
    store
}

fn key_set(keys: &[Vec<u8>]) -> BTreeSet<String> {
    keys.iter()
        .map(|k| String::from_utf8_lossy(k).into_owned())
        .collect()
}

fn set_of(keys: &[&str]) -> BTreeSet<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

// =============================================================================
// Glob Tests
// =============================================================================

#[test]
fn test_question_mark_example_on_both_containers() {
    let keys = ["abc", "axc", "ab", "abcd"];

    let ordered: OrderedStore = filled(&keys);
    let result = ordered.scan(b"a?c", None, false);
    assert_eq!(result.keys, vec![b"abc".to_vec(), b"axc".to_vec()]);

    let hashed: HashStore = filled(&keys);
    let result = hashed.scan(b"a?c", None, false);
    assert_eq!(key_set(&result.keys), set_of(&["abc", "axc"]));
}

#[test]
fn test_star_matches_everything() {
    let keys = ["", "a", "zzz", "user:1"];
    let ordered: OrderedStore = filled(&keys);
    assert_eq!(ordered.scan(b"*", None, false).len(), 4);

    let hashed: HashStore = filled(&keys);
    assert_eq!(hashed.scan(b"*", None, false).len(), 4);
}

#[test]
fn test_literal_pattern_is_exact_match() {
    let ordered: OrderedStore = filled(&["user", "user1", "use"]);
    let result = ordered.scan(b"user", None, false);
    assert_eq!(result.keys, vec![b"user".to_vec()]);
}

#[test]
fn test_glob_match_agrees_with_scan() {
    let keys = ["user:1:name", "user:22:name", "user:3:email", "admin:1:name"];
    let ordered: OrderedStore = filled(&keys);
    let result = ordered.scan(b"user:*:name", None, false);

    let expected: Vec<Vec<u8>> = keys
        .iter()
        .filter(|k| glob_match(k.as_bytes(), b"user:*:name"))
        .map(|k| k.as_bytes().to_vec())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    assert_eq!(result.keys, expected);
}

// =============================================================================
// Pruning Tests
// =============================================================================

#[test]
fn test_prefix_bounds() {
    let b = bounds(b"ab*");
    assert_eq!(b.min, b"ab".to_vec());
    assert_eq!(b.max, Some(b"ac".to_vec()));

    assert!(!bounds(b"*").prunes());
}

#[test]
fn test_prefix_scan_stays_in_range() {
    let ordered: OrderedStore = filled(&["aa", "ab", "abz", "ab\u{7f}", "ac", "b"]);
    let result = ordered.scan(b"ab*", None, false);
    assert_eq!(
        key_set(&result.keys),
        set_of(&["ab", "abz", "ab\u{7f}"])
    );
}

#[test]
fn test_prefix_of_0xff_bytes_scans_to_end() {
    let mut ordered = OrderedStore::new();
    ordered.insert(b"\xfe", b"1");
    ordered.insert(b"\xff", b"2");
    ordered.insert(b"\xff\xff", b"3");
    ordered.insert(b"\xff\xff\x01", b"4");

    let result = ordered.scan(b"\xff\xff*", None, false);
    assert_eq!(result.keys, vec![b"\xff\xff".to_vec(), b"\xff\xff\x01".to_vec()]);
}

// =============================================================================
// Limit and Value Tests
// =============================================================================

#[test]
fn test_limit_caps_matches() {
    let ordered: OrderedStore = filled(&["k1", "k2", "k3", "k4"]);
    let result = ordered.scan(b"k*", Some(2), false);
    assert_eq!(result.keys, vec![b"k1".to_vec(), b"k2".to_vec()]);

    assert!(ordered.scan(b"k*", Some(0), false).is_empty());

    let hashed: HashStore = filled(&["k1", "k2", "k3", "k4"]);
    assert_eq!(hashed.scan(b"k*", Some(3), false).len(), 3);
}

#[test]
fn test_values_are_aligned_with_keys() {
    let hashed: HashStore = filled(&["x1", "x2", "y1"]);
    let result = hashed.scan(b"x?", None, true);

    assert_eq!(result.keys.len(), 2);
    assert_eq!(result.values.len(), 2);
    for (key, value) in result.keys.iter().zip(&result.values) {
        let mut expected = b"val:".to_vec();
        expected.extend_from_slice(key);
        assert_eq!(value, &expected);
    }
}

#[test]
fn test_without_values_collects_none() {
    let ordered: OrderedStore = filled(&["a", "b"]);
    let result = ordered.scan(b"*", None, false);
    assert_eq!(result.len(), 2);
    assert!(result.values.is_empty());
}
