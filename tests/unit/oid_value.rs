//! Pure-function tests for the OID and value types, exercised from outside
//! the crate the way a downstream consumer would use them.

use snmpsim::oid::Oid;
use snmpsim::util::{hash_if_long, hex_decode, hex_encode};
use snmpsim::value::SnmpValue;

#[test]
fn oid_parses_and_orders() {
    let a: Oid = "1.3.6.1.2.1.1.1.0".parse().unwrap();
    let b: Oid = "1.3.6.1.2.1.1.2.0".parse().unwrap();
    assert!(a < b);
    assert_eq!(a.canonical(), "1.3.6.1.2.1.1.1.0");
}

#[test]
fn oid_prefix_relation_covers_subtrees() {
    let subtree: Oid = "1.3.6.1.4.1.8072".parse().unwrap();
    let leaf: Oid = "1.3.6.1.4.1.8072.3.2.10".parse().unwrap();
    let outside: Oid = "1.3.6.1.4.1.9999".parse().unwrap();
    assert!(subtree.is_prefix_of(&leaf));
    assert!(!subtree.is_prefix_of(&outside));
}

#[test]
fn exception_values_round_trip_through_tags() {
    for value in [
        SnmpValue::NoSuchObject,
        SnmpValue::NoSuchInstance,
        SnmpValue::EndOfMibView,
    ] {
        assert!(value.is_exception());
    }
    assert!(!SnmpValue::Counter64(1).is_exception());
}

#[test]
fn community_hashing_is_idempotent_for_short_names() {
    assert_eq!(hash_if_long("public"), "public");
    assert_eq!(hash_if_long("private"), "private");
}

#[test]
fn community_hashing_substitutes_long_names_with_digest() {
    let long = "x".repeat(64);
    let hashed = hash_if_long(&long);
    assert_eq!(hashed.len(), 32, "MD5 hex digest is 32 chars");
    assert_eq!(hashed, hash_if_long(&long), "hashing is deterministic");
}

#[test]
fn hex_helpers_round_trip_arbitrary_bytes() {
    let bytes: Vec<u8> = (0..=255).collect();
    let encoded = hex_encode(&bytes);
    assert_eq!(hex_decode(&encoded).unwrap(), bytes);
}
