//! # Hash Vector Tests
//!
//! Fixed vectors for the canonical-bytes + hashing pipeline. Any
//! implementation of the exchange format must reproduce these byte for byte,
//! otherwise leaf hashes and roots stop matching across producers and
//! verifiers.
//!
//! Expected digests were computed independently with Python's `hashlib`
//! over the literal canonical strings shown in each test.

use sdx_core::{CanonicalBytes, HashAlgorithm, HashValue};

fn sha256_hex_of(value: &serde_json::Value, salt: &[u8]) -> String {
    let cb = CanonicalBytes::new(value).expect("canonicalization should succeed");
    HashAlgorithm::Sha256.hash(&[cb.as_bytes(), salt]).to_hex()
}

#[test]
fn unsalted_leaf_content() {
    let value = serde_json::json!({"a": "1"});
    let cb = CanonicalBytes::new(&value).unwrap();
    assert_eq!(cb.as_bytes(), br#"{"a":"1"}"#);
    assert_eq!(
        sha256_hex_of(&value, &[]),
        "0x9afeb0f2b203f254312ec8ded441d0318b7c34c57f8695ede42d2215a30c0960"
    );
}

#[test]
fn salted_leaf_content_zero_salt() {
    let value = serde_json::json!({"a": "1"});
    assert_eq!(
        sha256_hex_of(&value, &[0u8; 16]),
        "0x09157b3b6b0b3dd6641d6170e6e7467faa076e45507f575733ed4468e7ca71c2"
    );
}

#[test]
fn header_leaf_content_with_fixed_salt() {
    // Key order in the input does not matter; JCS sorts.
    let value = serde_json::json!({"leaves": 3, "alg": "SHA256", "exchange": "passport"});
    assert_eq!(
        sha256_hex_of(&value, &[1u8; 16]),
        "0x843b4a11b54f6df3f6f8994ca791afbe037cd1e943c7130bcdc66e84847e3c0f"
    );
}

#[test]
fn pair_hash_is_plain_concatenation() {
    let left = HashAlgorithm::Sha256.hash(&[b"left"]);
    let right = HashAlgorithm::Sha256.hash(&[b"right"]);
    assert_eq!(
        left,
        HashValue::from_hex("360f84035942243c6a36537ae2f8673485e6c04455a0a85a0db19690f2541480")
            .unwrap()
    );
    assert_eq!(
        right,
        HashValue::from_hex("27042f4e6eca7d0b2a7ee4026df2ecfa51d3339e6d122aa099118ecd8563bad9")
            .unwrap()
    );
    let parent = HashAlgorithm::Sha256.hash(&[left.as_bytes(), right.as_bytes()]);
    assert_eq!(
        parent.to_hex(),
        "0x2a9870f5b7eb1cd732d95224cfea825a7b8772136cb497b20d2e3c612dfc90fe"
    );
}

#[test]
fn key_order_does_not_change_digest() {
    let a = serde_json::json!({"x": 1, "y": {"b": "2", "a": "1"}});
    let b = serde_json::json!({"y": {"a": "1", "b": "2"}, "x": 1});
    assert_eq!(sha256_hex_of(&a, b"salt"), sha256_hex_of(&b, b"salt"));
}
