//! # Hash Algorithms and Hash Values
//!
//! Defines `HashAlgorithm`, the algorithm a hash tree declares in its header
//! leaf, and `HashValue`, the 32-byte digest used for leaf hashes and roots.
//!
//! ## Security Invariant
//!
//! The algorithm is pinned into the tree's header leaf, so the hash chain
//! commits to it. A verifier never picks an algorithm on its own; it reads
//! the declared one and recomputes every hash with it.
//!
//! ## Wire Format
//!
//! `HashValue` serializes as `0x`-prefixed lowercase hex (66 characters).
//! Algorithm identifiers are the upper-case strings `SHA256` and `KECCAK256`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha256;
use sha3::{Digest, Keccak256};

use crate::encoding::{decode_prefixed_hex, encode_prefixed_hex};
use crate::error::{EncodingError, SdxError};

/// Number of bytes in every supported digest.
pub const HASH_LEN: usize = 32;

/// The hash algorithm declared by a hash tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// SHA-256 (FIPS 180-4).
    #[serde(rename = "SHA256")]
    Sha256,
    /// Keccak-256 as used by Ethereum (not NIST SHA3-256).
    #[serde(rename = "KECCAK256")]
    Keccak256,
}

impl HashAlgorithm {
    /// Returns the algorithm identifier string written into header leaves.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "SHA256",
            Self::Keccak256 => "KECCAK256",
        }
    }

    /// Hash the concatenation of `parts` in order.
    ///
    /// Leaf hashes are `hash(&[data, salt])`; interior nodes are
    /// `hash(&[left, right])`.
    pub fn hash(&self, parts: &[&[u8]]) -> HashValue {
        let out = match self {
            Self::Sha256 => {
                let mut h = Sha256::new();
                for p in parts {
                    h.update(p);
                }
                h.finalize()
            }
            Self::Keccak256 => {
                let mut h = Keccak256::new();
                for p in parts {
                    h.update(p);
                }
                h.finalize()
            }
        };
        let mut bytes = [0u8; HASH_LEN];
        bytes.copy_from_slice(&out);
        HashValue(bytes)
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HashAlgorithm {
    type Err = SdxError;

    /// Parse an algorithm identifier, ignoring case and a `-` separator
    /// (`SHA256`, `sha-256`, `Keccak256`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-')
            .collect::<String>()
            .to_ascii_uppercase();
        match normalized.as_str() {
            "SHA256" => Ok(Self::Sha256),
            "KECCAK256" => Ok(Self::Keccak256),
            _ => Err(SdxError::Validation(format!(
                "unsupported hash algorithm: {s:?}"
            ))),
        }
    }
}

/// A 32-byte digest: a leaf hash or a tree root.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HashValue(pub [u8; HASH_LEN]);

impl HashValue {
    /// Wrap raw digest bytes.
    pub fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// Build a hash value from a slice, checking its length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, EncodingError> {
        if bytes.len() != HASH_LEN {
            return Err(EncodingError::InvalidLength {
                expected: HASH_LEN,
                actual: bytes.len(),
            });
        }
        let mut out = [0u8; HASH_LEN];
        out.copy_from_slice(bytes);
        Ok(Self(out))
    }

    /// Return the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Render as `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        encode_prefixed_hex(&self.0)
    }

    /// Parse from hex, with or without the `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, EncodingError> {
        let bytes = decode_prefixed_hex(s)?;
        Self::from_slice(&bytes)
    }
}

impl std::fmt::Debug for HashValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HashValue({})", self.to_hex())
    }
}

impl std::fmt::Display for HashValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for HashValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for HashValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        // SHA256("abc")
        let h = HashAlgorithm::Sha256.hash(&[b"abc"]);
        assert_eq!(
            h.to_hex(),
            "0xba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_keccak256_known_vector() {
        // Keccak-256 of the empty string (Ethereum's empty code hash).
        let h = HashAlgorithm::Keccak256.hash(&[]);
        assert_eq!(
            h.to_hex(),
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_hash_of_parts_equals_hash_of_concatenation() {
        for alg in [HashAlgorithm::Sha256, HashAlgorithm::Keccak256] {
            assert_eq!(alg.hash(&[b"ab", b"cd"]), alg.hash(&[b"abcd"]));
        }
    }

    #[test]
    fn test_algorithms_differ() {
        assert_ne!(
            HashAlgorithm::Sha256.hash(&[b"x"]),
            HashAlgorithm::Keccak256.hash(&[b"x"])
        );
    }

    #[test]
    fn test_algorithm_parse() {
        assert_eq!("SHA256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!("sha-256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!(
            "Keccak256".parse::<HashAlgorithm>().unwrap(),
            HashAlgorithm::Keccak256
        );
        assert!("MD5".parse::<HashAlgorithm>().is_err());
    }

    #[test]
    fn test_algorithm_serde_uses_identifier() {
        let json = serde_json::to_string(&HashAlgorithm::Keccak256).unwrap();
        assert_eq!(json, r#""KECCAK256""#);
        let back: HashAlgorithm = serde_json::from_str(r#""SHA256""#).unwrap();
        assert_eq!(back, HashAlgorithm::Sha256);
    }

    #[test]
    fn test_hash_value_hex_forms() {
        let h = HashAlgorithm::Sha256.hash(&[b"abc"]);
        let hex = h.to_hex();
        assert_eq!(hex.len(), 66);
        assert_eq!(HashValue::from_hex(&hex).unwrap(), h);
        assert_eq!(HashValue::from_hex(&hex[2..]).unwrap(), h);
    }

    #[test]
    fn test_hash_value_wrong_length_rejected() {
        assert!(matches!(
            HashValue::from_hex("0xaabb"),
            Err(EncodingError::InvalidLength { expected: 32, actual: 2 })
        ));
        assert!(HashValue::from_hex("0xzz").is_err());
    }

    #[test]
    fn test_hash_value_serde() {
        let h = HashAlgorithm::Sha256.hash(&[b"abc"]);
        let json = serde_json::to_string(&h).unwrap();
        assert!(json.starts_with("\"0x"));
        let back: HashValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }
}
