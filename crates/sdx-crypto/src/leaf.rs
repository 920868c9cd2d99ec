//! # Hash Leaves
//!
//! A leaf is one fact in a selective-disclosure tree. A **revealed** leaf
//! carries `data`, `salt`, and `hash = H(data ++ salt)`. A **redacted** leaf
//! carries only `hash`: proof that some value with that hash exists, without
//! the value.
//!
//! ## Security Invariant
//!
//! Redaction never recomputes a hash. It clones the stored hash and drops
//! `data` and `salt`, so the tree root is unchanged by construction.
//!
//! Every salt is 16 bytes from the OS CSPRNG. Without the salt, a verifier
//! holding a redacted hash cannot brute-force low-entropy values such as
//! dates of birth.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use sdx_core::encoding::opt_prefixed_hex;
use sdx_core::{HashAlgorithm, HashValue};

use crate::error::TreeError;

/// Length of a leaf salt in bytes.
pub const SALT_LEN: usize = 16;

/// Content type for leaves holding canonical JSON.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Draw a fresh random salt.
pub fn random_salt() -> Vec<u8> {
    let mut salt = vec![0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// One disclosed or redacted fact.
///
/// Wire form: `{"data"?: "0x..", "salt"?: "0x..", "hash": "0x..", "contentType": ".."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashLeaf {
    #[serde(default, skip_serializing_if = "Option::is_none", with = "opt_prefixed_hex")]
    pub(crate) data: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "opt_prefixed_hex")]
    pub(crate) salt: Option<Vec<u8>>,
    pub(crate) hash: HashValue,
    pub(crate) content_type: String,
}

impl HashLeaf {
    /// Create a revealed leaf, hashing `data ++ salt` with `algorithm`.
    pub fn revealed(
        algorithm: HashAlgorithm,
        data: Vec<u8>,
        salt: Vec<u8>,
        content_type: impl Into<String>,
    ) -> Self {
        let hash = algorithm.hash(&[data.as_slice(), salt.as_slice()]);
        Self {
            data: Some(data),
            salt: Some(salt),
            hash,
            content_type: content_type.into(),
        }
    }

    /// Create a redacted leaf from a previously computed hash.
    pub fn redacted(hash: HashValue, content_type: impl Into<String>) -> Self {
        Self {
            data: None,
            salt: None,
            hash,
            content_type: content_type.into(),
        }
    }

    /// A copy of this leaf with `data` and `salt` removed.
    pub fn to_redacted(&self) -> Self {
        Self::redacted(self.hash, self.content_type.clone())
    }

    /// Returns `true` when the leaf carries its data.
    pub fn is_revealed(&self) -> bool {
        self.data.is_some()
    }

    /// The revealed data bytes, if any.
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// The salt bytes, if any.
    pub fn salt(&self) -> Option<&[u8]> {
        self.salt.as_deref()
    }

    /// The stored leaf hash.
    pub fn hash(&self) -> &HashValue {
        &self.hash
    }

    /// The MIME-style content type describing `data`.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Decode revealed data as JSON.
    ///
    /// # Errors
    ///
    /// `LeafNotRevealed` for redacted leaves; `Json` if the data does not
    /// decode as `T`.
    pub fn decode_json<T: DeserializeOwned>(&self) -> Result<T, TreeError> {
        let data = self.data.as_deref().ok_or(TreeError::LeafNotRevealed)?;
        Ok(serde_json::from_slice(data)?)
    }

    /// Recompute `H(data ++ salt)` for a revealed leaf.
    ///
    /// Returns `None` for redacted leaves, which have nothing to recompute.
    pub fn recompute_hash(&self, algorithm: HashAlgorithm) -> Option<HashValue> {
        match (&self.data, &self.salt) {
            (Some(data), Some(salt)) => Some(algorithm.hash(&[data.as_slice(), salt.as_slice()])),
            _ => None,
        }
    }

    /// Check the `data` iff `salt` rule.
    pub(crate) fn check_shape(&self, index: usize) -> Result<(), TreeError> {
        match (&self.data, &self.salt) {
            (Some(_), None) => Err(TreeError::MalformedLeaf {
                index,
                reason: "data present without salt".to_string(),
            }),
            (None, Some(_)) => Err(TreeError::MalformedLeaf {
                index,
                reason: "salt present without data".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revealed_leaf_hash_covers_data_and_salt() {
        let leaf = HashLeaf::revealed(
            HashAlgorithm::Sha256,
            b"{\"a\":\"1\"}".to_vec(),
            vec![0u8; SALT_LEN],
            JSON_CONTENT_TYPE,
        );
        assert_eq!(
            leaf.hash().to_hex(),
            "0x09157b3b6b0b3dd6641d6170e6e7467faa076e45507f575733ed4468e7ca71c2"
        );
        assert_eq!(leaf.recompute_hash(HashAlgorithm::Sha256), Some(*leaf.hash()));
    }

    #[test]
    fn redaction_keeps_hash_and_content_type() {
        let leaf = HashLeaf::revealed(HashAlgorithm::Sha256, b"x".to_vec(), random_salt(), "text/plain");
        let red = leaf.to_redacted();
        assert!(!red.is_revealed());
        assert_eq!(red.hash(), leaf.hash());
        assert_eq!(red.content_type(), "text/plain");
        assert!(red.salt().is_none());
        assert!(red.recompute_hash(HashAlgorithm::Sha256).is_none());
    }

    #[test]
    fn random_salts_differ() {
        let a = random_salt();
        let b = random_salt();
        assert_eq!(a.len(), SALT_LEN);
        assert_ne!(a, b);
    }

    #[test]
    fn decode_json_on_redacted_leaf_fails() {
        let leaf = HashLeaf::redacted(HashAlgorithm::Sha256.hash(&[b"x"]), JSON_CONTENT_TYPE);
        assert!(matches!(
            leaf.decode_json::<serde_json::Value>(),
            Err(TreeError::LeafNotRevealed)
        ));
    }

    #[test]
    fn decode_json_on_revealed_leaf() {
        let leaf = HashLeaf::revealed(
            HashAlgorithm::Sha256,
            br#"{"b":"2"}"#.to_vec(),
            random_salt(),
            JSON_CONTENT_TYPE,
        );
        let v: serde_json::Value = leaf.decode_json().unwrap();
        assert_eq!(v["b"], "2");
    }

    #[test]
    fn wire_form_omits_absent_fields() {
        let leaf = HashLeaf::redacted(HashAlgorithm::Sha256.hash(&[b"x"]), JSON_CONTENT_TYPE);
        let v = serde_json::to_value(&leaf).unwrap();
        assert!(v.get("data").is_none());
        assert!(v.get("salt").is_none());
        assert!(v["hash"].as_str().unwrap().starts_with("0x"));
        assert_eq!(v["contentType"], JSON_CONTENT_TYPE);
    }

    #[test]
    fn wire_form_roundtrip_revealed() {
        let leaf = HashLeaf::revealed(HashAlgorithm::Keccak256, b"abc".to_vec(), random_salt(), "text/plain");
        let json = serde_json::to_string(&leaf).unwrap();
        assert!(json.contains(r#""data":"0x616263""#));
        let back: HashLeaf = serde_json::from_str(&json).unwrap();
        assert_eq!(back, leaf);
    }

    #[test]
    fn shape_check_rejects_half_revealed_leaf() {
        let mut leaf = HashLeaf::revealed(HashAlgorithm::Sha256, b"x".to_vec(), random_salt(), "text/plain");
        leaf.salt = None;
        assert!(matches!(
            leaf.check_shape(2),
            Err(TreeError::MalformedLeaf { index: 2, .. })
        ));
    }
}
