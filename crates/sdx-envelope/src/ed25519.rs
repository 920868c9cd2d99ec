//! # Ed25519 Reference Backend
//!
//! [`Ed25519Signer`] and [`Ed25519Verifier`] implement the signing
//! capabilities with `alg = "EdDSA"`. The verifier holds a set of trusted
//! public keys; when the protected header names a `kid` that the verifier
//! knows, only that key is tried.

use std::collections::BTreeMap;

use async_trait::async_trait;

use sdx_crypto::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};

use crate::error::CapabilityError;
use crate::header::ProtectedHeader;
use crate::signer::{SignatureVerifier, Signer};

/// Algorithm identifier for Ed25519 signatures.
pub const EDDSA: &str = "EdDSA";

/// Signs envelopes with an Ed25519 key.
#[derive(Debug)]
pub struct Ed25519Signer {
    key: Ed25519KeyPair,
    key_id: Option<String>,
}

impl Ed25519Signer {
    /// Signer without a key id.
    pub fn new(key: Ed25519KeyPair) -> Self {
        Self { key, key_id: None }
    }

    /// Signer that writes `kid` into each protected header.
    pub fn with_key_id(key: Ed25519KeyPair, key_id: impl Into<String>) -> Self {
        Self {
            key,
            key_id: Some(key_id.into()),
        }
    }

    /// The signer's public key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        self.key.public_key()
    }
}

#[async_trait]
impl Signer for Ed25519Signer {
    fn algorithm(&self) -> &str {
        EDDSA
    }

    fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    async fn sign(&self, _header: &ProtectedHeader, signing_input: &[u8]) -> Result<Vec<u8>, CapabilityError> {
        Ok(self.key.sign(signing_input).to_vec())
    }
}

/// Verifies Ed25519 envelope signatures against trusted keys.
#[derive(Debug, Clone, Default)]
pub struct Ed25519Verifier {
    keyed: BTreeMap<String, Ed25519PublicKey>,
    anonymous: Vec<Ed25519PublicKey>,
}

impl Ed25519Verifier {
    /// Verifier trusting a single key.
    pub fn new(key: Ed25519PublicKey) -> Self {
        Self::default().with_key(key)
    }

    /// Trust `key` for any `kid`.
    pub fn with_key(mut self, key: Ed25519PublicKey) -> Self {
        self.anonymous.push(key);
        self
    }

    /// Trust `key` under `kid`.
    pub fn with_named_key(mut self, kid: impl Into<String>, key: Ed25519PublicKey) -> Self {
        self.keyed.insert(kid.into(), key);
        self
    }

    fn candidates<'a>(&'a self, kid: Option<&str>) -> Vec<&'a Ed25519PublicKey> {
        if let Some(key) = kid.and_then(|k| self.keyed.get(k)) {
            return vec![key];
        }
        self.anonymous.iter().chain(self.keyed.values()).collect()
    }
}

#[async_trait]
impl SignatureVerifier for Ed25519Verifier {
    async fn verify(
        &self,
        header: &ProtectedHeader,
        signing_input: &[u8],
        signature: &[u8],
    ) -> Result<bool, CapabilityError> {
        if !header.alg.eq_ignore_ascii_case(EDDSA) {
            return Ok(false);
        }
        let Ok(signature) = Ed25519Signature::from_slice(signature) else {
            return Ok(false);
        };
        Ok(self
            .candidates(header.kid.as_deref())
            .into_iter()
            .any(|key| key.verify(signing_input, &signature).is_ok()))
    }
}
