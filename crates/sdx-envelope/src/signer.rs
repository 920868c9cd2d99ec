//! # Signing Capabilities
//!
//! The envelope codec never holds key material. Signing and verification
//! are delegated to implementations of [`Signer`] and [`SignatureVerifier`]
//! supplied by the embedding application; [`VerifierResolver`] maps a
//! protected header's `alg` to the verifier that understands it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CapabilityError;
use crate::header::ProtectedHeader;

/// Produces signatures over envelope signing inputs.
#[async_trait]
pub trait Signer: Send + Sync {
    /// Algorithm identifier written into the protected header.
    fn algorithm(&self) -> &str;

    /// Optional key identifier written into the protected header.
    fn key_id(&self) -> Option<&str> {
        None
    }

    /// Sign `signing_input` (already bound to `header`).
    async fn sign(
        &self,
        header: &ProtectedHeader,
        signing_input: &[u8],
    ) -> Result<Vec<u8>, CapabilityError>;
}

/// Checks one signature.
#[async_trait]
pub trait SignatureVerifier: Send + Sync {
    /// `Ok(false)` for a well-formed but wrong signature; `Err` when the
    /// backend itself could not answer.
    async fn verify(
        &self,
        header: &ProtectedHeader,
        signing_input: &[u8],
        signature: &[u8],
    ) -> Result<bool, CapabilityError>;
}

/// Looks up a verifier by algorithm identifier.
pub trait VerifierResolver: Send + Sync {
    /// `None` when no verifier handles `algorithm`.
    fn resolve(&self, algorithm: &str) -> Option<Arc<dyn SignatureVerifier>>;
}

impl<F> VerifierResolver for F
where
    F: Fn(&str) -> Option<Arc<dyn SignatureVerifier>> + Send + Sync,
{
    fn resolve(&self, algorithm: &str) -> Option<Arc<dyn SignatureVerifier>> {
        self(algorithm)
    }
}

/// Algorithm → verifier map. Lookups ignore ASCII case.
#[derive(Clone, Default)]
pub struct VerifierSet {
    verifiers: HashMap<String, Arc<dyn SignatureVerifier>>,
}

impl VerifierSet {
    /// An empty set; every lookup misses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the verifier for `algorithm`.
    pub fn insert(&mut self, algorithm: &str, verifier: Arc<dyn SignatureVerifier>) {
        self.verifiers.insert(algorithm.to_ascii_lowercase(), verifier);
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, algorithm: &str, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.insert(algorithm, verifier);
        self
    }

    /// Number of registered algorithms.
    pub fn len(&self) -> usize {
        self.verifiers.len()
    }

    /// Returns `true` if no verifier is registered.
    pub fn is_empty(&self) -> bool {
        self.verifiers.is_empty()
    }
}

impl VerifierResolver for VerifierSet {
    fn resolve(&self, algorithm: &str) -> Option<Arc<dyn SignatureVerifier>> {
        self.verifiers.get(&algorithm.to_ascii_lowercase()).cloned()
    }
}

impl std::fmt::Debug for VerifierSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut algs: Vec<&str> = self.verifiers.keys().map(String::as_str).collect();
        algs.sort_unstable();
        f.debug_struct("VerifierSet").field("algorithms", &algs).finish()
    }
}
