//! Everything a reader needs besides the document itself.

use std::sync::Arc;

use chrono::Duration;

use sdx_core::Timestamp;
use sdx_envelope::VerifierResolver;

use crate::attestation::AttestationCheck;
use crate::config::ReaderConfig;
use crate::nonce::NonceStore;
use crate::policy::SignatureRequirement;

/// Verification settings and capabilities.
///
/// Cheap to clone; capabilities are shared behind `Arc`.
#[derive(Clone)]
pub struct VerificationContext {
    max_age: Duration,
    max_clock_skew: Duration,
    signature_requirement: SignatureRequirement,
    nonce_store: Arc<dyn NonceStore>,
    verifiers: Arc<dyn VerifierResolver>,
    attestation_check: Option<Arc<dyn AttestationCheck>>,
    now: Option<Timestamp>,
}

impl VerificationContext {
    /// Context with default settings: one-day maximum age, five minutes of
    /// clock skew, `AtLeastOne`.
    pub fn new(nonce_store: Arc<dyn NonceStore>, verifiers: Arc<dyn VerifierResolver>) -> Self {
        Self::from_config(&ReaderConfig::default(), nonce_store, verifiers)
    }

    /// Context with settings taken from `config`.
    pub fn from_config(
        config: &ReaderConfig,
        nonce_store: Arc<dyn NonceStore>,
        verifiers: Arc<dyn VerifierResolver>,
    ) -> Self {
        Self {
            max_age: config.max_age(),
            max_clock_skew: config.max_clock_skew(),
            signature_requirement: config.signature_requirement.clone(),
            nonce_store,
            verifiers,
            attestation_check: None,
            now: None,
        }
    }

    /// Override the maximum age.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Override how far ahead of `now` a document timestamp may be.
    pub fn with_max_clock_skew(mut self, max_clock_skew: Duration) -> Self {
        self.max_clock_skew = max_clock_skew;
        self
    }

    /// Override the signature policy.
    pub fn with_signature_requirement(mut self, requirement: SignatureRequirement) -> Self {
        self.signature_requirement = requirement;
        self
    }

    /// Install the check run for payloads that carry an attestation.
    pub fn with_attestation_check(mut self, check: Arc<dyn AttestationCheck>) -> Self {
        self.attestation_check = Some(check);
        self
    }

    /// Evaluate freshness against a fixed instant instead of the clock.
    pub fn with_fixed_now(mut self, now: Timestamp) -> Self {
        self.now = Some(now);
        self
    }

    /// Maximum document age.
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Tolerated clock skew for future-dated documents.
    pub fn max_clock_skew(&self) -> Duration {
        self.max_clock_skew
    }

    /// Signature policy.
    pub fn signature_requirement(&self) -> &SignatureRequirement {
        &self.signature_requirement
    }

    /// Replay-protection store.
    pub fn nonce_store(&self) -> &dyn NonceStore {
        self.nonce_store.as_ref()
    }

    /// Signature verifier lookup.
    pub fn verifiers(&self) -> &dyn VerifierResolver {
        self.verifiers.as_ref()
    }

    /// Attestation check, if installed.
    pub fn attestation_check(&self) -> Option<&dyn AttestationCheck> {
        self.attestation_check.as_deref()
    }

    /// The instant freshness is measured against.
    pub fn now(&self) -> Timestamp {
        self.now.unwrap_or_else(Timestamp::now)
    }
}

impl std::fmt::Debug for VerificationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationContext")
            .field("max_age", &self.max_age)
            .field("max_clock_skew", &self.max_clock_skew)
            .field("signature_requirement", &self.signature_requirement)
            .field("attestation_check", &self.attestation_check.is_some())
            .field("now", &self.now)
            .finish_non_exhaustive()
    }
}
