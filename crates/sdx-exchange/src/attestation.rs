//! # Attestation Verification
//!
//! A payload may point at an external attestation of its tree root. The
//! reader does not know how to talk to attestation services; it calls an
//! [`AttestationCheck`]. The usual check is built from an
//! [`AttestationVerifierRegistry`]: it picks the verifier for the locator's
//! service id, recomputes the tree root, and compares what the service
//! reports against the document.
//!
//! ## Failure Messages
//!
//! - Lookup failures read `"Unknown attestation service: <id>"`.
//! - Any root disagreement (stored root vs. recomputed root, or attested
//!   root vs. tree root) reads `"Merkle root mismatch: ..."`.
//! - An attester reported by the service that differs from the locator's
//!   attester reads `"Attester mismatch: ..."`.
//!
//! [`LocalAttestationLedger`] is an in-memory service for development and
//! tests. It records roots directly and answers lookups without any
//! network dependency.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use sdx_core::HashValue;
use sdx_envelope::CapabilityError;

use crate::error::RegistryError;
use crate::locator::AttestationLocator;
use crate::payload::ExchangePayload;

/// What an attestation service reports about one locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationOutcome {
    /// Whether the service considers the attestation valid.
    pub is_valid: bool,
    /// Diagnostic text.
    pub message: String,
    /// Attester recorded by the service, when it reports one.
    pub attester: Option<String>,
    /// Root recorded by the service, when it reports one.
    pub attested_root: Option<HashValue>,
}

impl AttestationOutcome {
    /// A valid outcome.
    pub fn valid(message: impl Into<String>) -> Self {
        Self {
            is_valid: true,
            message: message.into(),
            attester: None,
            attested_root: None,
        }
    }

    /// An invalid outcome.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            ..Self::valid(message)
        }
    }
}

/// Talks to one attestation service.
#[async_trait]
pub trait AttestationVerifier: Send + Sync {
    /// Service id this verifier answers for, matched case-insensitively
    /// against [`AttestationLocator::service_id`].
    fn service_id(&self) -> &str;

    /// Look up `locator` and report on it. `expected_root` is the root
    /// recomputed from the document's tree.
    async fn verify(
        &self,
        locator: &AttestationLocator,
        expected_root: &HashValue,
    ) -> Result<AttestationOutcome, CapabilityError>;
}

/// Result of the reader's attestation stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationCheckResult {
    /// Whether the attestation checks out.
    pub is_valid: bool,
    /// Diagnostic text.
    pub message: String,
    /// Attester, when known.
    pub attester: Option<String>,
}

impl AttestationCheckResult {
    fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: message.into(),
            attester: None,
        }
    }
}

/// The attestation stage capability.
#[async_trait]
pub trait AttestationCheck: Send + Sync {
    /// Check `payload`'s attestation.
    async fn check(&self, payload: &ExchangePayload) -> Result<AttestationCheckResult, CapabilityError>;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Service id → attestation verifier.
#[derive(Default)]
pub struct AttestationVerifierRegistry {
    verifiers: RwLock<HashMap<String, Arc<dyn AttestationVerifier>>>,
}

impl AttestationVerifierRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `verifier` under its service id. A later registration for
    /// the same id replaces the earlier one.
    ///
    /// # Errors
    ///
    /// `InvalidVerifier` if the service id is blank.
    pub fn register(&self, verifier: Arc<dyn AttestationVerifier>) -> Result<(), RegistryError> {
        let service_id = verifier.service_id().trim().to_string();
        if service_id.is_empty() {
            return Err(RegistryError::InvalidVerifier(
                "attestation verifier has an empty service id".into(),
            ));
        }
        let key = service_id.to_ascii_lowercase();
        let replaced = self.verifiers.write().insert(key, verifier).is_some();
        if replaced {
            tracing::warn!(service = %service_id, "attestation verifier replaced");
        } else {
            tracing::info!(service = %service_id, "attestation verifier registered");
        }
        Ok(())
    }

    /// Verifier for `service_id`, ignoring ASCII case.
    ///
    /// # Errors
    ///
    /// `UnknownService` if nothing is registered under that id.
    pub fn resolve(&self, service_id: &str) -> Result<Arc<dyn AttestationVerifier>, RegistryError> {
        self.verifiers
            .read()
            .get(&service_id.trim().to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| RegistryError::UnknownService(service_id.to_string()))
    }

    /// Registered service ids, sorted.
    pub fn service_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .verifiers
            .read()
            .values()
            .map(|v| v.service_id().to_string())
            .collect();
        ids.sort();
        ids
    }

    /// An [`AttestationCheck`] that dispatches through this registry.
    pub fn as_verification_callback(self: &Arc<Self>) -> Arc<dyn AttestationCheck> {
        Arc::new(RegistryAttestationCheck {
            registry: Arc::clone(self),
        })
    }
}

impl std::fmt::Debug for AttestationVerifierRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttestationVerifierRegistry")
            .field("services", &self.service_ids())
            .finish()
    }
}

struct RegistryAttestationCheck {
    registry: Arc<AttestationVerifierRegistry>,
}

#[async_trait]
impl AttestationCheck for RegistryAttestationCheck {
    async fn check(&self, payload: &ExchangePayload) -> Result<AttestationCheckResult, CapabilityError> {
        let Some(locator) = payload.attestation() else {
            return Ok(AttestationCheckResult::invalid("the payload carries no attestation"));
        };
        let verifier = match self.registry.resolve(&locator.service_id) {
            Ok(v) => v,
            Err(e) => return Ok(AttestationCheckResult::invalid(e.to_string())),
        };

        let tree = payload.tree();
        let Some(computed) = tree.computed_root() else {
            return Ok(AttestationCheckResult::invalid("Merkle root mismatch: tree has no leaves"));
        };
        match tree.root() {
            Some(stored) if *stored == computed => {}
            Some(stored) => {
                return Ok(AttestationCheckResult::invalid(format!(
                    "Merkle root mismatch: stored root {stored} does not match computed root {computed}"
                )))
            }
            None => {
                return Ok(AttestationCheckResult::invalid(
                    "Merkle root mismatch: tree has no stored root",
                ))
            }
        }

        let outcome = verifier.verify(locator, &computed).await?;
        tracing::debug!(
            service = %locator.service_id,
            attestation = %locator.attestation_id,
            valid = outcome.is_valid,
            "attestation service answered"
        );
        if !outcome.is_valid {
            return Ok(AttestationCheckResult::invalid(outcome.message));
        }
        if let Some(attested) = outcome.attested_root {
            if attested != computed {
                return Ok(AttestationCheckResult::invalid(format!(
                    "Merkle root mismatch: attested root {attested} does not match tree root {computed}"
                )));
            }
        }
        if let Some(attester) = &outcome.attester {
            if !attester.eq_ignore_ascii_case(&locator.attester) {
                return Ok(AttestationCheckResult::invalid(format!(
                    "Attester mismatch: service reports {attester}, document names {}",
                    locator.attester
                )));
            }
        }
        Ok(AttestationCheckResult {
            is_valid: true,
            message: outcome.message,
            attester: outcome.attester.or_else(|| Some(locator.attester.clone())),
        })
    }
}

// ---------------------------------------------------------------------------
// Local ledger
// ---------------------------------------------------------------------------

/// One record in a [`LocalAttestationLedger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Attested tree root.
    pub root: HashValue,
    /// Who attested.
    pub attester: String,
    /// Who the attestation is about.
    pub recipient: String,
    /// Schema the attestation was made under.
    pub schema_id: String,
}

/// In-memory attestation service.
///
/// Suitable for development and tests only: records are not persisted and
/// carry no external finality.
#[derive(Debug)]
pub struct LocalAttestationLedger {
    service_id: String,
    network: String,
    entries: RwLock<HashMap<String, LedgerEntry>>,
    next_id: AtomicU64,
}

impl LocalAttestationLedger {
    /// Empty ledger answering for `service_id` on `network`.
    pub fn new(service_id: impl Into<String>, network: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            network: network.into(),
            entries: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Record an attestation and return a locator pointing at it.
    pub fn attest(&self, entry: LedgerEntry, schema_name: Option<String>) -> AttestationLocator {
        let seq = self.next_id.fetch_add(1, Ordering::SeqCst);
        let root_hex = entry.root.to_hex();
        let attestation_id = format!(
            "local-{seq}-{}",
            root_hex.get(2..18).unwrap_or("unknown")
        );
        let locator = AttestationLocator {
            service_id: self.service_id.clone(),
            network: self.network.clone(),
            schema_id: entry.schema_id.clone(),
            schema_name,
            attestation_id: attestation_id.clone(),
            attester: entry.attester.clone(),
            recipient: entry.recipient.clone(),
        };
        self.entries.write().insert(attestation_id, entry);
        locator
    }

    /// Remove an attestation. Returns `true` if it existed.
    pub fn revoke(&self, attestation_id: &str) -> bool {
        self.entries.write().remove(attestation_id).is_some()
    }

    /// Look up a recorded attestation.
    pub fn entry(&self, attestation_id: &str) -> Option<LedgerEntry> {
        self.entries.read().get(attestation_id).cloned()
    }
}

#[async_trait]
impl AttestationVerifier for LocalAttestationLedger {
    fn service_id(&self) -> &str {
        &self.service_id
    }

    async fn verify(
        &self,
        locator: &AttestationLocator,
        _expected_root: &HashValue,
    ) -> Result<AttestationOutcome, CapabilityError> {
        if !locator.network.eq_ignore_ascii_case(&self.network) {
            return Ok(AttestationOutcome::invalid(format!(
                "attestation is on network {}, ledger serves {}",
                locator.network, self.network
            )));
        }
        let Some(entry) = self.entry(&locator.attestation_id) else {
            return Ok(AttestationOutcome::invalid(format!(
                "attestation {} not found",
                locator.attestation_id
            )));
        };
        if entry.schema_id != locator.schema_id {
            return Ok(AttestationOutcome::invalid(format!(
                "attestation {} uses schema {}, document names {}",
                locator.attestation_id, entry.schema_id, locator.schema_id
            )));
        }
        if !entry.recipient.eq_ignore_ascii_case(&locator.recipient) {
            return Ok(AttestationOutcome::invalid(format!(
                "attestation {} is for {}, document names {}",
                locator.attestation_id, entry.recipient, locator.recipient
            )));
        }
        Ok(AttestationOutcome {
            is_valid: true,
            message: format!("attestation {} found", locator.attestation_id),
            attester: Some(entry.attester),
            attested_root: Some(entry.root),
        })
    }
}
