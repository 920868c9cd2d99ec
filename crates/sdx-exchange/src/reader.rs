//! # Exchange Reader
//!
//! The verification pipeline. Stages run in a fixed order and the first
//! failure ends the read:
//!
//! 1. parse the envelope
//! 2. extract the payload and require a tree
//! 3. integrity: header leaf, leaf hashes, root
//! 4. freshness: not older than the maximum age (boundary inclusive) and
//!    not further in the future than the tolerated clock skew
//! 5. replay check through the nonce store
//! 6. signature policy
//! 7. attestation, when the payload carries one
//!
//! Stage order is also priority order: when several things are wrong, the
//! earliest stage names the error. Each stage is a public function so it
//! can be exercised on its own.

use chrono::Duration;
use serde_json::Value;

use sdx_core::Timestamp;
use sdx_envelope::{Envelope, EnvelopeCodec, ParsedEnvelope, VerifierResolver};

use crate::context::VerificationContext;
use crate::error::ReadError;
use crate::nonce::NonceStore;
use crate::payload::{ExchangePayload, TREE_KEY};
use crate::policy::SignatureRequirement;

/// Message carried by a successful read.
pub const OK_MESSAGE: &str = "OK";

/// Outcome of [`ExchangeReader::read`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeReadResult {
    /// The verified payload; `None` whenever `is_valid` is false.
    pub document: Option<ExchangePayload>,
    /// Whether every stage passed.
    pub is_valid: bool,
    /// `"OK"` or the first failing stage's message.
    pub message: String,
}

/// Stage 1: structural envelope parse.
pub fn parse_envelope(json: &str) -> Result<ParsedEnvelope, ReadError> {
    EnvelopeCodec::parse(json).map_err(|e| ReadError::Parse(e.to_string()))
}

/// Stage 2: decode the payload, requiring a tree.
pub fn extract_payload(parsed: &ParsedEnvelope) -> Result<ExchangePayload, ReadError> {
    let object = parsed
        .payload
        .as_object()
        .ok_or_else(|| ReadError::Parse("payload is not a JSON object".into()))?;
    match object.get(TREE_KEY) {
        None | Some(Value::Null) => return Err(ReadError::MissingTree),
        Some(_) => {}
    }
    serde_json::from_value(parsed.payload.clone()).map_err(|e| ReadError::Parse(e.to_string()))
}

/// Stage 3: header leaf, leaf hashes, root.
pub fn check_integrity(payload: &ExchangePayload) -> Result<(), ReadError> {
    payload
        .tree()
        .verify()
        .map_err(|e| ReadError::InvalidRoot(e.to_string()))
}

/// Stage 4: `now - timestamp` must not exceed `max_age`, and
/// `timestamp - now` must not exceed `max_clock_skew`.
///
/// Both bounds are inclusive. The future bound is what makes
/// [`InMemoryNonceStore::prune_before`](crate::InMemoryNonceStore::prune_before)
/// safe.
pub fn check_freshness(
    payload: &ExchangePayload,
    max_age: Duration,
    max_clock_skew: Duration,
    now: &Timestamp,
) -> Result<(), ReadError> {
    let age = payload.timestamp().age_at(now);
    if age > max_age {
        return Err(ReadError::TooOld {
            age_secs: age.num_seconds(),
            max_age_secs: max_age.num_seconds(),
        });
    }
    if age < -max_clock_skew {
        return Err(ReadError::IssuedInFuture {
            ahead_secs: (-age).num_seconds(),
            max_skew_secs: max_clock_skew.num_seconds(),
        });
    }
    Ok(())
}

/// Stage 5: the nonce must be unseen. A store failure fails this stage.
pub async fn check_replay(payload: &ExchangePayload, store: &dyn NonceStore) -> Result<(), ReadError> {
    match store.has_valid_nonce(payload.nonce()).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(ReadError::InvalidNonce(format!(
            "nonce {} has already been used",
            payload.nonce().log_prefix()
        ))),
        Err(e) => Err(ReadError::InvalidNonce(e.to_string())),
    }
}

/// Stage 6: apply `requirement` to the envelope's signatures.
///
/// `Skip` passes without consulting any verifier.
pub async fn check_signatures(
    envelope: &Envelope,
    requirement: &SignatureRequirement,
    resolver: &dyn VerifierResolver,
) -> Result<(), ReadError> {
    match requirement {
        SignatureRequirement::Skip => return Ok(()),
        SignatureRequirement::Unrecognized(value) => {
            return Err(ReadError::UnknownPolicy(value.clone()))
        }
        SignatureRequirement::AtLeastOne | SignatureRequirement::All => {}
    }

    let result = EnvelopeCodec::verify(envelope, resolver).await;
    tracing::debug!(
        stage = "signatures",
        policy = %requirement,
        signatures = result.signature_count,
        verified = result.verified_count,
        "signatures verified"
    );
    match requirement {
        SignatureRequirement::AtLeastOne if result.verified_count == 0 => {
            Err(ReadError::NoVerifiedSignatures {
                count: result.signature_count,
            })
        }
        SignatureRequirement::All if result.verified_count < result.signature_count => {
            let unverified = result
                .unverified()
                .map(|s| s.label())
                .collect::<Vec<_>>()
                .join(", ");
            Err(ReadError::UnverifiedSignatures {
                verified: result.verified_count,
                count: result.signature_count,
                unverified,
            })
        }
        _ => Ok(()),
    }
}

/// Stage 7: run the context's attestation check, if the payload carries an
/// attestation.
pub async fn check_attestation(
    payload: &ExchangePayload,
    context: &VerificationContext,
) -> Result<(), ReadError> {
    if payload.attestation().is_none() {
        return Ok(());
    }
    let Some(check) = context.attestation_check() else {
        return Err(ReadError::InvalidAttestation(
            "the document is attested but no attestation check is configured".into(),
        ));
    };
    match check.check(payload).await {
        Ok(result) if result.is_valid => Ok(()),
        Ok(result) => Err(ReadError::InvalidAttestation(result.message)),
        Err(e) => Err(ReadError::InvalidAttestation(e.to_string())),
    }
}

/// Reads and verifies exchange documents.
pub struct ExchangeReader;

impl ExchangeReader {
    /// Run every stage and return the payload, or the first stage's error.
    pub async fn read_document(
        json: &str,
        context: &VerificationContext,
    ) -> Result<ExchangePayload, ReadError> {
        let result = Self::run(json, context).await;
        if let Err(e) = &result {
            tracing::warn!(category = ?e.category(), reason = %e, "exchange document rejected");
        }
        result
    }

    /// Like [`read_document`](Self::read_document), folded into a result
    /// value with a diagnostic message.
    pub async fn read(json: &str, context: &VerificationContext) -> ExchangeReadResult {
        match Self::read_document(json, context).await {
            Ok(document) => ExchangeReadResult {
                document: Some(document),
                is_valid: true,
                message: OK_MESSAGE.to_string(),
            },
            Err(e) => ExchangeReadResult {
                document: None,
                is_valid: false,
                message: e.to_string(),
            },
        }
    }

    async fn run(json: &str, context: &VerificationContext) -> Result<ExchangePayload, ReadError> {
        let parsed = parse_envelope(json)?;
        tracing::debug!(stage = "parse", signatures = parsed.signature_count, "stage passed");

        let payload = extract_payload(&parsed)?;
        tracing::debug!(stage = "payload", leaves = payload.tree().leaves().len(), "stage passed");

        check_integrity(&payload)?;
        tracing::debug!(stage = "integrity", "stage passed");

        check_freshness(&payload, context.max_age(), context.max_clock_skew(), &context.now())?;
        tracing::debug!(stage = "freshness", timestamp = %payload.timestamp(), "stage passed");

        check_replay(&payload, context.nonce_store()).await?;
        tracing::debug!(stage = "replay", nonce = payload.nonce().log_prefix(), "stage passed");

        check_signatures(&parsed.envelope, context.signature_requirement(), context.verifiers()).await?;

        check_attestation(&payload, context).await?;
        tracing::debug!(stage = "attestation", attested = payload.attestation().is_some(), "stage passed");

        Ok(payload)
    }
}
