//! # Envelope Codec
//!
//! Wraps a canonically encoded payload in a multi-signature envelope shaped
//! like the JWS JSON general serialization:
//!
//! ```json
//! { "payload": "<base64url>",
//!   "signatures": [ { "signature": "<base64url>", "protected": "<base64url>", "header": {..} } ] }
//! ```
//!
//! Each signature covers `protected "." payload`. Verification is
//! non-escalating: a signature that cannot be checked for any reason is
//! counted as unverified and reported in its status, never raised as an
//! error. Whether the counts are acceptable is a policy decision made by
//! the caller.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use sdx_core::{base64url_decode, base64url_encode, CanonicalBytes};

use crate::error::EnvelopeError;
use crate::header::{signing_input, ProtectedHeader};
use crate::signer::{Signer, VerifierResolver};

/// One signature over the envelope payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureEntry {
    /// Base64url signature bytes.
    pub signature: String,
    /// Base64url protected header.
    pub protected: String,
    /// Optional unprotected header members.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<Map<String, Value>>,
}

/// A payload plus its signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    payload: String,
    signatures: Vec<SignatureEntry>,
}

impl Envelope {
    /// Base64url payload as carried on the wire.
    pub fn payload_b64(&self) -> &str {
        &self.payload
    }

    /// Decoded payload bytes.
    pub fn payload_bytes(&self) -> Result<Vec<u8>, EnvelopeError> {
        Ok(base64url_decode(&self.payload)?)
    }

    /// Decode the payload as JSON into `T`.
    pub fn decode_payload<T: DeserializeOwned>(&self) -> Result<T, EnvelopeError> {
        let bytes = self.payload_bytes()?;
        serde_json::from_slice(&bytes)
            .map_err(|e| EnvelopeError::Malformed(format!("payload is not valid JSON: {e}")))
    }

    /// Signature entries in order.
    pub fn signatures(&self) -> &[SignatureEntry] {
        &self.signatures
    }

    /// Number of signature entries.
    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }

    /// Sign the existing payload once more and append the entry.
    pub async fn add_signature(&mut self, signer: &dyn Signer) -> Result<(), EnvelopeError> {
        let entry = sign_entry(&self.payload, signer).await?;
        self.signatures.push(entry);
        Ok(())
    }

    /// Compact JSON text.
    pub fn to_json(&self) -> Result<String, EnvelopeError> {
        serde_json::to_string(self).map_err(|e| EnvelopeError::Malformed(e.to_string()))
    }

    /// Parse and structurally validate envelope JSON.
    pub fn from_json(json: &str) -> Result<Self, EnvelopeError> {
        EnvelopeCodec::parse(json).map(|parsed| parsed.envelope)
    }
}

async fn sign_entry(payload_b64: &str, signer: &dyn Signer) -> Result<SignatureEntry, EnvelopeError> {
    let header = ProtectedHeader::new(signer.algorithm(), signer.key_id().map(str::to_string));
    let protected = header.encode()?;
    let input = signing_input(&protected, payload_b64);
    let signature = signer.sign(&header, &input).await?;
    Ok(SignatureEntry {
        signature: base64url_encode(&signature),
        protected,
        header: None,
    })
}

/// A structurally valid envelope with its decoded payload.
#[derive(Debug, Clone)]
pub struct ParsedEnvelope {
    /// The envelope as received.
    pub envelope: Envelope,
    /// Decoded payload JSON.
    pub payload: Value,
    /// Number of signature entries.
    pub signature_count: usize,
}

/// Result of checking one signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureOutcome {
    /// The verifier accepted the signature.
    Verified,
    /// The verifier rejected the signature.
    Rejected,
    /// The protected header or signature bytes could not be decoded.
    Undecodable(String),
    /// No verifier is registered for the header's algorithm.
    NoVerifier,
    /// The verifier backend failed.
    VerifierError(String),
}

/// Per-signature verification status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureStatus {
    /// Position in the envelope's signature list.
    pub index: usize,
    /// `alg` from the protected header, when decodable.
    pub algorithm: Option<String>,
    /// `kid` from the protected header, when present.
    pub key_id: Option<String>,
    /// What happened.
    pub outcome: SignatureOutcome,
}

impl SignatureStatus {
    /// Returns `true` when the signature verified.
    pub fn is_verified(&self) -> bool {
        self.outcome == SignatureOutcome::Verified
    }

    /// Short human-readable label: `#index (alg, kid)`.
    pub fn label(&self) -> String {
        let alg = self.algorithm.as_deref().unwrap_or("?");
        match &self.key_id {
            Some(kid) => format!("#{} ({alg}, kid {kid})", self.index),
            None => format!("#{} ({alg})", self.index),
        }
    }
}

/// Aggregate result of [`EnvelopeCodec::verify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeVerification {
    /// Number of signatures examined.
    pub signature_count: usize,
    /// Number that verified.
    pub verified_count: usize,
    /// One status per signature, in envelope order.
    pub statuses: Vec<SignatureStatus>,
}

impl EnvelopeVerification {
    /// Statuses of signatures that did not verify.
    pub fn unverified(&self) -> impl Iterator<Item = &SignatureStatus> {
        self.statuses.iter().filter(|s| !s.is_verified())
    }
}

/// Build, parse, and verify envelopes.
pub struct EnvelopeCodec;

impl EnvelopeCodec {
    /// Canonically encode `payload` and sign it once per signer.
    ///
    /// # Errors
    ///
    /// `NoSigners` for an empty signer list; `Canonicalization` if the
    /// payload cannot be canonically encoded; `Capability` if a signer fails.
    pub async fn build<T: Serialize + ?Sized>(
        payload: &T,
        signers: &[&dyn Signer],
    ) -> Result<Envelope, EnvelopeError> {
        if signers.is_empty() {
            return Err(EnvelopeError::NoSigners);
        }
        let canonical = CanonicalBytes::new(&payload)?;
        let payload_b64 = base64url_encode(canonical.as_bytes());
        let mut signatures = Vec::with_capacity(signers.len());
        for signer in signers {
            signatures.push(sign_entry(&payload_b64, *signer).await?);
        }
        tracing::debug!(signatures = signatures.len(), "envelope built");
        Ok(Envelope {
            payload: payload_b64,
            signatures,
        })
    }

    /// Structural validation only; no signature is checked.
    ///
    /// # Errors
    ///
    /// `MissingPayload`, `MissingSignatures`, `EmptySignatureList`, or
    /// `Malformed` for bad JSON, non-string members, or undecodable base64.
    pub fn parse(json: &str) -> Result<ParsedEnvelope, EnvelopeError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| EnvelopeError::Malformed(format!("envelope is not valid JSON: {e}")))?;
        let object = value
            .as_object()
            .ok_or_else(|| EnvelopeError::Malformed("envelope is not a JSON object".into()))?;

        match object.get("payload") {
            None | Some(Value::Null) => return Err(EnvelopeError::MissingPayload),
            Some(Value::String(_)) => {}
            Some(_) => return Err(EnvelopeError::Malformed("payload is not a string".into())),
        }
        match object.get("signatures") {
            None | Some(Value::Null) => return Err(EnvelopeError::MissingSignatures),
            Some(Value::Array(list)) if list.is_empty() => {
                return Err(EnvelopeError::EmptySignatureList)
            }
            Some(Value::Array(_)) => {}
            Some(_) => return Err(EnvelopeError::Malformed("signatures is not an array".into())),
        }

        let envelope: Envelope = serde_json::from_value(value)
            .map_err(|e| EnvelopeError::Malformed(format!("invalid signature entry: {e}")))?;
        let payload = envelope.decode_payload::<Value>()?;
        let signature_count = envelope.signatures.len();
        Ok(ParsedEnvelope {
            envelope,
            payload,
            signature_count,
        })
    }

    /// Check every signature against the verifier its `alg` resolves to.
    ///
    /// Never fails: each problem is recorded in that signature's status.
    /// Signatures are checked one after another, in envelope order.
    pub async fn verify(envelope: &Envelope, resolver: &dyn VerifierResolver) -> EnvelopeVerification {
        let mut statuses = Vec::with_capacity(envelope.signatures.len());
        for (index, entry) in envelope.signatures.iter().enumerate() {
            let status = verify_entry(index, entry, &envelope.payload, resolver).await;
            tracing::debug!(
                index,
                alg = status.algorithm.as_deref().unwrap_or("?"),
                verified = status.is_verified(),
                "signature checked"
            );
            statuses.push(status);
        }
        let verified_count = statuses.iter().filter(|s| s.is_verified()).count();
        EnvelopeVerification {
            signature_count: statuses.len(),
            verified_count,
            statuses,
        }
    }
}

async fn verify_entry(
    index: usize,
    entry: &SignatureEntry,
    payload_b64: &str,
    resolver: &dyn VerifierResolver,
) -> SignatureStatus {
    let mut status = SignatureStatus {
        index,
        algorithm: None,
        key_id: None,
        outcome: SignatureOutcome::NoVerifier,
    };

    let header = match ProtectedHeader::decode(&entry.protected) {
        Ok(header) => header,
        Err(e) => {
            status.outcome = SignatureOutcome::Undecodable(e.to_string());
            return status;
        }
    };
    status.algorithm = Some(header.alg.clone());
    status.key_id = header.kid.clone();

    let signature = match base64url_decode(&entry.signature) {
        Ok(bytes) => bytes,
        Err(e) => {
            status.outcome = SignatureOutcome::Undecodable(e.to_string());
            return status;
        }
    };
    let Some(verifier) = resolver.resolve(&header.alg) else {
        return status;
    };

    let input = signing_input(&entry.protected, payload_b64);
    status.outcome = match verifier.verify(&header, &input, &signature).await {
        Ok(true) => SignatureOutcome::Verified,
        Ok(false) => SignatureOutcome::Rejected,
        Err(e) => SignatureOutcome::VerifierError(e.to_string()),
    };
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CapabilityError;
    use crate::signer::{SignatureVerifier, VerifierSet};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;

    /// Signs with the input reversed; verifies by reversing again.
    struct Mirror {
        alg: &'static str,
    }

    #[async_trait]
    impl Signer for Mirror {
        fn algorithm(&self) -> &str {
            self.alg
        }

        async fn sign(&self, _: &ProtectedHeader, input: &[u8]) -> Result<Vec<u8>, CapabilityError> {
            Ok(input.iter().rev().copied().collect())
        }
    }

    #[async_trait]
    impl SignatureVerifier for Mirror {
        async fn verify(&self, _: &ProtectedHeader, input: &[u8], sig: &[u8]) -> Result<bool, CapabilityError> {
            Ok(input.iter().rev().copied().eq(sig.iter().copied()))
        }
    }

    struct Broken;

    #[async_trait]
    impl SignatureVerifier for Broken {
        async fn verify(&self, _: &ProtectedHeader, _: &[u8], _: &[u8]) -> Result<bool, CapabilityError> {
            Err(CapabilityError::new("verifier", "hsm offline"))
        }
    }

    struct FailingSigner;

    #[async_trait]
    impl Signer for FailingSigner {
        fn algorithm(&self) -> &str {
            "none"
        }

        async fn sign(&self, _: &ProtectedHeader, _: &[u8]) -> Result<Vec<u8>, CapabilityError> {
            Err(CapabilityError::new("signer", "key locked"))
        }
    }

    fn mirror_set() -> VerifierSet {
        VerifierSet::new().with("mirror", Arc::new(Mirror { alg: "mirror" }))
    }

    #[tokio::test]
    async fn build_requires_a_signer() {
        let err = EnvelopeCodec::build(&json!({"a": "1"}), &[]).await.unwrap_err();
        assert!(matches!(err, EnvelopeError::NoSigners));
    }

    #[tokio::test]
    async fn build_encodes_canonical_payload() {
        let signer = Mirror { alg: "mirror" };
        let env = EnvelopeCodec::build(&json!({"b": "2", "a": "1"}), &[&signer]).await.unwrap();
        assert_eq!(env.payload_bytes().unwrap(), br#"{"a":"1","b":"2"}"#.to_vec());
        assert_eq!(env.signature_count(), 1);
    }

    #[tokio::test]
    async fn signer_failure_propagates() {
        let err = EnvelopeCodec::build(&json!({}), &[&FailingSigner]).await.unwrap_err();
        assert!(matches!(err, EnvelopeError::Capability(_)));
    }

    #[tokio::test]
    async fn verify_counts_and_orders_statuses() {
        let good = Mirror { alg: "mirror" };
        let unknown = Mirror { alg: "other" };
        let mut env = EnvelopeCodec::build(&json!({"x": 1}), &[&good, &unknown]).await.unwrap();
        env.add_signature(&good).await.unwrap();

        let result = EnvelopeCodec::verify(&env, &mirror_set()).await;
        assert_eq!(result.signature_count, 3);
        assert_eq!(result.verified_count, 2);
        assert_eq!(result.statuses[0].outcome, SignatureOutcome::Verified);
        assert_eq!(result.statuses[1].outcome, SignatureOutcome::NoVerifier);
        assert_eq!(result.statuses[2].outcome, SignatureOutcome::Verified);
        let unverified: Vec<usize> = result.unverified().map(|s| s.index).collect();
        assert_eq!(unverified, vec![1]);
    }

    #[tokio::test]
    async fn tampered_payload_is_rejected_not_raised() {
        let signer = Mirror { alg: "mirror" };
        let env = EnvelopeCodec::build(&json!({"x": 1}), &[&signer]).await.unwrap();
        let mut tampered = env.clone();
        tampered.payload = base64url_encode(br#"{"x":2}"#);
        let result = EnvelopeCodec::verify(&tampered, &mirror_set()).await;
        assert_eq!(result.verified_count, 0);
        assert_eq!(result.statuses[0].outcome, SignatureOutcome::Rejected);
    }

    #[tokio::test]
    async fn verifier_error_and_bad_header_are_counted() {
        let signer = Mirror { alg: "mirror" };
        let mut env = EnvelopeCodec::build(&json!({"x": 1}), &[&signer, &signer]).await.unwrap();
        env.signatures[1].protected = "%%%".to_string();

        let broken = VerifierSet::new().with("mirror", Arc::new(Broken));
        let result = EnvelopeCodec::verify(&env, &broken).await;
        assert_eq!(result.verified_count, 0);
        assert!(matches!(result.statuses[0].outcome, SignatureOutcome::VerifierError(_)));
        assert!(matches!(result.statuses[1].outcome, SignatureOutcome::Undecodable(_)));
    }

    #[tokio::test]
    async fn json_roundtrip_preserves_envelope() {
        let signer = Mirror { alg: "mirror" };
        let env = EnvelopeCodec::build(&json!({"a": "1"}), &[&signer]).await.unwrap();
        let text = env.to_json().unwrap();
        let parsed = EnvelopeCodec::parse(&text).unwrap();
        assert_eq!(parsed.envelope, env);
        assert_eq!(parsed.payload, json!({"a": "1"}));
        assert_eq!(parsed.signature_count, 1);
        assert_eq!(Envelope::from_json(&text).unwrap(), env);
    }

    #[test]
    fn parse_structural_errors() {
        assert!(matches!(
            EnvelopeCodec::parse(r#"{"signatures":[]}"#),
            Err(EnvelopeError::MissingPayload)
        ));
        assert!(matches!(
            EnvelopeCodec::parse(r#"{"payload":"e30"}"#),
            Err(EnvelopeError::MissingSignatures)
        ));
        assert!(matches!(
            EnvelopeCodec::parse(r#"{"payload":"e30","signatures":[]}"#),
            Err(EnvelopeError::EmptySignatureList)
        ));
        assert!(matches!(EnvelopeCodec::parse("not json"), Err(EnvelopeError::Malformed(_))));
        assert!(matches!(EnvelopeCodec::parse("[]"), Err(EnvelopeError::Malformed(_))));
        assert!(matches!(
            EnvelopeCodec::parse(r#"{"payload":"%%","signatures":[{"signature":"","protected":""}]}"#),
            Err(EnvelopeError::Malformed(_))
        ));
    }

    #[test]
    fn parse_keeps_unprotected_header() {
        let text = r#"{"payload":"e30","signatures":[{"signature":"AA","protected":"e30","header":{"note":"x"}}]}"#;
        let parsed = EnvelopeCodec::parse(text).unwrap();
        let header = parsed.envelope.signatures()[0].header.as_ref().unwrap();
        assert_eq!(header["note"], "x");
    }
}
