//! Errors for envelope construction, parsing, and the signing capabilities.

use sdx_core::{CanonicalizationError, EncodingError};
use thiserror::Error;

/// Errors from building or parsing an envelope.
#[derive(Error, Debug)]
pub enum EnvelopeError {
    /// `build()` was called with an empty signer list.
    #[error("at least one signer is required")]
    NoSigners,

    /// The envelope JSON has no `payload` member.
    #[error("envelope has no payload")]
    MissingPayload,

    /// The envelope JSON has no `signatures` member.
    #[error("envelope has no signatures member")]
    MissingSignatures,

    /// The `signatures` member is an empty array.
    #[error("envelope signature list is empty")]
    EmptySignatureList,

    /// The envelope is not well-formed JSON or carries undecodable base64.
    #[error("malformed envelope: {0}")]
    Malformed(String),

    /// The payload could not be canonically encoded.
    #[error("payload canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// A signer failed to produce a signature.
    #[error("signer failed: {0}")]
    Capability(#[from] CapabilityError),
}

impl From<EncodingError> for EnvelopeError {
    fn from(e: EncodingError) -> Self {
        Self::Malformed(e.to_string())
    }
}

/// Failure reported by an injected capability (signer, verifier, nonce
/// store, attestation service).
///
/// Capabilities are supplied by the embedding application, so the error
/// carries the backend's message verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{capability} failed: {message}")]
pub struct CapabilityError {
    /// Which capability failed (e.g. `"signer"`, `"nonce store"`).
    pub capability: &'static str,
    /// Backend message.
    pub message: String,
}

impl CapabilityError {
    /// Construct a capability error.
    pub fn new(capability: &'static str, message: impl Into<String>) -> Self {
        Self {
            capability,
            message: message.into(),
        }
    }
}
