//! # Exchange Error Types
//!
//! One enum per concern: building a payload, reading a document, the
//! attestation registry, and configuration loading.
//!
//! [`ReadError`] variants follow pipeline stage order. The first failing
//! stage determines the error, and its `Display` text is the diagnostic
//! message returned to callers.

use sdx_envelope::EnvelopeError;
use thiserror::Error;

/// Errors from [`ExchangePayloadBuilder`](crate::ExchangePayloadBuilder).
#[derive(Error, Debug)]
pub enum BuildError {
    /// No tree was supplied.
    #[error("The exchange payload has no Merkle tree")]
    MissingTree,

    /// The tree has no root yet.
    #[error("the Merkle tree must be finalized before building a payload")]
    TreeNotFinalized,

    /// A caller-supplied nonce is blank.
    #[error("invalid nonce: {0}")]
    InvalidNonce(String),

    /// `build_attested()` without `with_attestation()`.
    #[error("an attested payload requires an attestation locator")]
    MissingAttestation,

    /// An attestation locator field is blank.
    #[error("invalid attestation locator: {0}")]
    InvalidLocator(String),

    /// An issued-to key or value is blank.
    #[error("invalid issued-to identifier: {0}")]
    InvalidIdentifier(String),

    /// Envelope construction failed.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
}

/// Failure class of a [`ReadError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadErrorCategory {
    /// Malformed envelope or payload.
    Structural,
    /// Hash or root mismatch.
    Integrity,
    /// Stale timestamp or reused nonce. A fresh document may succeed.
    TemporalReplay,
    /// Insufficient verified signatures or unknown policy.
    Policy,
    /// The attestation check failed or could not be performed.
    Attestation,
}

/// Why a document was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    /// The envelope or payload could not be parsed.
    #[error("Unable to parse exchange document: {0}")]
    Parse(String),

    /// The payload carries no tree.
    #[error("The exchange payload has no Merkle tree")]
    MissingTree,

    /// Header, leaf hash, or root check failed.
    #[error("The Merkle root is not valid: {0}")]
    InvalidRoot(String),

    /// The payload timestamp is older than the configured maximum age.
    #[error("The exchange document is too old: issued {age_secs}s ago, maximum age is {max_age_secs}s")]
    TooOld {
        /// Age of the document in whole seconds.
        age_secs: i64,
        /// Configured maximum in whole seconds.
        max_age_secs: i64,
    },

    /// The payload timestamp is further ahead of the clock than the
    /// tolerated skew.
    #[error("The exchange document is dated in the future: {ahead_secs}s ahead, maximum skew is {max_skew_secs}s")]
    IssuedInFuture {
        /// How far ahead of the clock, in whole seconds.
        ahead_secs: i64,
        /// Configured tolerance in whole seconds.
        max_skew_secs: i64,
    },

    /// The nonce was rejected or could not be checked.
    #[error("The nonce is not valid: {0}")]
    InvalidNonce(String),

    /// `AtLeastOne` policy and nothing verified.
    #[error("No signatures could be verified ({count} present)")]
    NoVerifiedSignatures {
        /// Number of signatures on the envelope.
        count: usize,
    },

    /// `All` policy and at least one signature did not verify.
    #[error("Not all signatures could be verified ({verified} of {count}); unverified: {unverified}")]
    UnverifiedSignatures {
        /// Number that verified.
        verified: usize,
        /// Number of signatures on the envelope.
        count: usize,
        /// Labels of the unverified signatures.
        unverified: String,
    },

    /// The signature requirement is not a known policy.
    #[error("Unknown signature verification policy: {0}")]
    UnknownPolicy(String),

    /// The attestation did not check out.
    #[error("The attestation is not valid: {0}")]
    InvalidAttestation(String),
}

impl ReadError {
    /// Failure class of this error.
    pub fn category(&self) -> ReadErrorCategory {
        match self {
            Self::Parse(_) | Self::MissingTree => ReadErrorCategory::Structural,
            Self::InvalidRoot(_) => ReadErrorCategory::Integrity,
            Self::TooOld { .. } | Self::IssuedInFuture { .. } | Self::InvalidNonce(_) => {
                ReadErrorCategory::TemporalReplay
            }
            Self::NoVerifiedSignatures { .. }
            | Self::UnverifiedSignatures { .. }
            | Self::UnknownPolicy(_) => ReadErrorCategory::Policy,
            Self::InvalidAttestation(_) => ReadErrorCategory::Attestation,
        }
    }

    /// Whether asking the producer for a fresh document could succeed.
    pub fn is_retryable_with_fresh_document(&self) -> bool {
        self.category() == ReadErrorCategory::TemporalReplay
    }
}

/// Errors from the attestation verifier registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A verifier reported a blank service id.
    #[error("invalid attestation verifier: {0}")]
    InvalidVerifier(String),

    /// No verifier is registered for the service id.
    #[error("Unknown attestation service: {0}")]
    UnknownService(String),
}

/// Errors from loading [`ReaderConfig`](crate::ReaderConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// YAML text could not be parsed.
    #[error("invalid YAML reader configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON text could not be parsed.
    #[error("invalid JSON reader configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration file could not be read.
    #[error("cannot read reader configuration {path}: {source}")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A value is out of range.
    #[error("invalid reader configuration value for {field}: {reason}")]
    InvalidValue {
        /// Offending field or environment variable.
        field: String,
        /// What is wrong with it.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_follow_taxonomy() {
        assert_eq!(ReadError::Parse("x".into()).category(), ReadErrorCategory::Structural);
        assert_eq!(ReadError::MissingTree.category(), ReadErrorCategory::Structural);
        assert_eq!(ReadError::InvalidRoot("x".into()).category(), ReadErrorCategory::Integrity);
        assert_eq!(
            ReadError::TooOld { age_secs: 2, max_age_secs: 1 }.category(),
            ReadErrorCategory::TemporalReplay
        );
        assert_eq!(
            ReadError::UnknownPolicy("Most".into()).category(),
            ReadErrorCategory::Policy
        );
        assert_eq!(
            ReadError::InvalidAttestation("x".into()).category(),
            ReadErrorCategory::Attestation
        );
    }

    #[test]
    fn only_temporal_errors_are_retryable() {
        assert!(ReadError::InvalidNonce("seen".into()).is_retryable_with_fresh_document());
        assert!(!ReadError::InvalidRoot("x".into()).is_retryable_with_fresh_document());
    }

    #[test]
    fn messages_carry_key_phrases() {
        assert_eq!(ReadError::MissingTree.to_string(), "The exchange payload has no Merkle tree");
        assert!(ReadError::TooOld { age_secs: 90_000, max_age_secs: 86_400 }
            .to_string()
            .contains("too old"));
        assert!(RegistryError::UnknownService("eas".into())
            .to_string()
            .contains("Unknown attestation service"));
    }
}
