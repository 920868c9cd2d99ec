//! # Exchange Payload Builder
//!
//! Assembles a finalized tree with a timestamp, nonce, optional recipient
//! identifiers and an optional attestation locator, then optionally wraps
//! the result in a signed envelope.
//!
//! ```ignore
//! let envelope = ExchangePayloadBuilder::from_tree(tree)?
//!     .with_nonce(None)?
//!     .with_issued_to("email", "holder@example.org")?
//!     .build_signed(&[&signer])
//!     .await?;
//! ```

use std::collections::BTreeMap;

use sdx_core::{Nonce, Timestamp};
use sdx_crypto::HashTree;
use sdx_envelope::{Envelope, EnvelopeCodec, Signer};

use crate::error::BuildError;
use crate::locator::AttestationLocator;
use crate::payload::ExchangePayload;

/// Builder for [`ExchangePayload`].
#[derive(Debug, Clone)]
pub struct ExchangePayloadBuilder {
    tree: HashTree,
    nonce: Option<Nonce>,
    timestamp: Option<Timestamp>,
    attestation: Option<AttestationLocator>,
    issued_to: BTreeMap<String, String>,
}

impl ExchangePayloadBuilder {
    /// Start from a finalized tree.
    ///
    /// # Errors
    ///
    /// `MissingTree` for `None`; `TreeNotFinalized` if the tree has no root.
    pub fn from_tree(tree: impl Into<Option<HashTree>>) -> Result<Self, BuildError> {
        let tree = tree.into().ok_or(BuildError::MissingTree)?;
        if !tree.is_finalized() {
            return Err(BuildError::TreeNotFinalized);
        }
        Ok(Self {
            tree,
            nonce: None,
            timestamp: None,
            attestation: None,
            issued_to: BTreeMap::new(),
        })
    }

    /// Use `value` as the nonce, or generate a 128-bit one for `None`.
    ///
    /// # Errors
    ///
    /// `InvalidNonce` for a blank caller nonce.
    pub fn with_nonce(mut self, value: Option<&str>) -> Result<Self, BuildError> {
        let nonce = match value {
            Some(v) => Nonce::new(v).map_err(|e| BuildError::InvalidNonce(e.to_string()))?,
            None => Nonce::generate(),
        };
        self.nonce = Some(nonce);
        Ok(self)
    }

    /// Pin the creation instant instead of stamping the current time at
    /// build. Used to reproduce documents and in tests.
    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Attach an attestation locator.
    ///
    /// # Errors
    ///
    /// `InvalidLocator` if a required locator field is blank.
    pub fn with_attestation(mut self, locator: AttestationLocator) -> Result<Self, BuildError> {
        locator.validate()?;
        self.attestation = Some(locator);
        Ok(self)
    }

    /// Add one recipient identifier.
    ///
    /// # Errors
    ///
    /// `InvalidIdentifier` for a blank key or value.
    pub fn with_issued_to(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, BuildError> {
        let (key, value) = (key.into(), value.into());
        if key.trim().is_empty() {
            return Err(BuildError::InvalidIdentifier("identifier key must not be empty".into()));
        }
        if value.trim().is_empty() {
            return Err(BuildError::InvalidIdentifier(format!(
                "identifier {key:?} has an empty value"
            )));
        }
        self.issued_to.insert(key, value);
        Ok(self)
    }

    /// Add several recipient identifiers.
    pub fn with_issued_to_map<I, K, V>(self, identifiers: I) -> Result<Self, BuildError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        identifiers
            .into_iter()
            .try_fold(self, |builder, (k, v)| builder.with_issued_to(k, v))
    }

    /// Stamp the timestamp, generate a nonce if none was set, and return the
    /// payload. No signing happens here.
    pub fn build(self) -> Result<ExchangePayload, BuildError> {
        let payload = ExchangePayload {
            merkle_tree: self.tree,
            attestation: self.attestation,
            timestamp: self.timestamp.unwrap_or_else(Timestamp::now),
            nonce: self.nonce.unwrap_or_else(Nonce::generate),
            issued_to: (!self.issued_to.is_empty()).then_some(self.issued_to),
        };
        tracing::debug!(
            nonce = payload.nonce.log_prefix(),
            timestamp = %payload.timestamp,
            attested = payload.attestation.is_some(),
            "exchange payload built"
        );
        Ok(payload)
    }

    /// Like [`build`](Self::build), but requires an attestation locator.
    ///
    /// # Errors
    ///
    /// `MissingAttestation` if `with_attestation()` was not called.
    pub fn build_attested(self) -> Result<ExchangePayload, BuildError> {
        if self.attestation.is_none() {
            return Err(BuildError::MissingAttestation);
        }
        self.build()
    }

    /// Build, then sign with every signer.
    pub async fn build_signed(self, signers: &[&dyn Signer]) -> Result<Envelope, BuildError> {
        let payload = self.build()?;
        Ok(EnvelopeCodec::build(&payload, signers).await?)
    }

    /// Build an attested payload, then sign with every signer.
    pub async fn build_signed_attested(self, signers: &[&dyn Signer]) -> Result<Envelope, BuildError> {
        let payload = self.build_attested()?;
        Ok(EnvelopeCodec::build(&payload, signers).await?)
    }
}
