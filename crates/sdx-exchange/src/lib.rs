//! # sdx-exchange: Selective-Disclosure Exchange Documents
//!
//! Producer side: [`ExchangePayloadBuilder`] wraps a finalized
//! [`HashTree`](sdx_crypto::HashTree) with a timestamp, a nonce, optional
//! recipient identifiers and an optional [`AttestationLocator`], then signs
//! it into an envelope.
//!
//! Verifier side: [`ExchangeReader`] runs the verification pipeline
//! (structure, integrity, freshness, replay, signature policy, attestation)
//! against a [`VerificationContext`] and yields either a verified
//! [`ExchangePayload`] or the first failing stage's message.
//!
//! ## Capabilities
//!
//! Key custody, replay storage and attestation lookups belong to the
//! embedding application and come in through traits:
//! [`NonceStore`], [`AttestationVerifier`] / [`AttestationCheck`], and the
//! signer/verifier traits of `sdx-envelope`. Reference implementations for
//! development are [`InMemoryNonceStore`] and [`LocalAttestationLedger`].
//!
//! ## Crate Policy
//!
//! - No `unwrap()` or `expect()` outside tests.
//! - The library logs through `tracing` and never installs a subscriber.

pub mod attestation;
pub mod builder;
pub mod config;
pub mod context;
pub mod error;
pub mod locator;
pub mod nonce;
pub mod payload;
pub mod policy;
pub mod reader;

pub use attestation::{
    AttestationCheck, AttestationCheckResult, AttestationOutcome, AttestationVerifier,
    AttestationVerifierRegistry, LedgerEntry, LocalAttestationLedger,
};
pub use builder::ExchangePayloadBuilder;
pub use config::{ReaderConfig, DEFAULT_MAX_AGE_SECS, DEFAULT_MAX_CLOCK_SKEW_SECS};
pub use context::VerificationContext;
pub use error::{BuildError, ConfigError, ReadError, ReadErrorCategory, RegistryError};
pub use locator::AttestationLocator;
pub use nonce::{AcceptAllNonces, InMemoryNonceStore, NonceStore};
pub use payload::ExchangePayload;
pub use policy::SignatureRequirement;
pub use reader::{ExchangeReadResult, ExchangeReader, OK_MESSAGE};
