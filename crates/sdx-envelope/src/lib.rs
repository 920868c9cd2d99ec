//! # sdx-envelope: Signed Exchange Envelopes
//!
//! A multi-signature envelope in the JWS JSON general serialization shape.
//! The codec owns encoding and structural validation; signing and
//! verification go through the [`Signer`], [`SignatureVerifier`] and
//! [`VerifierResolver`] capabilities so that key custody stays with the
//! embedding application.
//!
//! ## Crate Policy
//!
//! - Payloads are always canonically encoded before signing.
//! - Verification never fails as a whole: each signature gets a status and
//!   the caller's policy decides what counts as acceptable.
//! - `async` appears only on capability methods.

pub mod ed25519;
pub mod envelope;
pub mod error;
pub mod header;
pub mod signer;

pub use ed25519::{Ed25519Signer, Ed25519Verifier, EDDSA};
pub use envelope::{
    Envelope, EnvelopeCodec, EnvelopeVerification, ParsedEnvelope, SignatureEntry,
    SignatureOutcome, SignatureStatus,
};
pub use error::{CapabilityError, EnvelopeError};
pub use header::{signing_input, ProtectedHeader, ENVELOPE_TYPE};
pub use signer::{SignatureVerifier, Signer, VerifierResolver, VerifierSet};
