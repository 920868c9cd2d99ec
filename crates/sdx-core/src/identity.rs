//! # Nonces
//!
//! `Nonce` is the single-use token that binds an exchange payload to one
//! presentation. Verifiers hand it to a nonce store, which accepts each
//! value at most once.
//!
//! ## Security Invariant
//!
//! Generated nonces carry 128 bits from the operating system CSPRNG and are
//! rendered as exactly 32 lowercase hex characters. Caller-supplied nonces
//! are accepted as-is when non-blank; their entropy is the caller's concern.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::SdxError;

/// Number of random bytes in a generated nonce.
pub const NONCE_BYTES: usize = 16;

/// Length of a generated nonce in characters.
pub const GENERATED_NONCE_LEN: usize = NONCE_BYTES * 2;

/// A single-use replay-protection token.
///
/// Deserialization goes through [`Nonce::new`], so a blank nonce never
/// decodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Nonce(String);

impl Nonce {
    /// Generate a fresh 128-bit nonce.
    pub fn generate() -> Self {
        let mut bytes = [0u8; NONCE_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Wrap a caller-supplied nonce.
    ///
    /// # Errors
    ///
    /// Returns `SdxError::Validation` if the value is empty or whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, SdxError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(SdxError::Validation("nonce must not be empty".to_string()));
        }
        Ok(Self(value))
    }

    /// Access the nonce text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A short prefix suitable for log fields.
    pub fn log_prefix(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(8)
            .map(|(i, _)| i)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl std::fmt::Display for Nonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Nonce {
    type Error = SdxError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Nonce> for String {
    fn from(nonce: Nonce) -> Self {
        nonce.0
    }
}

impl AsRef<str> for Nonce {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
