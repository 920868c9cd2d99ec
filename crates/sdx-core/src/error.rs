//! # Error Types: Shared Error Hierarchy
//!
//! Defines the error types shared by every crate in the workspace. All
//! errors use `thiserror` for derive-based `Display` and `Error`
//! implementations.
//!
//! ## Design
//!
//! - Canonicalization errors carry the offending value.
//! - Encoding errors name the field being decoded and the expected shape.
//! - Higher layers wrap these in their own enums via `#[from]`.

use thiserror::Error;

/// Top-level error type for the core primitives.
#[derive(Error, Debug)]
pub enum SdxError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Hex or base64url decoding failed.
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// A value failed structural validation (timestamp, nonce, identifier).
    #[error("validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    /// Numbers must be integers; fractional values must be strings.
    #[error("float values are not permitted in canonical representations; use string or integer: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Error while decoding hex or base64url text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// The text is not valid hex.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// The text is not valid unpadded base64url.
    #[error("invalid base64url: {0}")]
    InvalidBase64(String),

    /// The decoded value has the wrong byte length.
    #[error("expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Required number of bytes.
        expected: usize,
        /// Number of bytes actually decoded.
        actual: usize,
    },
}
