//! # Cryptographic Error Types
//!
//! Structured errors for hash-tree construction, validation, and Ed25519
//! key handling.

use sdx_core::CanonicalizationError;
use thiserror::Error;

/// Errors from building, validating, or redacting a hash tree.
#[derive(Error, Debug)]
pub enum TreeError {
    /// `finalize()` was called without any data leaf.
    #[error("hash tree has no data leaves; at least one leaf besides the header is required")]
    EmptyTree,

    /// A revealed leaf's data and salt do not hash to its stored hash.
    #[error("leaf {index} hash does not match its data and salt")]
    LeafHashMismatch {
        /// Index of the first mismatching leaf.
        index: usize,
    },

    /// The stored root does not match the root recomputed from leaf hashes.
    #[error("stored root does not match the root computed from leaf hashes")]
    RootMismatch,

    /// Redaction targeted the header leaf.
    #[error("the header leaf (index 0) cannot be redacted")]
    HeaderLeafProtected,

    /// A leaf index is past the end of the tree.
    #[error("leaf index {index} out of range for tree with {len} leaves")]
    LeafIndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of leaves in the tree.
        len: usize,
    },

    /// The header leaf is missing, redacted, undecodable, or inconsistent.
    #[error("invalid header leaf: {0}")]
    InvalidHeader(String),

    /// A leaf violates the `data` iff `salt` rule.
    #[error("malformed leaf {index}: {reason}")]
    MalformedLeaf {
        /// Index of the malformed leaf.
        index: usize,
        /// What is wrong with it.
        reason: String,
    },

    /// An operation needs a finalized tree (header leaf and root present).
    #[error("hash tree has not been finalized")]
    NotFinalized,

    /// Leaf content was requested from a redacted leaf.
    #[error("leaf is redacted; its content is not available")]
    LeafNotRevealed,

    /// Canonical encoding of leaf content failed.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Revealed leaf content is not the expected JSON.
    #[error("leaf content is not valid JSON for the requested type: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from Ed25519 key handling and verification.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Signature verification failed.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),

    /// Key parsing failed.
    #[error("key error: {0}")]
    KeyError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_hash_mismatch_names_index() {
        let err = TreeError::LeafHashMismatch { index: 3 };
        assert!(err.to_string().contains("leaf 3"));
    }

    #[test]
    fn out_of_range_names_index_and_len() {
        let msg = TreeError::LeafIndexOutOfRange { index: 9, len: 4 }.to_string();
        assert!(msg.contains('9'));
        assert!(msg.contains('4'));
    }

    #[test]
    fn header_protected_mentions_index_zero() {
        assert!(TreeError::HeaderLeafProtected.to_string().contains("index 0"));
    }
}
