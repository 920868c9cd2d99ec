//! # sdx-crypto: Hash Tree and Key Material
//!
//! - **Salted hash tree** with a protected header leaf, root computation,
//!   verification, and redaction ([`HashTree`], [`HashLeaf`]).
//! - **Ed25519** key pairs for the reference envelope signer.
//!
//! ## Crate Policy
//!
//! - Depends only on `sdx-core` internally.
//! - No mocking of cryptographic operations in tests: real SHA-256, real
//!   Keccak-256, real Ed25519.
//! - No `unsafe` code.

pub mod ed25519;
pub mod error;
pub mod leaf;
pub mod tree;

pub use ed25519::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
pub use error::{CryptoError, TreeError};
pub use leaf::{HashLeaf, JSON_CONTENT_TYPE, SALT_LEN};
pub use tree::{compute_root, HashTree, TreeHeader, HEADER_CONTENT_TYPE, TREE_TYPE};
