//! # sdx-core: Foundational Types for Selective-Disclosure Exchanges
//!
//! This crate is the leaf of the workspace DAG. It defines the primitives
//! that every other crate agrees on: how values become bytes, how bytes
//! become hashes, and how instants and nonces are represented.
//!
//! ## Key Design Principles
//!
//! 1. **`CanonicalBytes` newtype.** Every hashed or signed JSON value flows
//!    through `CanonicalBytes::new()` (RFC 8785). No raw `serde_json::to_vec()`
//!    on a hashing or signing path.
//!
//! 2. **Algorithm-tagged hashing.** `HashAlgorithm::hash()` is the single
//!    hashing entry point; the algorithm comes from the tree header, never
//!    from verifier preference.
//!
//! 3. **UTC-only timestamps** with fixed microsecond rendering.
//!
//! 4. **Nonce newtype** with 128-bit generation.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `sdx-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod encoding;
pub mod error;
pub mod identity;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use digest::{HashAlgorithm, HashValue, HASH_LEN};
pub use encoding::{base64url_decode, base64url_encode, decode_prefixed_hex, encode_prefixed_hex};
pub use error::{CanonicalizationError, EncodingError, SdxError};
pub use identity::Nonce;
pub use temporal::Timestamp;
