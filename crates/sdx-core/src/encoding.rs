//! # Text Encodings
//!
//! Byte strings cross the wire in two forms:
//!
//! - `0x`-prefixed lowercase hex for leaf data, salts, hashes, and roots.
//! - Unpadded base64url (RFC 4648 §5) for envelope payloads, protected
//!   headers, and signatures.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::error::EncodingError;

/// Encode bytes as `0x`-prefixed lowercase hex.
pub fn encode_prefixed_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Decode hex text, accepting an optional `0x`/`0X` prefix and either case.
pub fn decode_prefixed_hex(s: &str) -> Result<Vec<u8>, EncodingError> {
    let s = s.trim();
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    hex::decode(digits).map_err(|e| EncodingError::InvalidHex(format!("{s:?}: {e}")))
}

/// Encode bytes as unpadded base64url.
pub fn base64url_encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode base64url text. Trailing `=` padding is tolerated.
pub fn base64url_decode(s: &str) -> Result<Vec<u8>, EncodingError> {
    URL_SAFE_NO_PAD
        .decode(s.trim().trim_end_matches('='))
        .map_err(|e| EncodingError::InvalidBase64(e.to_string()))
}

/// Serde adapter for `Option<Vec<u8>>` fields written as prefixed hex.
pub mod opt_prefixed_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize `Some(bytes)` as prefixed hex; `None` is skipped by the caller.
    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_str(&super::encode_prefixed_hex(bytes)),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize an optional prefixed-hex string.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        let s: Option<String> = Option::deserialize(deserializer)?;
        s.map(|s| super::decode_prefixed_hex(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
