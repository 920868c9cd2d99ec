//! The per-signature protected header.

use serde::{Deserialize, Serialize};

use sdx_core::{base64url_decode, base64url_encode, CanonicalBytes};

use crate::error::EnvelopeError;

/// Fixed `typ` of every protected header.
pub const ENVELOPE_TYPE: &str = "JOSE+JSON";

/// `{ "alg": .., "typ": "JOSE+JSON", "kid"?: .. }`, base64url-encoded on the
/// wire and covered by the signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedHeader {
    /// Signature algorithm identifier, e.g. `"EdDSA"`.
    pub alg: String,
    /// Always [`ENVELOPE_TYPE`] for headers produced here.
    pub typ: String,
    /// Optional key identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

impl ProtectedHeader {
    /// Header for a signer's algorithm and key id.
    pub fn new(alg: impl Into<String>, kid: Option<String>) -> Self {
        Self {
            alg: alg.into(),
            typ: ENVELOPE_TYPE.to_string(),
            kid,
        }
    }

    /// Canonical JSON, base64url-encoded.
    pub fn encode(&self) -> Result<String, EnvelopeError> {
        Ok(base64url_encode(CanonicalBytes::new(self)?.as_bytes()))
    }

    /// Decode from the wire form.
    pub fn decode(encoded: &str) -> Result<Self, EnvelopeError> {
        let bytes = base64url_decode(encoded)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| EnvelopeError::Malformed(format!("protected header is not valid JSON: {e}")))
    }
}

/// The bytes a signature covers: `ASCII(protected "." payload)`.
pub fn signing_input(protected_b64: &str, payload_b64: &str) -> Vec<u8> {
    let mut input = Vec::with_capacity(protected_b64.len() + 1 + payload_b64.len());
    input.extend_from_slice(protected_b64.as_bytes());
    input.push(b'.');
    input.extend_from_slice(payload_b64.as_bytes());
    input
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_is_canonical_and_omits_absent_kid() {
        let header = ProtectedHeader::new("EdDSA", None);
        let bytes = base64url_decode(&header.encode().unwrap()).unwrap();
        assert_eq!(bytes, br#"{"alg":"EdDSA","typ":"JOSE+JSON"}"#);
    }

    #[test]
    fn decode_roundtrip_with_kid() {
        let header = ProtectedHeader::new("EdDSA", Some("issuer-key-1".into()));
        let back = ProtectedHeader::decode(&header.encode().unwrap()).unwrap();
        assert_eq!(back, header);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            ProtectedHeader::decode("!!!"),
            Err(EnvelopeError::Malformed(_))
        ));
        let not_json = base64url_encode(b"not json");
        assert!(matches!(
            ProtectedHeader::decode(&not_json),
            Err(EnvelopeError::Malformed(_))
        ));
    }

    #[test]
    fn signing_input_joins_with_dot() {
        assert_eq!(signing_input("aGVhZA", "Ym9keQ"), b"aGVhZA.Ym9keQ".to_vec());
    }
}
