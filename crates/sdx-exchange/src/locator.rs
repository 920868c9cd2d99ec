//! # Attestation Locator
//!
//! Points at an external attestation of a tree root. On the wire the
//! locator is a single-entry map keyed by the attestation service id:
//!
//! ```json
//! { "eas": { "network": "sepolia", "attestationUid": "0x..", "from": "0x..", "to": "0x..",
//!            "schema": { "schemaUid": "0x..", "name": "PrivateData" } } }
//! ```
//!
//! All fields are opaque caller strings; only presence is checked.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::BuildError;

/// Where and how a tree root was attested.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttestationLocator {
    /// Attestation service, e.g. `"eas"`. Used for verifier lookup.
    pub service_id: String,
    /// Network the attestation lives on.
    pub network: String,
    /// Schema identifier.
    pub schema_id: String,
    /// Human-readable schema name.
    pub schema_name: Option<String>,
    /// Identifier of the attestation record.
    pub attestation_id: String,
    /// Who made the attestation.
    pub attester: String,
    /// Who the attestation is about.
    pub recipient: String,
}

impl AttestationLocator {
    /// Check that every required field is present.
    pub fn validate(&self) -> Result<(), BuildError> {
        let required = [
            ("service id", &self.service_id),
            ("network", &self.network),
            ("schema id", &self.schema_id),
            ("attestation id", &self.attestation_id),
            ("attester", &self.attester),
            ("recipient", &self.recipient),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(BuildError::InvalidLocator(format!("{name} must not be empty")));
            }
        }
        if matches!(&self.schema_name, Some(name) if name.trim().is_empty()) {
            return Err(BuildError::InvalidLocator("schema name must not be blank when present".into()));
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchemaWire {
    schema_uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocatorWire {
    network: String,
    attestation_uid: String,
    from: String,
    to: String,
    schema: SchemaWire,
}

impl Serialize for AttestationLocator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = LocatorWire {
            network: self.network.clone(),
            attestation_uid: self.attestation_id.clone(),
            from: self.attester.clone(),
            to: self.recipient.clone(),
            schema: SchemaWire {
                schema_uid: self.schema_id.clone(),
                name: self.schema_name.clone(),
            },
        };
        let mut map = BTreeMap::new();
        map.insert(self.service_id.as_str(), wire);
        map.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AttestationLocator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = BTreeMap::<String, LocatorWire>::deserialize(deserializer)?;
        if map.len() != 1 {
            return Err(serde::de::Error::custom(format!(
                "attestation must name exactly one service, found {}",
                map.len()
            )));
        }
        let (service_id, wire) = map
            .into_iter()
            .next()
            .ok_or_else(|| serde::de::Error::custom("attestation names no service"))?;
        Ok(Self {
            service_id,
            network: wire.network,
            schema_id: wire.schema.schema_uid,
            schema_name: wire.schema.name,
            attestation_id: wire.attestation_uid,
            attester: wire.from,
            recipient: wire.to,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> AttestationLocator {
        AttestationLocator {
            service_id: "eas".into(),
            network: "sepolia".into(),
            schema_id: "0xschema".into(),
            schema_name: Some("PrivateData".into()),
            attestation_id: "0xatt".into(),
            attester: "0xFrom".into(),
            recipient: "0xTo".into(),
        }
    }

    #[test]
    fn wire_form_is_keyed_by_service() {
        let v = serde_json::to_value(sample()).unwrap();
        assert_eq!(
            v,
            json!({"eas": {
                "network": "sepolia",
                "attestationUid": "0xatt",
                "from": "0xFrom",
                "to": "0xTo",
                "schema": {"schemaUid": "0xschema", "name": "PrivateData"}
            }})
        );
        let back: AttestationLocator = serde_json::from_value(v).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn rejects_zero_or_many_services() {
        assert!(serde_json::from_value::<AttestationLocator>(json!({})).is_err());
        let one = serde_json::to_value(sample()).unwrap()["eas"].clone();
        assert!(serde_json::from_value::<AttestationLocator>(json!({"a": one.clone(), "b": one})).is_err());
    }

    #[test]
    fn validate_names_blank_field() {
        let mut loc = sample();
        loc.recipient = "  ".into();
        match loc.validate() {
            Err(BuildError::InvalidLocator(msg)) => assert!(msg.contains("recipient")),
            other => panic!("expected InvalidLocator, got {other:?}"),
        }
        let mut loc = sample();
        loc.schema_name = None;
        assert!(loc.validate().is_ok());
    }
}
