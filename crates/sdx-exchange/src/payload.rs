//! The signed exchange payload.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use sdx_core::{Nonce, Timestamp};
use sdx_crypto::HashTree;

use crate::locator::AttestationLocator;

/// Wire key of the tree inside a payload.
pub const TREE_KEY: &str = "merkleTree";

/// A finalized tree plus the metadata the envelope signature protects.
///
/// Wire form:
/// `{"merkleTree": .., "attestation"?: .., "timestamp": .., "nonce": .., "issuedTo"?: {..}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangePayload {
    pub(crate) merkle_tree: HashTree,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) attestation: Option<AttestationLocator>,
    pub(crate) timestamp: Timestamp,
    pub(crate) nonce: Nonce,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) issued_to: Option<BTreeMap<String, String>>,
}

impl ExchangePayload {
    /// The disclosed tree.
    pub fn tree(&self) -> &HashTree {
        &self.merkle_tree
    }

    /// Creation instant.
    pub fn timestamp(&self) -> &Timestamp {
        &self.timestamp
    }

    /// Replay-protection nonce.
    pub fn nonce(&self) -> &Nonce {
        &self.nonce
    }

    /// Recipient identifiers, if any.
    pub fn issued_to(&self) -> Option<&BTreeMap<String, String>> {
        self.issued_to.as_ref()
    }

    /// External attestation of the tree root, if any.
    pub fn attestation(&self) -> Option<&AttestationLocator> {
        self.attestation.as_ref()
    }

    /// Consume the payload, keeping the tree.
    pub fn into_tree(self) -> HashTree {
        self.merkle_tree
    }
}
