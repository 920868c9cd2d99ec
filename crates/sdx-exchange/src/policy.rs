//! Signature verification policy.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How many envelope signatures must verify for a document to pass.
///
/// Configuration text that names no known policy still loads, as
/// [`Unrecognized`](Self::Unrecognized), and is rejected when a document is
/// read. The pipeline, not the config loader, owns that failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SignatureRequirement {
    /// Signatures are not checked.
    Skip,
    /// At least one signature must verify.
    #[default]
    AtLeastOne,
    /// Every signature must verify.
    All,
    /// A value that names no known policy.
    Unrecognized(String),
}

impl SignatureRequirement {
    /// Canonical name of the policy.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Skip => "Skip",
            Self::AtLeastOne => "AtLeastOne",
            Self::All => "All",
            Self::Unrecognized(other) => other,
        }
    }
}

impl From<&str> for SignatureRequirement {
    fn from(value: &str) -> Self {
        let normalized: String = value
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "skip" => Self::Skip,
            "atleastone" => Self::AtLeastOne,
            "all" => Self::All,
            _ => Self::Unrecognized(value.to_string()),
        }
    }
}

impl From<String> for SignatureRequirement {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<SignatureRequirement> for String {
    fn from(value: SignatureRequirement) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for SignatureRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
