//! Reader configuration.
//!
//! Loaded from YAML or JSON, or from environment variables, with defaults
//! of a one-day maximum age, five minutes of tolerated clock skew and the
//! `AtLeastOne` signature policy.

use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::policy::SignatureRequirement;

/// Default maximum document age: one day.
pub const DEFAULT_MAX_AGE_SECS: u64 = 86_400;

/// Default tolerance for timestamps ahead of the reader's clock.
pub const DEFAULT_MAX_CLOCK_SKEW_SECS: u64 = 300;

// chrono durations are bounded by i64 milliseconds.
const MAX_DURATION_SECS: u64 = (i64::MAX / 1_000) as u64;

/// Settings for [`ExchangeReader`](crate::ExchangeReader).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReaderConfig {
    /// Oldest acceptable document, in seconds.
    pub max_age_secs: u64,
    /// How far a document timestamp may run ahead of the clock, in seconds.
    pub max_clock_skew_secs: u64,
    /// How many signatures must verify.
    pub signature_requirement: SignatureRequirement,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            max_age_secs: DEFAULT_MAX_AGE_SECS,
            max_clock_skew_secs: DEFAULT_MAX_CLOCK_SKEW_SECS,
            signature_requirement: SignatureRequirement::default(),
        }
    }
}

impl ReaderConfig {
    /// Parse YAML text. Missing fields take their defaults.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()
    }

    /// Parse JSON text. Missing fields take their defaults.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()
    }

    /// Read a file; `.json` files are parsed as JSON, anything else as YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json_str(&text),
            _ => Self::from_yaml_str(&text),
        }
    }

    /// Load from `SDX_MAX_AGE_SECS`, `SDX_MAX_CLOCK_SKEW_SECS` and
    /// `SDX_SIGNATURE_REQUIREMENT`, falling back to defaults for unset
    /// variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(secs) = env_secs("SDX_MAX_AGE_SECS")? {
            config.max_age_secs = secs;
        }
        if let Some(secs) = env_secs("SDX_MAX_CLOCK_SKEW_SECS")? {
            config.max_clock_skew_secs = secs;
        }
        if let Ok(raw) = std::env::var("SDX_SIGNATURE_REQUIREMENT") {
            config.signature_requirement = SignatureRequirement::from(raw);
        }
        config.validate()
    }

    /// `max_age_secs` as a duration, saturating at the largest duration.
    pub fn max_age(&self) -> Duration {
        saturating_secs(self.max_age_secs)
    }

    /// `max_clock_skew_secs` as a duration, saturating at the largest duration.
    pub fn max_clock_skew(&self) -> Duration {
        saturating_secs(self.max_clock_skew_secs)
    }

    fn validate(self) -> Result<Self, ConfigError> {
        for (field, value) in [
            ("max_age_secs", self.max_age_secs),
            ("max_clock_skew_secs", self.max_clock_skew_secs),
        ] {
            if value > MAX_DURATION_SECS {
                return Err(ConfigError::InvalidValue {
                    field: field.into(),
                    reason: format!("{value} is out of range"),
                });
            }
        }
        Ok(self)
    }
}

fn saturating_secs(secs: u64) -> Duration {
    Duration::seconds(secs.min(MAX_DURATION_SECS) as i64)
}

fn env_secs(name: &str) -> Result<Option<u64>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                field: name.into(),
                reason: format!("{raw:?}: {e}"),
            }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ReaderConfig::default();
        assert_eq!(config.max_age(), Duration::days(1));
        assert_eq!(config.max_clock_skew(), Duration::minutes(5));
        assert_eq!(config.signature_requirement, SignatureRequirement::AtLeastOne);
    }

    #[test]
    fn yaml_with_partial_fields() {
        let config = ReaderConfig::from_yaml_str("signature_requirement: All\n").unwrap();
        assert_eq!(config.signature_requirement, SignatureRequirement::All);
        assert_eq!(config.max_age_secs, DEFAULT_MAX_AGE_SECS);
    }

    #[test]
    fn json_config() {
        let config =
            ReaderConfig::from_json_str(r#"{"max_age_secs": 60, "signature_requirement": "Skip"}"#)
                .unwrap();
        assert_eq!(config.max_age(), Duration::seconds(60));
        assert_eq!(config.signature_requirement, SignatureRequirement::Skip);
    }

    #[test]
    fn unknown_policy_loads() {
        let config = ReaderConfig::from_yaml_str("signature_requirement: Majority\n").unwrap();
        assert_eq!(
            config.signature_requirement,
            SignatureRequirement::Unrecognized("Majority".into())
        );
    }

    #[test]
    fn unknown_field_is_rejected() {
        assert!(matches!(
            ReaderConfig::from_yaml_str("max_age: 5\n"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn out_of_range_age_is_rejected() {
        let text = format!("max_age_secs: {}\n", u64::MAX);
        assert!(matches!(
            ReaderConfig::from_yaml_str(&text),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn out_of_range_skew_is_rejected() {
        let text = format!("max_clock_skew_secs: {}\n", MAX_DURATION_SECS + 1);
        assert!(matches!(
            ReaderConfig::from_yaml_str(&text),
            Err(ConfigError::InvalidValue { field, .. }) if field == "max_clock_skew_secs"
        ));
    }

    #[test]
    fn hand_built_config_saturates_instead_of_panicking() {
        let config = ReaderConfig {
            max_age_secs: 1 << 60,
            max_clock_skew_secs: u64::MAX,
            ..ReaderConfig::default()
        };
        assert_eq!(config.max_age(), Duration::seconds(MAX_DURATION_SECS as i64));
        assert_eq!(config.max_clock_skew(), Duration::seconds(MAX_DURATION_SECS as i64));
    }

    #[test]
    fn missing_file_reports_path() {
        match ReaderConfig::from_path("/nonexistent/sdx-reader.yaml") {
            Err(ConfigError::Io { path, .. }) => assert!(path.contains("sdx-reader.yaml")),
            other => panic!("expected Io error, got {other:?}"),
        }
    }

    #[test]
    fn from_env_reads_variables() {
        std::env::set_var("SDX_MAX_AGE_SECS", "120");
        std::env::set_var("SDX_MAX_CLOCK_SKEW_SECS", "30");
        std::env::set_var("SDX_SIGNATURE_REQUIREMENT", "all");
        let config = ReaderConfig::from_env();
        std::env::remove_var("SDX_MAX_AGE_SECS");
        std::env::remove_var("SDX_MAX_CLOCK_SKEW_SECS");
        std::env::remove_var("SDX_SIGNATURE_REQUIREMENT");
        let config = config.unwrap();
        assert_eq!(config.max_age_secs, 120);
        assert_eq!(config.max_clock_skew_secs, 30);
        assert_eq!(config.signature_requirement, SignatureRequirement::All);
    }
}
