//! # Temporal Types: UTC Timestamps
//!
//! Defines `Timestamp`, a UTC-only instant truncated to microseconds.
//!
//! ## Invariants
//!
//! - Always UTC. Rendered with a `Z` suffix, never `+00:00`.
//! - Exactly six fractional digits (`2026-01-15T12:00:00.000000Z`), so a
//!   timestamp has one canonical text form inside signed payloads.
//! - Microsecond resolution is what the freshness check operates on: a
//!   payload exactly `max_age` old is fresh, one microsecond older is not.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SdxError;

/// A UTC-only timestamp, truncated to microsecond precision.
///
/// # Construction
///
/// - [`Timestamp::now()`]: current UTC time.
/// - [`Timestamp::from_utc()`]: from a `DateTime<Utc>`.
/// - [`Timestamp::parse()`]: strict: requires the `Z` suffix.
/// - [`Timestamp::parse_lenient()`]: any RFC 3339 offset, converted to UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current UTC time, truncated to microseconds.
    pub fn now() -> Self {
        Self::from_utc(Utc::now())
    }

    /// Create a timestamp from a `DateTime<Utc>`, truncating below microseconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt.trunc_subsecs(6))
    }

    /// Parse an RFC 3339 string that uses the `Z` suffix.
    ///
    /// # Errors
    ///
    /// Returns `SdxError::Validation` for malformed text or any explicit
    /// offset, including `+00:00`.
    pub fn parse(s: &str) -> Result<Self, SdxError> {
        if !s.ends_with('Z') {
            return Err(SdxError::Validation(format!(
                "timestamp must use Z suffix (UTC only), got: {s:?}"
            )));
        }
        Self::parse_lenient(s)
    }

    /// Parse an RFC 3339 string with any offset, converting to UTC.
    pub fn parse_lenient(s: &str) -> Result<Self, SdxError> {
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| SdxError::Validation(format!("invalid RFC 3339 timestamp {s:?}: {e}")))?;
        Ok(Self::from_utc(dt.with_timezone(&Utc)))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Time elapsed from this timestamp until `now`. Negative when this
    /// timestamp lies in the future relative to `now`.
    pub fn age_at(&self, now: &Timestamp) -> Duration {
        now.0 - self.0
    }

    /// This timestamp moved back by `d`, or `None` on overflow.
    pub fn checked_sub(&self, d: Duration) -> Option<Self> {
        self.0.checked_sub_signed(d).map(Self::from_utc)
    }

    /// This timestamp moved forward by `d`, or `None` on overflow.
    pub fn checked_add(&self, d: Duration) -> Option<Self> {
        self.0.checked_add_signed(d).map(Self::from_utc)
    }

    /// Render as ISO 8601 with six fractional digits and a `Z` suffix.
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_utc(dt)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_iso8601())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse_lenient(&s).map_err(serde::de::Error::custom)
    }
}
