//! # Temporal Types
//!
//! UTC-only timestamp type for the custody stack. Audit entries, transition
//! records, sessions, and reports all carry [`Timestamp`]s; local time is a
//! presentation concern.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A UTC timestamp.
///
/// Serializes to RFC 3339 (e.g. `2026-01-15T12:00:00.123456Z`). Ordered, so
/// the audit log can clamp each new entry to be no earlier than the last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp representing the current UTC time.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create a timestamp from a `chrono::DateTime<Utc>`.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Access the underlying `chrono::DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// The later of `self` and `floor`.
    pub fn not_before(self, floor: Timestamp) -> Self {
        self.max(floor)
    }

    /// This timestamp shifted forward by `secs` seconds.
    pub fn plus_secs(self, secs: i64) -> Self {
        Self(self.0 + Duration::seconds(secs))
    }

    /// ISO 8601 with `Z` suffix, truncated to seconds.
    pub fn to_canonical_string(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }

    /// Digits only, `YYYYMMDDHHMMSS`. Used in report identifiers.
    pub fn to_compact_string(&self) -> String {
        self.0.format("%Y%m%d%H%M%S").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}
