use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TypeError;
use crate::oid::Oid;

/// A user-initiated mutation recorded for later synchronization.
///
/// The operation log never interprets `extras`; it is carried as an opaque
/// JSON value. On disk each operation is one JSON object per line:
///
/// ```text
/// {"oid":"…","object_oid":"…","name":"review-flashcard","timestamp":"2024-05-01T10:00:00.000Z","extras":{…}}
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Unique identifier of this operation.
    pub oid: Oid,
    /// Identifier of the entity the operation applies to.
    pub object_oid: String,
    /// Mutation kind, e.g. `review-flashcard` or `complete-reminder`.
    pub name: String,
    /// Creation instant.
    #[serde(with = "iso8601")]
    pub timestamp: DateTime<Utc>,
    /// Opaque payload.
    #[serde(default = "empty_extras")]
    pub extras: Value,
}

impl Operation {
    /// Create an operation with a fresh oid, stamped with the current time.
    pub fn new(object_oid: impl Into<String>, name: impl Into<String>, extras: Value) -> Self {
        Self {
            oid: Oid::generate(),
            object_oid: object_oid.into(),
            name: name.into(),
            timestamp: Utc::now().trunc_subsecs(3),
            extras,
        }
    }

    /// Replace the generated oid.
    pub fn with_oid(mut self, oid: Oid) -> Self {
        self.oid = oid;
        self
    }

    /// Replace the timestamp.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Serialize to a single JSON line (without the trailing newline).
    pub fn to_line(&self) -> Result<String, TypeError> {
        serde_json::to_string(self).map_err(|e| TypeError::Serialization(e.to_string()))
    }

    /// Parse an operation from one JSON line.
    pub fn from_line(line: &str) -> Result<Self, TypeError> {
        serde_json::from_str(line).map_err(|e| TypeError::Serialization(e.to_string()))
    }

    /// Human-readable summary used in pack entries.
    pub fn description(&self) -> String {
        format!("Operation {} on object {}", self.name, self.object_oid)
    }
}

fn empty_extras() -> Value {
    Value::Object(serde_json::Map::new())
}

/// RFC 3339 timestamps with millisecond precision and a `Z` suffix.
pub mod iso8601 {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// RFC 3339 in UTC with a `Z` suffix. Always at least millisecond
    /// precision; finer fractions are kept when present.
    pub fn format(ts: &DateTime<Utc>) -> String {
        let nanos = ts.timestamp_subsec_nanos();
        let precision = if nanos % 1_000_000 == 0 {
            SecondsFormat::Millis
        } else if nanos % 1_000 == 0 {
            SecondsFormat::Micros
        } else {
            SecondsFormat::Nanos
        };
        ts.to_rfc3339_opts(precision, true)
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
