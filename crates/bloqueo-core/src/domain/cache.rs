//! Final-status cache entry.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::state::TaskStatus;

/// How long a terminal outcome stays live after it is written.
pub fn final_status_ttl() -> Duration {
    Duration::minutes(30)
}

/// Remembered terminal outcome of one task.
///
/// An entry past `expiration` is logically dead but stays in the cache blob
/// until an explicit sweep removes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub status: TaskStatus,
    pub cliente: String,
    #[serde(deserialize_with = "deserialize_utc")]
    pub timestamp: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_utc")]
    pub expiration: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(status: TaskStatus, cliente: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            status,
            cliente: cliente.into(),
            timestamp: now,
            expiration: now + final_status_ttl(),
        }
    }

    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expiration > now
    }
}

/// Parse an instant written either as RFC 3339 or as a naive UTC timestamp
/// (`2024-01-01T12:00:00.123456`, `2024-01-01 12:00:00`).
pub fn parse_utc(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Serde adapter for [`parse_utc`].
pub(crate) fn deserialize_utc<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_utc(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognised timestamp {raw:?}")))
}
