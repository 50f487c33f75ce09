//! Domain identifiers.
//!
//! # Task identifier layout
//! A tid is rendered as `<ULID>-<vdom>`:
//! - the ULID is 26 characters of Crockford base32 and never contains `-`
//! - the vdom is validated to never contain `-` either
//!
//! Every lookup by domain splits the tid on `-` and takes the second segment
//! as the vdom, so both halves must stay dash-free.
//!
//! ## ULID
//! - sortable by creation time (the timestamp is the most significant part)
//! - generated without coordination between processes
//! - 128-bit, same size as a UUID

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

use super::errors::BloqueoError;

/// Virtual domain: the partition key that scopes a task collection.
///
/// Constructed through [`Vdom::parse`], which rejects empty values and
/// characters that would break tid splitting or blob naming. Deserialization
/// trusts persisted records and does not re-validate; it also accepts a
/// number, which older records may carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Vdom(String);

impl<'de> Deserialize<'de> for Vdom {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(name) => Self(name),
            Raw::Number(n) => Self(n.to_string()),
        })
    }
}

impl Vdom {
    pub fn parse(value: impl Into<String>) -> Result<Self, BloqueoError> {
        let value = value.into();
        if value.is_empty() {
            return Err(BloqueoError::Validation("vdom must not be empty".into()));
        }
        if let Some(bad) = value
            .chars()
            .find(|c| *c == '-' || *c == '/' || *c == '\\' || c.is_whitespace())
        {
            return Err(BloqueoError::Validation(format!(
                "vdom {value:?} contains forbidden character {bad:?}"
            )));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Vdom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Vdom {
    type Err = BloqueoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Task identifier.
///
/// Freshly minted tids always have the `<ULID>-<vdom>` shape, but any string
/// can be wrapped so that historical identifiers remain addressable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tid(String);

impl Tid {
    /// Render `<ulid>-<vdom>`.
    pub fn compose(ulid: Ulid, vdom: &Vdom) -> Self {
        Self(format!("{ulid}-{vdom}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The vdom encoded in the second `-`-delimited segment.
    pub fn vdom(&self) -> Result<Vdom, BloqueoError> {
        let (_, segment) = self
            .leading_segments()
            .ok_or_else(|| BloqueoError::InvalidTid(self.0.clone()))?;
        Vdom::parse(segment).map_err(|_| BloqueoError::InvalidTid(self.0.clone()))
    }

    /// First two `-`-delimited segments, or `None` when there is no `-`.
    pub fn leading_segments(&self) -> Option<(&str, &str)> {
        let mut parts = self.0.split('-');
        let first = parts.next()?;
        let second = parts.next()?;
        Some((first, second))
    }
}

impl From<String> for Tid {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Tid {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Name of the blob holding one domain's task collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionKey(String);

impl CollectionKey {
    /// `bloqueos_<vdom>.json`
    pub fn for_vdom(vdom: &Vdom) -> Self {
        Self(format!("bloqueos_{vdom}.json"))
    }

    /// A collection stored under an explicit blob name.
    pub fn named(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
