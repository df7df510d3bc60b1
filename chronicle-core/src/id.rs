//! Record identifiers.
//!
//! Ids are opaque strings, unique within their collection. New ids are
//! minted as `{prefix}_{n}` where `n` is timestamp-derived, or as
//! `{prefix}_{uuid}` when the store is configured for random ids.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of a record within its collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Wrap an existing id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether the id is empty.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// How new ids are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdScheme {
    /// `{prefix}_{unix millis}`, bumped past the last minted value.
    #[default]
    Timestamp,
    /// `{prefix}_{uuid v4}`.
    Uuid,
}

impl IdScheme {
    /// Get the configuration name for this scheme.
    pub fn name(&self) -> &'static str {
        match self {
            IdScheme::Timestamp => "timestamp",
            IdScheme::Uuid => "uuid",
        }
    }
}

impl FromStr for IdScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "timestamp" | "time" | "sequential" => Ok(IdScheme::Timestamp),
            "uuid" | "random" => Ok(IdScheme::Uuid),
            other => Err(format!("unknown id scheme '{other}'")),
        }
    }
}

/// Mints ids that never repeat for the lifetime of one store.
#[derive(Debug, Clone)]
pub struct IdMinter {
    scheme: IdScheme,
    last: i64,
}

impl IdMinter {
    /// Create a minter for the given scheme.
    pub fn new(scheme: IdScheme) -> Self {
        Self { scheme, last: 0 }
    }

    /// Get the scheme in use.
    pub fn scheme(&self) -> IdScheme {
        self.scheme
    }

    /// Mint a new id with `prefix`, skipping any id for which `taken` is true.
    pub fn mint(&mut self, prefix: &str, taken: impl Fn(&EntityId) -> bool) -> EntityId {
        match self.scheme {
            IdScheme::Timestamp => {
                let mut n = Utc::now().timestamp_millis().max(self.last + 1);
                loop {
                    let id = EntityId(format!("{prefix}_{n}"));
                    if !taken(&id) {
                        self.last = n;
                        return id;
                    }
                    n += 1;
                }
            }
            IdScheme::Uuid => loop {
                let id = EntityId(format!("{prefix}_{}", Uuid::new_v4().simple()));
                if !taken(&id) {
                    return id;
                }
            },
        }
    }
}
