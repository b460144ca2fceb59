//! # Entity Identifiers
//!
//! Every identifier in the system is either database-generated or minted by
//! the fallback store. Fallback ids carry the reserved [`FALLBACK_ID_PREFIX`]
//! so their origin is decidable from the value alone; the tagged [`EntityId`]
//! makes that decision once, when the id enters the process, instead of
//! re-sniffing strings at each call site.
//!
//! A fallback id never migrates into the database, and is routed to the
//! fallback store even while the database is available.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::constants::FALLBACK_ID_PREFIX;

/// Identifier tagged with the backend it originated in
///
/// Only [`EntityId::parse`] and [`EntityId::mint`] build one, so the tag
/// always agrees with the prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct EntityId(Origin);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum Origin {
    /// Generated by the database (uuid or any value without the reserved prefix)
    Database(String),
    /// Minted by the fallback store, always starts with [`FALLBACK_ID_PREFIX`]
    Fallback(String),
}

impl EntityId {
    /// Classify a raw identifier by its prefix
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        if raw.starts_with(FALLBACK_ID_PREFIX) {
            EntityId(Origin::Fallback(raw))
        } else {
            EntityId(Origin::Database(raw))
        }
    }

    /// Mint a new fallback-namespace id, e.g. `mock-block-6f1c...`
    pub fn mint(kind: &str) -> Self {
        EntityId(Origin::Fallback(format!(
            "{FALLBACK_ID_PREFIX}{kind}-{}",
            Uuid::new_v4().simple()
        )))
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.0, Origin::Fallback(_))
    }

    pub fn as_str(&self) -> &str {
        match &self.0 {
            Origin::Database(id) | Origin::Fallback(id) => id,
        }
    }
}

impl From<String> for EntityId {
    fn from(raw: String) -> Self {
        EntityId::parse(raw)
    }
}

impl From<&str> for EntityId {
    fn from(raw: &str) -> Self {
        EntityId::parse(raw)
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        match id.0 {
            Origin::Database(id) | Origin::Fallback(id) => id,
        }
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
