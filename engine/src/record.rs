//! Record types for favorited entities.

use crate::{EntityId, Error, Snapshot, Timestamp};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Storage key used when no identity is signed in.
pub const ANONYMOUS_KEY: &str = "anonymous";

/// Prefix of every signed-in identity's storage key.
pub const IDENTITY_KEY_PREFIX: &str = "user_";

/// Map an optional identity to the key its collection is stored under.
///
/// Signed-in identities are prefixed, so no identity string can produce the
/// anonymous key or any other key that does not start with the prefix.
pub fn identity_key(identity: Option<&str>) -> Cow<'_, str> {
    match identity {
        Some(identity) => Cow::Owned(format!("{IDENTITY_KEY_PREFIX}{identity}")),
        None => Cow::Borrowed(ANONYMOUS_KEY),
    }
}

/// The favoritable entity families. Each has its own remote endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Business,
    Coupon,
}

impl Category {
    /// Every category, in a fixed order.
    pub const ALL: [Category; 2] = [Category::Business, Category::Coupon];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Business => "business",
            Category::Coupon => "coupon",
        }
    }

    /// Name of the snapshot field that must always be present for display.
    pub fn display_field(&self) -> &'static str {
        match self {
            Category::Business => "name",
            Category::Coupon => "title",
        }
    }

    /// Human label used in placeholder snapshots.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Business => "Business",
            Category::Coupon => "Coupon",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "business" | "businesses" => Ok(Category::Business),
            "coupon" | "coupons" => Ok(Category::Coupon),
            other => Err(Error::UnknownCategory(other.to_string())),
        }
    }
}

/// Identity of a record within a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FavoriteKey {
    pub id: EntityId,
    pub category: Category,
}

impl FavoriteKey {
    pub fn new(id: impl Into<EntityId>, category: Category) -> Self {
        Self {
            id: id.into(),
            category,
        }
    }
}

/// A favorited entity in a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteRecord {
    /// The favorited entity
    pub id: EntityId,
    /// Endpoint family that owns the entity
    #[serde(alias = "type")]
    pub category: Category,
    /// Insertion time (milliseconds since epoch), used for ordering
    pub timestamp: Timestamp,
    /// Whether the remote store has acknowledged this record
    pub synced: bool,
    /// Denormalized display data
    pub snapshot: Snapshot,
}

impl FavoriteRecord {
    /// Create an optimistic, not yet acknowledged record.
    ///
    /// A missing snapshot, or one for another category, is replaced by a
    /// placeholder derived from the id.
    pub fn optimistic(
        id: impl Into<EntityId>,
        category: Category,
        snapshot: Option<Snapshot>,
        timestamp: Timestamp,
    ) -> Self {
        let id = id.into();
        let snapshot = Snapshot::for_record(category, &id, snapshot);
        Self {
            id,
            category,
            timestamp,
            synced: false,
            snapshot,
        }
    }

    /// Create a record acknowledged by the remote store.
    pub fn synced(
        id: impl Into<EntityId>,
        category: Category,
        snapshot: Option<Snapshot>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            synced: true,
            ..Self::optimistic(id, category, snapshot, timestamp)
        }
    }

    pub fn key(&self) -> FavoriteKey {
        FavoriteKey::new(self.id.clone(), self.category)
    }

    pub fn matches(&self, id: &str, category: Category) -> bool {
        self.category == category && self.id == id
    }
}
