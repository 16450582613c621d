//! Denormalized display snapshots.
//!
//! A snapshot caches the fields a list view needs to render a favorite
//! without a network round-trip. It is a tagged union so each category's
//! required display field is checked at compile time.

use crate::{Category, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Number of id characters used in placeholder display names.
const PLACEHOLDER_PREFIX_LEN: usize = 8;

/// Display data for a favorited business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessSnapshot {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl BusinessSnapshot {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            business_type: None,
            address: None,
            rating: None,
            image_url: None,
        }
    }
}

/// Display data for a favorited coupon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponSnapshot {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<Timestamp>,
}

impl CouponSnapshot {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            business_name: None,
            discount: None,
            valid_until: None,
        }
    }
}

/// Category-tagged display snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Snapshot {
    Business(BusinessSnapshot),
    Coupon(CouponSnapshot),
}

impl Snapshot {
    pub fn business(name: impl Into<String>) -> Self {
        Snapshot::Business(BusinessSnapshot::named(name))
    }

    pub fn coupon(title: impl Into<String>) -> Self {
        Snapshot::Coupon(CouponSnapshot::titled(title))
    }

    pub fn category(&self) -> Category {
        match self {
            Snapshot::Business(_) => Category::Business,
            Snapshot::Coupon(_) => Category::Coupon,
        }
    }

    /// The primary label shown for the favorite.
    pub fn display_name(&self) -> &str {
        match self {
            Snapshot::Business(b) => &b.name,
            Snapshot::Coupon(c) => &c.title,
        }
    }

    /// Placeholder derived deterministically from the id, e.g. `Business 1a2b3c4d…`.
    pub fn placeholder(category: Category, id: &str) -> Self {
        let name = placeholder_name(category, id);
        match category {
            Category::Business => Snapshot::business(name),
            Category::Coupon => Snapshot::coupon(name),
        }
    }

    /// Use `snapshot` when it is complete and belongs to `category`,
    /// otherwise a placeholder.
    pub fn for_record(category: Category, id: &str, snapshot: Option<Snapshot>) -> Self {
        match snapshot {
            Some(s) if s.category() == category && s.is_complete() => s,
            _ => Snapshot::placeholder(category, id),
        }
    }

    fn is_complete(&self) -> bool {
        !self.display_name().trim().is_empty()
    }

    /// Rebuild a snapshot from stored JSON of unknown shape.
    ///
    /// Returns the snapshot and whether anything had to be synthesized.
    /// The tag is forced to `category`, a missing display field is filled
    /// from the id, and each optional field of the wrong type is dropped on
    /// its own while the rest are kept.
    pub fn repair(category: Category, id: &str, raw: Option<Value>) -> (Self, bool) {
        if let Some(value) = &raw {
            if let Ok(snapshot) = serde_json::from_value::<Snapshot>(value.clone()) {
                if snapshot.category() == category && snapshot.is_complete() {
                    return (snapshot, false);
                }
            }
        }

        let mut fields = match raw {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        fields.insert("kind".into(), Value::from(category.as_str()));

        let display_field = category.display_field();
        let has_display = fields
            .get(display_field)
            .and_then(Value::as_str)
            .is_some_and(|s| !s.trim().is_empty());
        if !has_display {
            fields.insert(
                display_field.into(),
                Value::from(placeholder_name(category, id)),
            );
        }

        let mut required = Map::new();
        for key in ["kind", display_field] {
            if let Some(value) = fields.remove(key) {
                required.insert(key.into(), value);
            }
        }
        let mut kept = required.clone();
        for (key, value) in fields {
            let mut single = required.clone();
            single.insert(key.clone(), value.clone());
            if serde_json::from_value::<Snapshot>(Value::Object(single)).is_ok() {
                kept.insert(key, value);
            }
        }

        let snapshot = serde_json::from_value::<Snapshot>(Value::Object(kept))
            .unwrap_or_else(|_| Snapshot::placeholder(category, id));
        (snapshot, true)
    }
}

fn placeholder_name(category: Category, id: &str) -> String {
    let prefix: String = id.chars().take(PLACEHOLDER_PREFIX_LEN).collect();
    format!("{} {}…", category.label(), prefix)
}
