//! Operations on an in-memory favorites collection.
//!
//! A collection is a plain `Vec<FavoriteRecord>` kept unique by
//! `(id, category)`. Linear scans are fine: collections are per-user and small.

use crate::{Category, FavoriteKey, FavoriteRecord, Snapshot, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Outcome of toggling a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    /// The key was absent and an unsynced record was prepended
    Added,
    /// The key was present and its record was removed
    Removed,
}

impl Toggle {
    /// Membership after the toggle.
    pub fn is_favorited(&self) -> bool {
        matches!(self, Toggle::Added)
    }
}

/// Per-category and total counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteCounts {
    pub business: usize,
    pub coupon: usize,
    pub total: usize,
}

impl FavoriteCounts {
    pub fn get(&self, category: Category) -> usize {
        match category {
            Category::Business => self.business,
            Category::Coupon => self.coupon,
        }
    }
}

pub fn position(records: &[FavoriteRecord], id: &str, category: Category) -> Option<usize> {
    records.iter().position(|r| r.matches(id, category))
}

pub fn contains(records: &[FavoriteRecord], id: &str, category: Category) -> bool {
    position(records, id, category).is_some()
}

/// Flip membership of `(id, category)`.
///
/// Removal drops the record regardless of its sync state. Addition prepends
/// an unsynced record stamped with `now`.
pub fn toggle(
    records: &mut Vec<FavoriteRecord>,
    id: &str,
    category: Category,
    snapshot: Option<Snapshot>,
    now: Timestamp,
) -> Toggle {
    match position(records, id, category) {
        Some(index) => {
            records.remove(index);
            Toggle::Removed
        }
        None => {
            records.insert(0, FavoriteRecord::optimistic(id, category, snapshot, now));
            Toggle::Added
        }
    }
}

/// Mark the record for `(id, category)` as acknowledged.
///
/// Returns `true` only if a record was found and its flag changed.
pub fn mark_synced(records: &mut [FavoriteRecord], id: &str, category: Category) -> bool {
    match records.iter_mut().find(|r| r.matches(id, category)) {
        Some(record) if !record.synced => {
            record.synced = true;
            true
        }
        _ => false,
    }
}

pub fn by_category(records: &[FavoriteRecord], category: Category) -> Vec<FavoriteRecord> {
    records
        .iter()
        .filter(|r| r.category == category)
        .cloned()
        .collect()
}

pub fn unsynced(records: &[FavoriteRecord]) -> impl Iterator<Item = &FavoriteRecord> {
    records.iter().filter(|r| !r.synced)
}

pub fn counts(records: &[FavoriteRecord]) -> FavoriteCounts {
    let mut counts = FavoriteCounts::default();
    for record in records {
        match record.category {
            Category::Business => counts.business += 1,
            Category::Coupon => counts.coupon += 1,
        }
    }
    counts.total = records.len();
    counts
}

/// Stable sort, newest first.
pub fn sort_newest_first(records: &mut [FavoriteRecord]) {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

/// Drop later duplicates of a key, keeping the first occurrence.
///
/// Returns the number of records removed.
pub fn dedupe(records: &mut Vec<FavoriteRecord>) -> usize {
    let before = records.len();
    let mut seen: HashSet<FavoriteKey> = HashSet::with_capacity(records.len());
    records.retain(|r| seen.insert(r.key()));
    before - records.len()
}
