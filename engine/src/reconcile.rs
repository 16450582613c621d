//! Reconciliation of local and remote favorites.
//!
//! Runs whenever an identity is established. The remote store is
//! authoritative for every key it knows about; the local collection
//! contributes only what the remote store does not have yet.
//!
//! # Algorithm
//!
//! 1. Map remote rows of each category to synced records
//! 2. Drop remote records that have an unacknowledged local removal pending
//! 3. Append every local record whose key is absent from the remote set
//! 4. Sort newest first

use crate::{
    collection, Category, EntityId, FavoriteKey, FavoriteRecord, Snapshot, Timestamp,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One favorite as reported by the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRow {
    pub entity_id: EntityId,
    /// When the remote store recorded the favorite (milliseconds since epoch)
    pub favorited_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<Snapshot>,
}

impl RemoteRow {
    pub fn new(entity_id: impl Into<EntityId>, favorited_at: Timestamp) -> Self {
        Self {
            entity_id: entity_id.into(),
            favorited_at,
            snapshot: None,
        }
    }

    pub fn with_snapshot(mut self, snapshot: Snapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    /// Convert to an acknowledged record of `category`.
    pub fn into_record(self, category: Category) -> FavoriteRecord {
        FavoriteRecord::synced(self.entity_id, category, self.snapshot, self.favorited_at)
    }
}

/// Counters describing a reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileSummary {
    /// Records taken from the remote store
    pub from_remote: usize,
    /// Local records kept because the remote store lacks them
    pub kept_local: usize,
    /// Local records replaced by their remote version
    pub replaced_local: usize,
    /// Remote records dropped because a local removal is still pending
    pub suppressed: usize,
    /// Categories whose remote query failed and contributed nothing
    pub failed_categories: Vec<Category>,
}

/// Merged collection plus what happened.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileResult {
    pub records: Vec<FavoriteRecord>,
    pub summary: ReconcileSummary,
}

/// Builds a merge of remote rows over a local collection.
#[derive(Debug, Default)]
pub struct Reconciler {
    remote: Vec<FavoriteRecord>,
    removed_keys: HashSet<FavoriteKey>,
    cleared: HashSet<Category>,
    failed: Vec<Category>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the remote rows of one category.
    pub fn with_rows(mut self, category: Category, rows: Vec<RemoteRow>) -> Self {
        self.remote
            .extend(rows.into_iter().map(|row| row.into_record(category)));
        self
    }

    /// Record that the remote query for `category` failed.
    ///
    /// The category contributes no remote rows, so its local records are
    /// kept as they are.
    pub fn with_failed(mut self, category: Category) -> Self {
        if !self.failed.contains(&category) {
            self.failed.push(category);
        }
        self
    }

    /// Hide a remote record whose local removal has not reached the remote store.
    pub fn suppress(mut self, key: FavoriteKey) -> Self {
        self.removed_keys.insert(key);
        self
    }

    /// Hide every remote record of a category with a pending bulk clear.
    pub fn suppress_category(mut self, category: Category) -> Self {
        self.cleared.insert(category);
        self
    }

    /// Merge against the current local collection.
    pub fn reconcile(self, local: &[FavoriteRecord]) -> ReconcileResult {
        let mut summary = ReconcileSummary {
            failed_categories: self.failed,
            ..ReconcileSummary::default()
        };

        let mut merged = self.remote;
        // Remote rows should be unique already; a duplicate row is not a second favorite.
        collection::dedupe(&mut merged);

        let before = merged.len();
        merged.retain(|r| {
            !self.cleared.contains(&r.category) && !self.removed_keys.contains(&r.key())
        });
        summary.suppressed = before - merged.len();
        summary.from_remote = merged.len();

        let remote_keys: HashSet<FavoriteKey> = merged.iter().map(FavoriteRecord::key).collect();
        for record in local {
            if remote_keys.contains(&record.key()) {
                summary.replaced_local += 1;
            } else {
                merged.push(record.clone());
                summary.kept_local += 1;
            }
        }

        collection::sort_newest_first(&mut merged);

        ReconcileResult {
            records: merged,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_wins_for_shared_keys() {
        let local = vec![FavoriteRecord::optimistic(
            "b1",
            Category::Business,
            Some(Snapshot::business("Local name")),
            100,
        )];

        let result = Reconciler::new()
            .with_rows(
                Category::Business,
                vec![RemoteRow::new("b1", 5000).with_snapshot(Snapshot::business("Remote name"))],
            )
            .reconcile(&local);

        assert_eq!(result.records.len(), 1);
        let merged = &result.records[0];
        assert!(merged.synced);
        assert_eq!(merged.timestamp, 5000);
        assert_eq!(merged.snapshot.display_name(), "Remote name");
        assert_eq!(result.summary.replaced_local, 1);
        assert_eq!(result.summary.kept_local, 0);
    }

    #[test]
    fn local_only_records_survive_unchanged() {
        let orphan = FavoriteRecord::optimistic("c9", Category::Coupon, None, 300);
        let local = vec![orphan.clone()];

        let result = Reconciler::new()
            .with_rows(Category::Business, vec![RemoteRow::new("b1", 200)])
            .reconcile(&local);

        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[0], orphan);
        assert_eq!(result.summary.kept_local, 1);
        assert_eq!(result.summary.from_remote, 1);
    }

    #[test]
    fn result_is_sorted_newest_first() {
        let local = vec![
            FavoriteRecord::optimistic("l1", Category::Business, None, 150),
            FavoriteRecord::optimistic("l2", Category::Coupon, None, 50),
        ];

        let result = Reconciler::new()
            .with_rows(Category::Business, vec![RemoteRow::new("r1", 100)])
            .with_rows(Category::Coupon, vec![RemoteRow::new("r2", 200)])
            .reconcile(&local);

        let timestamps: Vec<_> = result.records.iter().map(|r| r.timestamp).collect();
        assert_eq!(timestamps, vec![200, 150, 100, 50]);
    }

    #[test]
    fn missing_remote_snapshot_gets_placeholder() {
        let result = Reconciler::new()
            .with_rows(Category::Coupon, vec![RemoteRow::new("coupon-abcdefgh", 1)])
            .reconcile(&[]);

        assert_eq!(
            result.records[0].snapshot.display_name(),
            "Coupon coupon-a…"
        );
    }

    #[test]
    fn pending_removals_are_not_resurrected() {
        let result = Reconciler::new()
            .with_rows(
                Category::Business,
                vec![RemoteRow::new("gone", 1), RemoteRow::new("kept", 2)],
            )
            .with_rows(Category::Coupon, vec![RemoteRow::new("c1", 3)])
            .suppress(FavoriteKey::new("gone", Category::Business))
            .suppress_category(Category::Coupon)
            .reconcile(&[]);

        let ids: Vec<_> = result.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["kept"]);
        assert_eq!(result.summary.suppressed, 2);
    }

    #[test]
    fn failed_category_keeps_local_records() {
        let local = vec![FavoriteRecord::optimistic("c1", Category::Coupon, None, 10)];

        let result = Reconciler::new()
            .with_rows(Category::Business, vec![RemoteRow::new("b1", 20)])
            .with_failed(Category::Coupon)
            .reconcile(&local);

        assert_eq!(result.records.len(), 2);
        assert!(collection::contains(&result.records, "c1", Category::Coupon));
        assert_eq!(result.summary.failed_categories, vec![Category::Coupon]);
    }

    #[test]
    fn duplicate_remote_rows_collapse() {
        let result = Reconciler::new()
            .with_rows(
                Category::Business,
                vec![RemoteRow::new("b1", 20), RemoteRow::new("b1", 10)],
            )
            .reconcile(&[]);

        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].timestamp, 20);
    }
}
