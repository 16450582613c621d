//! Reconciliation driver: pull both categories, merge, persist, mount.

use super::{FavoritesService, LoadingGuard};
use crate::error::{Result, SyncError};
use favorites_engine::{Category, ReconcileSummary, Reconciler};
use tracing::{debug, info, warn};

impl FavoritesService {
    /// Reconcile the mounted identity with the remote store.
    pub async fn sync_from_database(&self) -> Result<ReconcileSummary> {
        let identity = self.state.identity().ok_or(SyncError::NotAuthenticated)?;
        self.reconcile_identity(&identity).await
    }

    /// Merge remote rows for `identity` into its local collection.
    ///
    /// A failed category query contributes nothing and leaves that
    /// category's local records alone. The merged result is always
    /// persisted but only mounted if `identity` is still the mounted one.
    pub(crate) async fn reconcile_identity(&self, identity: &str) -> Result<ReconcileSummary> {
        let _loading = LoadingGuard::new(&self.loading);
        debug!(identity, "Reconciling favorites");

        // A removal delivered while the fetch is in flight leaves the outbox,
        // but the fetched rows may predate it.
        let (removed_before, cleared_before) = self.outbox_lock().pending_removals(identity);

        let (business, coupon) = tokio::join!(
            self.remote.list(identity, Category::Business),
            self.remote.list(identity, Category::Coupon),
        );

        let mut reconciler = Reconciler::new();
        let mut failures = Vec::new();
        for (category, fetched) in [(Category::Business, business), (Category::Coupon, coupon)] {
            match fetched {
                Ok(rows) => reconciler = reconciler.with_rows(category, rows),
                Err(e) => {
                    warn!(identity, category = %category, error = %e, "Failed to fetch remote favorites");
                    failures.push(format!("{category}: {e}"));
                    reconciler = reconciler.with_failed(category);
                }
            }
        }

        let summary = {
            let _commit = self.commit_lock();

            let (mut removed, mut cleared) = self.outbox_lock().pending_removals(identity);
            removed.extend(removed_before);
            cleared.extend(cleared_before);
            for key in removed {
                reconciler = reconciler.suppress(key);
            }
            for category in cleared {
                reconciler = reconciler.suppress_category(category);
            }

            let (mounted, current) = self.state.snapshot();
            let still_mounted = mounted.as_deref() == Some(identity);
            let local = if still_mounted {
                current.as_ref().clone()
            } else {
                self.repository.load(Some(identity))
            };

            let result = reconciler.reconcile(&local);
            self.repository.save(&result.records, Some(identity));
            if still_mounted {
                self.state.set_collection(result.records);
            } else {
                debug!(identity, "Identity changed during reconciliation; result persisted only");
            }
            result.summary
        };

        self.set_error(if failures.is_empty() {
            None
        } else {
            Some(failures.join("; "))
        });

        info!(
            identity,
            from_remote = summary.from_remote,
            kept_local = summary.kept_local,
            replaced_local = summary.replaced_local,
            suppressed = summary.suppressed,
            failed = summary.failed_categories.len(),
            "Reconciled favorites"
        );

        Ok(summary)
    }
}
