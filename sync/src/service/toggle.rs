//! Optimistic toggle and bulk clear.

use super::{now_ms, FavoritesService};
use crate::feedback::Feedback;
use favorites_engine::{collection, Category, Snapshot, Timestamp, Toggle, WriteAction};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

impl FavoritesService {
    /// Flip membership of `(id, category)` and return the new state.
    ///
    /// The local change, its persistence and listener notification complete
    /// before this returns. For a signed-in identity the matching remote
    /// write is queued; it is never rolled back locally if it fails.
    pub fn toggle_favorite(&self, id: &str, category: Category, snapshot: Option<Snapshot>) -> bool {
        let now = now_ms();

        let toggled = {
            let _commit = self.commit_lock();
            let (identity, current) = self.state.snapshot();

            let mut records = current.as_ref().clone();
            let toggled = collection::toggle(&mut records, id, category, snapshot, now);
            self.repository.save(&records, identity.as_deref());
            self.state.set_collection(records);

            if let Some(identity) = identity {
                let action = match toggled {
                    Toggle::Added => WriteAction::Add,
                    Toggle::Removed => WriteAction::Remove,
                };
                self.enqueue_write(&identity, category, Some(id.to_string()), action, now);
            }
            toggled
        };

        debug!(id, category = %category, ?toggled, "Toggled favorite");
        self.feedback.emit(match toggled {
            Toggle::Added => Feedback::Added(category),
            Toggle::Removed => Feedback::Removed(category),
        });

        toggled.is_favorited()
    }

    /// Empty the mounted collection and queue a remote clear of both categories.
    pub fn clear_all_favorites(&self) {
        let now = now_ms();

        {
            let _commit = self.commit_lock();
            let identity = self.state.identity();

            self.repository.save(&[], identity.as_deref());
            self.state.set_collection(Vec::new());

            if let Some(identity) = identity {
                for category in Category::ALL {
                    self.enqueue_write(&identity, category, None, WriteAction::Clear, now);
                }
            }
        }

        self.feedback.emit(Feedback::Cleared);
    }

    /// Queue a remote write and wake the worker. Called under the commit lock
    /// so queue order matches mutation order.
    fn enqueue_write(
        &self,
        identity: &str,
        category: Category,
        entity_id: Option<String>,
        action: WriteAction,
        now: Timestamp,
    ) {
        let ready_at = now.saturating_add(duration_ms(self.config.write_delay));

        let enqueued = {
            let mut outbox = self.outbox_lock();
            let enqueued = outbox.enqueue(
                Uuid::new_v4().to_string(),
                identity,
                category,
                entity_id,
                action,
                now,
                ready_at,
            );
            self.repository.save_outbox(&outbox);
            enqueued
        };

        debug!(
            seq = enqueued.seq,
            superseded = enqueued.superseded,
            ?action,
            "Queued remote write"
        );
        self.outbox_signal.notify_one();
    }
}

fn duration_ms(duration: Duration) -> Timestamp {
    Timestamp::try_from(duration.as_millis()).unwrap_or(Timestamp::MAX)
}
