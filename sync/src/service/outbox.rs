//! Background delivery of queued remote writes.
//!
//! A single worker drains the outbox in order. Each delivered `Add` is
//! acknowledged by flipping the record's `synced` flag in whichever store
//! holds that identity's collection.

use super::{now_ms, FavoritesService};
use favorites_engine::{collection, FailOutcome, Outbox, OutboxEntry, WriteAction};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Handle to a running outbox worker.
pub struct OutboxWorker {
    handle: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

impl OutboxWorker {
    /// Stop the worker after its current delivery and wait for it to exit.
    ///
    /// Undelivered entries stay in the persisted outbox.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Outbox worker ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl FavoritesService {
    /// Spawn the worker that delivers queued writes to the remote store.
    pub fn spawn_outbox_worker(self: &Arc<Self>) -> OutboxWorker {
        let (shutdown, signal) = watch::channel(false);
        let service = Arc::clone(self);
        let handle = tokio::spawn(async move { service.run_outbox(signal).await });
        OutboxWorker { handle, shutdown }
    }

    /// Wait until every queued write is delivered or abandoned.
    ///
    /// Returns `false` if writes are still queued when `timeout` elapses.
    pub async fn wait_for_outbox(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            // Register before checking so a drain in between is not missed.
            let drained = self.outbox_drained.notified();
            tokio::pin!(drained);
            drained.as_mut().enable();

            if self.pending_writes() == 0 {
                return true;
            }
            if tokio::time::timeout_at(deadline, drained).await.is_err() {
                return self.pending_writes() == 0;
            }
        }
    }

    async fn run_outbox(&self, mut shutdown: watch::Receiver<bool>) {
        info!(pending = self.pending_writes(), "Outbox worker started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let now = now_ms();
            let (entry, wakeup) = {
                let mut outbox = self.outbox_lock();
                match outbox.next_ready(now).map(|entry| entry.seq) {
                    Some(seq) => {
                        let entry = outbox.begin(seq);
                        self.repository.save_outbox(&outbox);
                        (entry, None)
                    }
                    None => (None, outbox.next_wakeup()),
                }
            };

            if let Some(entry) = entry {
                self.deliver(entry).await;
                continue;
            }

            let sleep = async {
                match wakeup {
                    Some(at) => tokio::time::sleep(Duration::from_millis(at.saturating_sub(now))).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                _ = self.outbox_signal.notified() => {}
                _ = sleep => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!(pending = self.pending_writes(), "Outbox worker stopped");
    }

    async fn deliver(&self, entry: OutboxEntry) {
        let result = match (entry.action, entry.entity_id.as_deref()) {
            (WriteAction::Clear, _) => {
                self.remote
                    .clear(&entry.identity, entry.category, &entry.id)
                    .await
            }
            (action, Some(entity_id)) => {
                self.remote
                    .set_favorite(
                        &entry.identity,
                        entry.category,
                        entity_id,
                        action == WriteAction::Add,
                        &entry.id,
                    )
                    .await
            }
            (action, None) => {
                // Retrying cannot fix a write with no target.
                warn!(seq = entry.seq, ?action, "Dropping remote write without an entity id");
                self.finish(entry.seq);
                return;
            }
        };

        let now = now_ms();
        match result {
            Ok(()) => {
                self.finish(entry.seq);
                debug!(seq = entry.seq, action = ?entry.action, "Remote write delivered");
                if entry.action == WriteAction::Add {
                    self.acknowledge_add(&entry);
                }
            }
            Err(e) => {
                let outcome = {
                    let mut outbox = self.outbox_lock();
                    let outcome = outbox.fail(entry.seq, e.to_string(), now, &self.config.retry);
                    self.repository.save_outbox(&outbox);
                    self.signal_if_drained(&outbox);
                    outcome
                };
                match outcome {
                    Some(FailOutcome::Retry { attempts, at }) => warn!(
                        seq = entry.seq,
                        attempts,
                        retry_in_ms = at.saturating_sub(now),
                        error = %e,
                        "Remote write failed; will retry"
                    ),
                    Some(FailOutcome::Abandoned(abandoned)) => warn!(
                        seq = abandoned.seq,
                        identity = %abandoned.identity,
                        category = %abandoned.category,
                        entity_id = ?abandoned.entity_id,
                        action = ?abandoned.action,
                        attempts = abandoned.attempts,
                        error = %e,
                        "Remote write abandoned"
                    ),
                    None => {}
                }
            }
        }
    }

    fn finish(&self, seq: u64) {
        let mut outbox = self.outbox_lock();
        outbox.complete(seq);
        self.repository.save_outbox(&outbox);
        self.signal_if_drained(&outbox);
    }

    fn signal_if_drained(&self, outbox: &Outbox) {
        if outbox.is_empty() {
            self.outbox_drained.notify_waiters();
        }
    }

    /// Flip `synced` on the record an `Add` created, wherever it lives now.
    fn acknowledge_add(&self, entry: &OutboxEntry) {
        let Some(entity_id) = entry.entity_id.as_deref() else {
            return;
        };

        let _commit = self.commit_lock();
        let (mounted, current) = self.state.snapshot();

        if mounted.as_deref() == Some(entry.identity.as_str()) {
            let mut records = current.as_ref().clone();
            if collection::mark_synced(&mut records, entity_id, entry.category) {
                self.repository.save(&records, Some(entry.identity.as_str()));
                self.state.set_collection(records);
            }
        } else {
            let mut records = self.repository.load(Some(entry.identity.as_str()));
            if collection::mark_synced(&mut records, entity_id, entry.category) {
                self.repository.save(&records, Some(entry.identity.as_str()));
            }
        }
    }
}
