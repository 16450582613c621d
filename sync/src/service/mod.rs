//! The favorites service: public operations over the shared state.
//!
//! Optimistic mutations are synchronous and never wait on the network.
//! Remote I/O happens in spawned reconciliation tasks and in the outbox
//! worker.

mod identity;
mod outbox;
mod reconcile;
mod toggle;

pub use outbox::OutboxWorker;

use crate::config::SyncConfig;
use crate::feedback::{FeedbackSink, LogFeedback};
use crate::local::LocalStore;
use crate::remote::RemoteFavorites;
use crate::repository::FavoritesRepository;
use crate::state::{Favorites, FavoritesEvent, FavoritesState, ListenerId};
use chrono::Utc;
use favorites_engine::{collection, Category, FavoriteCounts, FavoriteRecord, Outbox, Timestamp};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tokio::sync::{broadcast, Notify};

/// Local-first favorites for one application session.
pub struct FavoritesService {
    config: SyncConfig,
    state: Arc<FavoritesState>,
    repository: FavoritesRepository,
    remote: Arc<dyn RemoteFavorites>,
    feedback: Arc<dyn FeedbackSink>,
    outbox: Mutex<Outbox>,
    outbox_signal: Notify,
    /// Woken whenever the outbox becomes empty
    outbox_drained: Notify,
    /// Last identity passed to `observe_identity`; outer `None` until the first call
    observed: Mutex<Option<Option<String>>>,
    /// Serializes every change to a collection (mutate, persist, notify).
    /// Lock order: `observed`, then `commit`, then `outbox`.
    commit: Mutex<()>,
    loading: AtomicUsize,
    last_error: RwLock<Option<String>>,
}

impl FavoritesService {
    /// Create a service and restore any writes left in the persisted outbox.
    ///
    /// Nothing is mounted until the first [`observe_identity`](Self::observe_identity).
    pub fn new(
        config: SyncConfig,
        local: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteFavorites>,
    ) -> Self {
        let repository = FavoritesRepository::new(local, config.namespace.clone());
        let outbox = repository.load_outbox();
        if !outbox.is_empty() {
            tracing::info!(pending = outbox.len(), "Restored queued remote writes");
        }

        Self {
            config,
            state: Arc::new(FavoritesState::new()),
            repository,
            remote,
            feedback: Arc::new(LogFeedback),
            outbox: Mutex::new(outbox),
            outbox_signal: Notify::new(),
            outbox_drained: Notify::new(),
            observed: Mutex::new(None),
            commit: Mutex::new(()),
            loading: AtomicUsize::new(0),
            last_error: RwLock::new(None),
        }
    }

    /// Replace the feedback sink.
    pub fn with_feedback(mut self, feedback: Arc<dyn FeedbackSink>) -> Self {
        self.feedback = feedback;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn state(&self) -> &Arc<FavoritesState> {
        &self.state
    }

    // ========================================================================
    // Read API
    // ========================================================================

    pub fn favorites(&self) -> Favorites {
        self.state.favorites()
    }

    pub fn counts(&self) -> FavoriteCounts {
        collection::counts(&self.state.favorites())
    }

    pub fn is_favorited(&self, id: &str, category: Category) -> bool {
        collection::contains(&self.state.favorites(), id, category)
    }

    pub fn favorites_by_type(&self, category: Category) -> Vec<FavoriteRecord> {
        collection::by_category(&self.state.favorites(), category)
    }

    /// Whether a reconciliation is running.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst) > 0
    }

    /// Message of the last failed remote read, cleared by a fully successful
    /// reconciliation.
    pub fn error(&self) -> Option<String> {
        self.last_error
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn identity(&self) -> Option<String> {
        self.state.identity()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.identity().is_some()
    }

    /// Remote writes not yet acknowledged, across all identities.
    pub fn pending_writes(&self) -> usize {
        self.outbox_lock().len()
    }

    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Favorites) + Send + Sync + 'static,
    {
        self.state.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.state.unsubscribe(id)
    }

    pub fn events(&self) -> broadcast::Receiver<FavoritesEvent> {
        self.state.events()
    }

    /// Reload the mounted collection from the local store, without the network.
    pub fn refresh(&self) -> Favorites {
        let _commit = self.commit_lock();
        let identity = self.state.identity();
        let records = self.repository.load(identity.as_deref());
        self.state.set_collection(records)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn commit_lock(&self) -> MutexGuard<'_, ()> {
        self.commit.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn outbox_lock(&self) -> MutexGuard<'_, Outbox> {
        self.outbox.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_error(&self, error: Option<String>) {
        *self
            .last_error
            .write()
            .unwrap_or_else(PoisonError::into_inner) = error;
    }
}

/// Current wall-clock time in milliseconds since the epoch.
pub(crate) fn now_ms() -> Timestamp {
    Utc::now().timestamp_millis().max(0) as Timestamp
}

/// Keeps `is_loading` raised while alive.
struct LoadingGuard<'a>(&'a AtomicUsize);

impl<'a> LoadingGuard<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
