//! Shared favorites state and change notifier.
//!
//! One [`FavoritesState`] exists per application session. It holds the
//! mounted identity and its collection, and fans every change out to
//! registered listeners (synchronously) and to a broadcast channel for
//! consumers that do not register a callback.

use dashmap::DashMap;
use favorites_engine::FavoriteRecord;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::broadcast;

/// Name carried by every broadcast change event.
pub const FAVORITES_UPDATED_EVENT: &str = "favorites-updated";

const EVENT_CAPACITY: usize = 64;

/// Shared, immutable view of a collection.
pub type Favorites = Arc<Vec<FavoriteRecord>>;

/// Callback invoked with the new collection after every change.
pub type Listener = Arc<dyn Fn(&Favorites) + Send + Sync>;

/// Handle returned by [`FavoritesState::subscribe`].
pub type ListenerId = u64;

/// Broadcast notification of a collection change.
#[derive(Debug, Clone)]
pub struct FavoritesEvent {
    pub name: &'static str,
    pub identity: Option<String>,
    pub favorites: Favorites,
}

#[derive(Debug, Clone, Default)]
struct Mounted {
    identity: Option<String>,
    favorites: Favorites,
}

/// The session-wide favorites collection plus its listeners.
pub struct FavoritesState {
    mounted: RwLock<Mounted>,
    listeners: DashMap<ListenerId, Listener>,
    next_listener: AtomicU64,
    events: broadcast::Sender<FavoritesEvent>,
    /// Serializes publish so listeners see changes in call order.
    dispatch: Mutex<()>,
}

impl Default for FavoritesState {
    fn default() -> Self {
        Self::new()
    }
}

impl FavoritesState {
    /// Create an empty state with nothing mounted.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            mounted: RwLock::new(Mounted::default()),
            listeners: DashMap::new(),
            next_listener: AtomicU64::new(1),
            events,
            dispatch: Mutex::new(()),
        }
    }

    /// Current collection.
    pub fn favorites(&self) -> Favorites {
        self.read().favorites.clone()
    }

    /// Identity whose collection is mounted; `None` when anonymous.
    pub fn identity(&self) -> Option<String> {
        self.read().identity.clone()
    }

    /// Identity and collection read together.
    pub fn snapshot(&self) -> (Option<String>, Favorites) {
        let mounted = self.read();
        (mounted.identity.clone(), mounted.favorites.clone())
    }

    /// Replace the collection, keeping the mounted identity, and notify.
    pub fn set_collection(&self, records: Vec<FavoriteRecord>) -> Favorites {
        self.publish(None, records)
    }

    /// Swap in another identity's collection and notify.
    pub fn mount(&self, identity: Option<String>, records: Vec<FavoriteRecord>) -> Favorites {
        self.publish(Some(identity), records)
    }

    fn publish(&self, identity: Option<Option<String>>, records: Vec<FavoriteRecord>) -> Favorites {
        let _dispatch = self.dispatch.lock().unwrap_or_else(PoisonError::into_inner);

        let favorites: Favorites = Arc::new(records);
        let identity = {
            let mut mounted = self.mounted.write().unwrap_or_else(PoisonError::into_inner);
            if let Some(identity) = identity {
                mounted.identity = identity;
            }
            mounted.favorites = favorites.clone();
            mounted.identity.clone()
        };

        // Clone out so a listener may subscribe or unsubscribe while running.
        let mut listeners: Vec<(ListenerId, Listener)> = self
            .listeners
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        listeners.sort_by_key(|(id, _)| *id);
        for (_, listener) in &listeners {
            listener(&favorites);
        }

        // No receivers is fine.
        let _ = self.events.send(FavoritesEvent {
            name: FAVORITES_UPDATED_EVENT,
            identity,
            favorites: favorites.clone(),
        });

        tracing::debug!(
            count = favorites.len(),
            listeners = listeners.len(),
            "Published favorites"
        );

        favorites
    }

    /// Register a listener; it is called on every subsequent change.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Favorites) + Send + Sync + 'static,
    {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        self.listeners.insert(id, Arc::new(listener));
        id
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Receiver for broadcast change events.
    pub fn events(&self) -> broadcast::Receiver<FavoritesEvent> {
        self.events.subscribe()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Mounted> {
        self.mounted.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use favorites_engine::Category;

    fn record(id: &str) -> FavoriteRecord {
        FavoriteRecord::optimistic(id, Category::Business, None, 1)
    }

    #[test]
    fn starts_empty_and_unmounted() {
        let state = FavoritesState::new();
        assert!(state.favorites().is_empty());
        assert!(state.identity().is_none());
    }

    #[test]
    fn listeners_run_before_set_returns() {
        let state = FavoritesState::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        state.subscribe(move |favorites| sink.lock().unwrap().push(favorites.len()));

        state.set_collection(vec![record("a")]);
        state.set_collection(vec![record("a"), record("b")]);
        state.set_collection(Vec::new());

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 0]);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let state = FavoritesState::new();
        let calls = Arc::new(AtomicU64::new(0));

        let counter = calls.clone();
        let id = state.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        state.set_collection(vec![record("a")]);

        assert!(state.unsubscribe(id));
        assert!(!state.unsubscribe(id));
        state.set_collection(Vec::new());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(state.listener_count(), 0);
    }

    #[test]
    fn listener_sees_final_collection() {
        let state = Arc::new(FavoritesState::new());
        let observed = Arc::new(Mutex::new(None));

        let reader = state.clone();
        let sink = observed.clone();
        state.subscribe(move |favorites| {
            // Reading the state from inside a listener sees the new value.
            assert!(Arc::ptr_eq(favorites, &reader.favorites()));
            *sink.lock().unwrap() = Some(favorites.len());
        });

        state.set_collection(vec![record("a"), record("b")]);
        assert_eq!(*observed.lock().unwrap(), Some(2));
    }

    #[test]
    fn mount_swaps_identity_and_broadcasts() {
        let state = FavoritesState::new();
        let mut events = state.events();

        state.mount(Some("user-1".into()), vec![record("a")]);
        assert_eq!(state.identity().as_deref(), Some("user-1"));

        let event = events.try_recv().unwrap();
        assert_eq!(event.name, FAVORITES_UPDATED_EVENT);
        assert_eq!(event.identity.as_deref(), Some("user-1"));
        assert_eq!(event.favorites.len(), 1);

        state.set_collection(Vec::new());
        assert_eq!(state.identity().as_deref(), Some("user-1"));

        state.mount(None, Vec::new());
        assert!(state.identity().is_none());
    }
}
