//! Favorites Sync - local-first favorites with background reconciliation.
//!
//! The runtime around [`favorites_engine`]: durable local storage scoped per
//! identity, a shared in-process collection with change listeners, a remote
//! client, and a durable outbox that delivers optimistic changes to the
//! remote store in the background.
//!
//! ```no_run
//! use favorites_sync::{Category, FavoritesService, HttpRemote, MemoryStore, SyncConfig};
//! use std::sync::Arc;
//!
//! # async fn run() -> favorites_sync::Result<()> {
//! let remote = Arc::new(HttpRemote::new("https://api.example.com/")?);
//! let service = Arc::new(FavoritesService::new(
//!     SyncConfig::default(),
//!     Arc::new(MemoryStore::new()),
//!     remote,
//! ));
//! let _worker = service.spawn_outbox_worker();
//!
//! service.observe_identity(Some("user-1".into()));
//! service.toggle_favorite("biz-42", Category::Business, None);
//! assert!(service.is_favorited("biz-42", Category::Business));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod feedback;
pub mod local;
pub mod remote;
pub mod repository;
pub mod service;
pub mod state;

pub use config::{ConfigError, SyncConfig};
pub use error::{Result, SyncError};
pub use feedback::{Feedback, FeedbackSink, LogFeedback};
pub use local::{FileStore, LocalStore, MemoryStore};
pub use remote::{HttpRemote, RemoteFavorites};
pub use repository::FavoritesRepository;
pub use service::{FavoritesService, OutboxWorker};
pub use state::{Favorites, FavoritesEvent, FavoritesState, ListenerId, FAVORITES_UPDATED_EVENT};

pub use favorites_engine::{
    Category, FavoriteCounts, FavoriteRecord, ReconcileSummary, RemoteRow, RetryPolicy, Snapshot,
};
