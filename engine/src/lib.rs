//! # Favorites Engine
//!
//! The deterministic core of a local-first favorites sync engine.
//!
//! This crate owns the data model and every algorithm that does not need IO:
//! records and their display snapshots, migration of older stored data,
//! collection operations (the optimistic toggle state machine), the
//! remote-wins reconciliation merge, and the outbox queue of pending remote
//! writes. The `favorites-sync` crate wires these into persistence, a shared
//! notifier, and the async remote client.
//!
//! ## Design Principles
//!
//! - **No IO**: nothing here touches files, network, or clocks
//! - **Deterministic**: same inputs always produce the same outputs
//! - **Typed snapshots**: display data is a tagged union per [`Category`]
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! A [`FavoriteRecord`] is keyed by `(id, category)`. Records created locally
//! start with `synced = false`; records derived from the remote store carry
//! `synced = true`.
//!
//! ### Toggle
//!
//! [`collection::toggle`] flips membership of a key: removal is immediate,
//! addition prepends an unsynced record.
//!
//! ### Reconciliation
//!
//! The [`Reconciler`] merges remote rows with the local collection. Remote
//! wins for every key it knows; local-only records survive.
//!
//! ### Outbox
//!
//! The [`Outbox`] is a durable queue of set-state remote writes. Enqueuing a
//! write supersedes pending writes for the same key, so the last local intent
//! is the one that reaches the remote store.
//!
//! ## Quick Start
//!
//! ```rust
//! use favorites_engine::{collection, Category, Reconciler, RemoteRow, Toggle};
//!
//! let mut favorites = Vec::new();
//! let toggled = collection::toggle(&mut favorites, "biz-1", Category::Business, None, 1_000);
//! assert_eq!(toggled, Toggle::Added);
//! assert!(!favorites[0].synced);
//!
//! let result = Reconciler::new()
//!     .with_rows(Category::Business, vec![RemoteRow::new("biz-1", 500)])
//!     .reconcile(&favorites);
//! assert!(result.records[0].synced);
//! assert_eq!(result.records[0].timestamp, 500);
//! ```

pub mod collection;
pub mod error;
pub mod migrate;
pub mod outbox;
pub mod reconcile;
pub mod record;
pub mod snapshot;

// Re-export main types at crate root
pub use collection::{FavoriteCounts, Toggle};
pub use error::Error;
pub use migrate::{decode_collection, encode_collection, Migration, MigrationReport};
pub use outbox::{
    EntryStatus, Enqueued, FailOutcome, Outbox, OutboxEntry, RetryPolicy, WriteAction,
};
pub use reconcile::{ReconcileResult, ReconcileSummary, Reconciler, RemoteRow};
pub use record::{
    identity_key, Category, FavoriteKey, FavoriteRecord, ANONYMOUS_KEY, IDENTITY_KEY_PREFIX,
};
pub use snapshot::{BusinessSnapshot, CouponSnapshot, Snapshot};

/// Type aliases for clarity
pub type EntityId = String;
pub type IdentityKey = String;
pub type Timestamp = u64;
