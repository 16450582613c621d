//! Client side of the remote favorites store.
//!
//! The remote store exposes one endpoint family per category: a read query
//! and set-state writes. Writes carry an idempotency key so a retried
//! delivery cannot double-apply.

mod http;

pub use http::HttpRemote;

use crate::error::Result;
use favorites_engine::{Category, RemoteRow};
use futures::future::BoxFuture;

/// Asynchronous access to the authoritative favorites store.
pub trait RemoteFavorites: Send + Sync {
    /// All favorites of `category` recorded for `identity`.
    fn list<'a>(&'a self, identity: &'a str, category: Category)
        -> BoxFuture<'a, Result<Vec<RemoteRow>>>;

    /// Make `entity_id` a favorite (`favorited = true`) or not.
    fn set_favorite<'a>(
        &'a self,
        identity: &'a str,
        category: Category,
        entity_id: &'a str,
        favorited: bool,
        idempotency_key: &'a str,
    ) -> BoxFuture<'a, Result<()>>;

    /// Remove every favorite of `category` for `identity`.
    fn clear<'a>(
        &'a self,
        identity: &'a str,
        category: Category,
        idempotency_key: &'a str,
    ) -> BoxFuture<'a, Result<()>>;
}
