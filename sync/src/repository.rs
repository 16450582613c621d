//! Persistent local store for favorites collections and the outbox.
//!
//! Every operation here is best-effort. Read failures yield an empty
//! collection, write failures are logged and dropped; the in-memory state
//! stays authoritative for the session either way.

use crate::local::LocalStore;
use favorites_engine::{
    decode_collection, encode_collection, identity_key, FavoriteRecord, Outbox,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reads and writes per-identity collections and the outbox.
///
/// Keys: `<namespace>_anonymous`, `<namespace>_user_<identity>` and
/// `<namespace>_outbox`. No identity can map onto another store's key.
#[derive(Clone)]
pub struct FavoritesRepository {
    store: Arc<dyn LocalStore>,
    namespace: String,
}

impl FavoritesRepository {
    pub fn new(store: Arc<dyn LocalStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    pub fn collection_key(&self, identity: Option<&str>) -> String {
        format!("{}_{}", self.namespace, identity_key(identity))
    }

    pub fn outbox_key(&self) -> String {
        format!("{}_outbox", self.namespace)
    }

    /// Load and migrate the collection of `identity` (`None` when anonymous).
    pub fn load(&self, identity: Option<&str>) -> Vec<FavoriteRecord> {
        let key = self.collection_key(identity);
        let raw = match self.store.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read favorites; starting empty");
                return Vec::new();
            }
        };

        match decode_collection(&raw) {
            Ok(migration) => {
                if !migration.report.is_clean() {
                    info!(
                        key = %key,
                        skipped = migration.report.skipped,
                        repaired = migration.report.repaired,
                        duplicates = migration.report.duplicates,
                        "Migrated stored favorites"
                    );
                }
                debug!(key = %key, count = migration.records.len(), "Loaded favorites");
                migration.records
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Stored favorites are corrupt; starting empty");
                Vec::new()
            }
        }
    }

    /// Persist `records` for `identity`.
    pub fn save(&self, records: &[FavoriteRecord], identity: Option<&str>) {
        let key = self.collection_key(identity);
        let encoded = match encode_collection(records) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to encode favorites");
                return;
            }
        };
        if let Err(e) = self.store.set(&key, &encoded) {
            warn!(key = %key, error = %e, "Failed to persist favorites");
        }
    }

    /// Load the outbox, returning interrupted deliveries to pending.
    pub fn load_outbox(&self) -> Outbox {
        let key = self.outbox_key();
        let raw = match self.store.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Outbox::new(),
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read outbox; starting empty");
                return Outbox::new();
            }
        };

        match serde_json::from_str::<Outbox>(&raw) {
            Ok(mut outbox) => {
                let recovered = outbox.recover();
                if recovered > 0 {
                    info!(recovered, "Recovered interrupted remote writes");
                }
                outbox
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Stored outbox is corrupt; starting empty");
                Outbox::new()
            }
        }
    }

    pub fn save_outbox(&self, outbox: &Outbox) {
        let key = self.outbox_key();
        let result = serde_json::to_string(outbox)
            .map_err(crate::SyncError::from)
            .and_then(|encoded| self.store.set(&key, &encoded));
        if let Err(e) = result {
            warn!(key = %key, error = %e, "Failed to persist outbox");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, SyncError};
    use crate::local::MemoryStore;
    use favorites_engine::{Category, Snapshot, WriteAction};

    /// A backend whose every call fails.
    struct BrokenStore;

    impl LocalStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(SyncError::Storage(std::io::Error::other("disk on fire")))
        }
        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(SyncError::Storage(std::io::Error::other("disk on fire")))
        }
        fn remove(&self, _key: &str) -> Result<()> {
            Ok(())
        }
    }

    fn repository() -> (Arc<MemoryStore>, FavoritesRepository) {
        let store = Arc::new(MemoryStore::new());
        let repository = FavoritesRepository::new(store.clone(), "favorites");
        (store, repository)
    }

    #[test]
    fn key_scheme() {
        let (_, repository) = repository();
        assert_eq!(repository.collection_key(None), "favorites_anonymous");
        assert_eq!(repository.collection_key(Some("user-1")), "favorites_user_user-1");
        assert_eq!(repository.outbox_key(), "favorites_outbox");
    }

    #[test]
    fn reserved_identity_names_get_their_own_store() {
        let (store, repository) = repository();
        let mut outbox = Outbox::new();
        outbox.enqueue(
            "op-1",
            "outbox",
            Category::Business,
            Some("b".into()),
            WriteAction::Add,
            0,
            0,
        );

        let mine = vec![FavoriteRecord::optimistic("b", Category::Business, None, 1)];
        repository.save(&mine, Some("outbox"));
        repository.save_outbox(&outbox);
        repository.save(&[], Some("anonymous"));
        let anonymous = vec![FavoriteRecord::optimistic("a", Category::Coupon, None, 2)];
        repository.save(&anonymous, None);

        assert_eq!(repository.load(Some("outbox")), mine);
        assert_eq!(repository.load_outbox().len(), 1);
        assert!(repository.load(Some("anonymous")).is_empty());
        assert_eq!(repository.load(None), anonymous);
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn save_then_load() {
        let (_, repository) = repository();
        let records = vec![FavoriteRecord::optimistic(
            "biz-1",
            Category::Business,
            Some(Snapshot::business("Joe's")),
            10,
        )];

        repository.save(&records, Some("user-1"));
        assert_eq!(repository.load(Some("user-1")), records);
        assert!(repository.load(Some("user-2")).is_empty());
    }

    #[test]
    fn round_trip_is_byte_identical() {
        let (store, repository) = repository();
        store
            .set(
                "favorites_user_user-1",
                r#"[{"id":"b","type":"business","timestamp":1},
                    {"id":"c","category":"coupon","timestamp":2,"synced":true,
                     "snapshot":{"title":"Deal","discount":"5%"}}]"#,
            )
            .unwrap();

        repository.save(&repository.load(Some("user-1")), Some("user-1"));
        let first = store.get("favorites_user_user-1").unwrap().unwrap();
        repository.save(&repository.load(Some("user-1")), Some("user-1"));
        let second = store.get("favorites_user_user-1").unwrap().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn corrupt_data_loads_empty() {
        let (store, repository) = repository();
        store.set("favorites_user_user-1", "{{{{").unwrap();
        assert!(repository.load(Some("user-1")).is_empty());
    }

    #[test]
    fn broken_backend_is_swallowed() {
        let repository = FavoritesRepository::new(Arc::new(BrokenStore), "favorites");
        assert!(repository.load(Some("user-1")).is_empty());
        repository.save(&[], Some("user-1"));
        assert!(repository.load_outbox().is_empty());
        repository.save_outbox(&Outbox::new());
    }

    #[test]
    fn outbox_persists_and_recovers() {
        let (_, repository) = repository();
        let mut outbox = Outbox::new();
        let enqueued = outbox.enqueue(
            "op-1",
            "user-1",
            Category::Coupon,
            Some("c1".into()),
            WriteAction::Add,
            0,
            0,
        );
        outbox.begin(enqueued.seq);
        repository.save_outbox(&outbox);

        let restored = repository.load_outbox();
        assert_eq!(restored.len(), 1);
        assert!(restored.next_ready(0).is_some());
    }
}
