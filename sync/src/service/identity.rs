//! Identity switching.

use super::FavoritesService;
use favorites_engine::identity_key;
use std::sync::{Arc, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

impl FavoritesService {
    /// React to the current identity.
    ///
    /// On a change, that identity's local collection is mounted at once and,
    /// for a signed-in identity, a reconciliation is spawned on the current
    /// runtime. Observing the same identity again does nothing.
    pub fn observe_identity(self: &Arc<Self>, identity: Option<String>) -> Option<JoinHandle<()>> {
        {
            let mut observed = self.observed.lock().unwrap_or_else(PoisonError::into_inner);
            if observed.as_ref() == Some(&identity) {
                return None;
            }
            *observed = Some(identity.clone());

            let _commit = self.commit_lock();
            let records = self.repository.load(identity.as_deref());
            let count = records.len();
            self.state.mount(identity.clone(), records);
            info!(identity = %identity_key(identity.as_deref()), count, "Mounted favorites");
        }

        let identity = identity?;
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!(identity = %identity, "No async runtime; skipping reconciliation");
                return None;
            }
        };

        let service = Arc::clone(self);
        Some(handle.spawn(async move {
            if let Err(e) = service.reconcile_identity(&identity).await {
                warn!(identity = %identity, error = %e, "Reconciliation failed");
            }
        }))
    }

    /// Follow an identity provider: observe the current value and every change.
    pub fn watch_identity(
        self: &Arc<Self>,
        mut identities: watch::Receiver<Option<String>>,
    ) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let identity = identities.borrow_and_update().clone();
                service.observe_identity(identity);
                if identities.changed().await.is_err() {
                    break;
                }
            }
            debug!("Identity provider closed");
        })
    }
}
